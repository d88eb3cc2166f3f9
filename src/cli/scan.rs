//! Scan subcommand implementation.
//!
//! Handles the `dnsweep scan <cidr-file>` command: parses the range list,
//! wires the session to the trust-dns prober and the live result stream,
//! drives a progress bar from session snapshots, and saves the final record.

use crate::aggregate::ResultAggregator;
use crate::cli::OutputFormat;
use crate::config::AppSettings;
use crate::error::{CliError, CliResult};
use crate::output;
use crate::resolver::TrustDnsProber;
use crate::session::{ScanConfig, ScanSession, SessionHandle, SessionState};
use crate::storage::{ScanRecord, ScanStore};
use crate::types::{HostPolicy, RangeList, RecordType, ScanId};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// Sweep CIDR ranges for usable DNS resolvers.
#[derive(Parser, Debug)]
pub struct ScanCommand {
    /// File with one CIDR range per line (blank lines and # comments ignored)
    ///
    /// Each line is `<address>/<prefix>` or `<address>/<dotted-mask>`.
    #[arg(value_name = "CIDR_FILE")]
    pub cidr_file: PathBuf,

    /// Domain to query against every candidate
    #[arg(short, long)]
    pub domain: String,

    /// DNS record type to query
    #[arg(short = 'r', long = "record-type", value_enum)]
    pub record_type: Option<RecordType>,

    /// Maximum number of concurrently outstanding probes
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// Per-probe timeout in milliseconds
    #[arg(short = 't', long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Prefix each query with a fresh random subdomain label
    #[arg(long)]
    pub random_label: bool,

    /// Which addresses each range yields (.0 exclusion policy)
    #[arg(long, value_enum)]
    pub host_policy: Option<HostPolicy>,

    /// Rate limit in probes per second (0 = unlimited)
    #[arg(long = "rate")]
    pub rate_limit: Option<u32>,

    /// Output format for results
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Stream confirmed entries to this file instead of the data directory
    #[arg(long, value_name = "PATH")]
    pub results_file: Option<PathBuf>,

    /// Don't save scan results
    #[arg(long)]
    pub no_save: bool,
}

impl ScanCommand {
    /// Execute the scan command.
    pub async fn execute(&self, _verbose: bool, quiet: bool) -> CliResult<()> {
        let settings = AppSettings::load()?;

        let record_type = self.record_type.unwrap_or(settings.default_record_type);
        let concurrency = self.concurrency.unwrap_or(settings.default_concurrency);
        let timeout_ms = self.timeout.unwrap_or(settings.default_timeout_ms);
        let host_policy = self.host_policy.unwrap_or(settings.default_host_policy);
        let rate_limit = self.rate_limit.unwrap_or(settings.default_rate_limit);
        let format = self.output.unwrap_or_else(|| {
            settings
                .default_output_format
                .parse()
                .unwrap_or_default()
        });

        // Configuration errors abort here, before any network activity.
        let ranges = RangeList::from_path(&self.cidr_file)?;
        let config = ScanConfig::new(&self.domain, ranges)
            .with_record_type(record_type)
            .with_concurrency(concurrency)
            .with_random_label(self.random_label)
            .with_host_policy(host_policy)
            .with_probe_timeout(Duration::from_millis(timeout_ms))
            .with_rate_limit(rate_limit);

        let save = settings.auto_save_scans && !self.no_save;
        let store = ScanStore::new()?;

        // Live stream: confirmed entries are appended as soon as they land,
        // so partial progress survives abrupt termination.
        let id = ScanId::new();
        let aggregator = match (&self.results_file, save) {
            (Some(path), _) => Arc::new(ResultAggregator::with_sink(record_type, path)?),
            (None, true) => Arc::new(ResultAggregator::with_sink(
                record_type,
                &store.live_stream_path(&id),
            )?),
            (None, false) => Arc::new(ResultAggregator::in_memory(record_type)),
        };

        let mut session = ScanSession::with_aggregator(config, aggregator)?.with_id(id);
        let record = ScanRecord::new(id, session.config(), session.total_candidates());

        if !quiet && format == OutputFormat::Plain {
            output::print_scan_header(
                &self.domain,
                record_type.as_str(),
                session.config().ranges.len(),
                session.total_candidates(),
                concurrency,
            );
        }

        session.start(Arc::new(TrustDnsProber::new()))?;
        let handle = session.handle();

        // Ctrl-C cancels with the configured drain grace.
        let cancel_handle = handle.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received; cancelling scan");
                let _ = cancel_handle.cancel();
            }
        });

        let progress = (!quiet && format == OutputFormat::Plain)
            .then(|| spawn_progress_bar(handle, session.total_candidates()));

        let final_state = session.wait().await;

        if let Some((task, bar)) = progress {
            let _ = task.await;
            bar.finish_and_clear();
        }

        let duration_ms = session.progress().elapsed.as_millis() as u64;
        let record = record.finalize(final_state, session.results(), duration_ms);

        if final_state == SessionState::Cancelled && !quiet {
            output::print_warning("Scan cancelled before completion; partial results follow.");
        }

        if save {
            store.save(&record)?;
            if !quiet && format == OutputFormat::Plain {
                output::print_info(&format!("Scan saved as {}", record.id.short()));
            }
        }

        output::print_results(&record, format)?;

        if final_state == SessionState::Failed {
            return Err(CliError::Other(
                "scan failed: durable result writes kept failing".to_string(),
            ));
        }
        Ok(())
    }
}

/// Drive an indicatif bar from progress snapshots until the session reaches
/// a terminal state. The bar is pure presentation over the snapshot; the
/// engine never knows it exists.
fn spawn_progress_bar(handle: SessionHandle, total: u64) -> (JoinHandle<()>, ProgressBar) {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );

    let task = tokio::spawn({
        let bar = bar.clone();
        async move {
            loop {
                let progress = handle.progress();
                bar.set_position(progress.completed);
                bar.set_message(format!("{} found", progress.found));
                if progress.state.is_terminal() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(150)).await;
            }
        }
    });

    (task, bar)
}
