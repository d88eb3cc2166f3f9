//! History subcommand implementation.
//!
//! Handles the `dnsweep history` command: listing, clearing, and pruning
//! saved scans.

use crate::error::CliResult;
use crate::output;
use crate::storage::ScanStore;
use clap::Parser;

/// View and manage scan history.
#[derive(Parser, Debug)]
pub struct HistoryCommand {
    /// Number of recent scans to show
    #[arg(short = 'n', long, default_value = "10")]
    pub count: usize,

    /// Show detailed information for each scan
    #[arg(short, long)]
    pub detailed: bool,

    /// Clear all scan history
    #[arg(long)]
    pub clear: bool,

    /// Delete scans older than N days
    #[arg(long, value_name = "DAYS")]
    pub prune: Option<u32>,
}

impl HistoryCommand {
    /// Execute the history command.
    pub fn execute(&self, quiet: bool) -> CliResult<()> {
        let store = ScanStore::new()?;

        if self.clear {
            let ids = store.list_ids()?;
            let count = ids.len();
            for id in ids {
                store.delete(&id)?;
            }
            if !quiet {
                output::print_success(&format!("Deleted {} scan(s)", count));
            }
            return Ok(());
        }

        if let Some(days) = self.prune {
            let deleted = store.cleanup(chrono::Duration::days(i64::from(days)))?;
            if !quiet {
                output::print_success(&format!(
                    "Pruned {} scan(s) older than {} day(s)",
                    deleted, days
                ));
            }
            return Ok(());
        }

        let records = store.list_recent(self.count)?;
        if records.is_empty() {
            if !quiet {
                output::print_info("No saved scans.");
            }
            return Ok(());
        }

        for record in records {
            println!(
                "{}  {}  {}",
                record.id.short(),
                record.started_at.format("%Y-%m-%d %H:%M:%S"),
                record.summary()
            );
            if self.detailed {
                for entry in record.entries_by_latency() {
                    println!(
                        "    {:<18} {:>6}ms {}",
                        entry.address, entry.latency_ms, entry.record_type
                    );
                }
            }
        }

        Ok(())
    }
}
