//! Export subcommand implementation.
//!
//! Handles the `dnsweep export <scan-id>` command for exporting saved scan
//! results.

use crate::cli::OutputFormat;
use crate::error::{CliError, CliResult};
use crate::output;
use crate::storage::{ScanRecord, ScanStore};
use crate::types::ScanId;
use clap::Parser;
use std::fs;
use std::path::PathBuf;

/// Export scan results.
#[derive(Parser, Debug)]
pub struct ExportCommand {
    /// Scan ID or prefix to export
    ///
    /// Can be a full UUID or the first few characters (short ID).
    #[arg(value_name = "SCAN_ID")]
    pub scan_id: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Output file path (prints to stdout if not specified)
    #[arg(short = 'o', long = "output")]
    pub output_file: Option<PathBuf>,
}

impl ExportCommand {
    /// Execute the export command.
    pub fn execute(&self, quiet: bool) -> CliResult<()> {
        let store = ScanStore::new()?;

        // Find the scan by ID or prefix
        let record = if self.scan_id.len() < 36 {
            store.find_by_prefix(&self.scan_id)?
        } else {
            let id: ScanId = self
                .scan_id
                .parse()
                .map_err(|e| CliError::Other(format!("invalid scan id: {e}")))?;
            store.load(&id)?
        };

        let content = match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&record)
                .map_err(|e| CliError::Other(e.to_string()))?,
            OutputFormat::Csv => generate_csv(&record)?,
            OutputFormat::Txt => output::render_txt(&record),
            OutputFormat::Plain => generate_plain(&record),
        };

        if let Some(ref path) = self.output_file {
            fs::write(path, &content)
                .map_err(|e| CliError::Other(format!("failed to write file: {}", e)))?;

            if !quiet {
                output::print_success(&format!(
                    "Exported scan {} to {}",
                    record.id.short(),
                    path.display()
                ));
            }
        } else {
            println!("{}", content);
        }

        Ok(())
    }
}

/// Generate CSV output.
fn generate_csv(record: &ScanRecord) -> CliResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["address", "latency_ms", "record_type"])
        .map_err(|e| CliError::Other(e.to_string()))?;

    for entry in record.entries_by_latency() {
        wtr.write_record([
            &entry.address.to_string(),
            &entry.latency_ms.to_string(),
            &entry.record_type.to_string(),
        ])
        .map_err(|e| CliError::Other(e.to_string()))?;
    }

    String::from_utf8(
        wtr.into_inner()
            .map_err(|e| CliError::Other(e.to_string()))?,
    )
    .map_err(|e| CliError::Other(e.to_string()))
}

/// Generate uncolored plain text output.
fn generate_plain(record: &ScanRecord) -> String {
    let mut out = String::new();

    out.push_str(&format!("Scan Report: {}\n", record.id));
    out.push_str(&format!("{}\n\n", "=".repeat(60)));

    out.push_str(&format!("Domain:       {}\n", record.domain));
    out.push_str(&format!("Record Type:  {}\n", record.record_type));
    out.push_str(&format!("Ranges:       {}\n", record.ranges));
    out.push_str(&format!("Host Policy:  {}\n", record.host_policy));
    out.push_str(&format!("Started:      {}\n", record.started_at));
    out.push_str(&format!("Finished:     {}\n", record.finished_at));
    out.push_str(&format!("Duration:     {} ms\n\n", record.duration_ms));

    out.push_str(&format!(
        "Summary: {} of {} candidates probed, {} resolvers found ({})\n\n",
        record.probed, record.total_candidates, record.found, record.state
    ));

    if !record.entries.is_empty() {
        out.push_str("Results:\n");
        out.push_str(&format!("{}\n", "-".repeat(60)));
        out.push_str(&format!("{:<18}  {:>10}  {}\n", "ADDRESS", "LATENCY", "TYPE"));
        out.push_str(&format!("{}\n", "-".repeat(60)));

        for entry in record.entries_by_latency() {
            out.push_str(&format!(
                "{:<18}  {:>8}ms  {}\n",
                entry.address, entry.latency_ms, entry.record_type
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{ResultEntry, ScanSnapshot};
    use crate::session::{ScanConfig, SessionState};
    use crate::types::{RangeList, RecordType};
    use std::net::IpAddr;

    fn sample() -> ScanRecord {
        let ranges = RangeList::new(vec!["203.0.113.0/30".parse().unwrap()]);
        let config = ScanConfig::new("example.com", ranges);
        ScanRecord::new(ScanId::new(), &config, 3).finalize(
            SessionState::Completed,
            ScanSnapshot {
                total: 3,
                found: 1,
                entries: vec![ResultEntry {
                    address: "203.0.113.2".parse::<IpAddr>().unwrap(),
                    latency_ms: 42,
                    record_type: RecordType::A,
                }],
            },
            800,
        )
    }

    #[test]
    fn test_generate_csv() {
        let csv = generate_csv(&sample()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), "address,latency_ms,record_type");
        assert_eq!(lines.next().unwrap(), "203.0.113.2,42,A");
    }

    #[test]
    fn test_generate_plain_mentions_summary() {
        let plain = generate_plain(&sample());
        assert!(plain.contains("Domain:       example.com"));
        assert!(plain.contains("1 resolvers found"));
        assert!(plain.contains("203.0.113.2"));
    }
}
