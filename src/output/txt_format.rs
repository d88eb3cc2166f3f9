//! TXT output: one address per line, fastest first, with a `#` metadata
//! header. The format downstream tooling has historically consumed.

use crate::storage::ScanRecord;

/// Render a record as an address list with a commented header.
pub fn render_txt(record: &ScanRecord) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "# dnsweep results - {}\n",
        record.finished_at.format("%Y-%m-%d_%H-%M-%S")
    ));
    out.push_str(&format!(
        "# Domain: {} | Type: {}\n",
        record.domain, record.record_type
    ));
    out.push_str(&format!("# Ranges: {}\n", record.ranges));
    out.push_str(&format!("# Total Saved: {}\n", record.found));
    out.push_str(&format!("#{}\n\n", "=".repeat(50)));

    for entry in record.entries_by_latency() {
        out.push_str(&format!("{}\n", entry.address));
    }

    out
}
