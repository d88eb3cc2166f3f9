//! CSV output formatting.

use crate::storage::ScanRecord;
use std::io;

/// Print results in CSV format, fastest entries first.
pub fn print_csv(record: &ScanRecord) -> io::Result<()> {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    wtr.write_record(["address", "latency_ms", "record_type"])?;

    for entry in record.entries_by_latency() {
        wtr.write_record([
            &entry.address.to_string(),
            &entry.latency_ms.to_string(),
            &entry.record_type.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
