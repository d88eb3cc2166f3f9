//! Incremental result aggregation.
//!
//! [`ResultAggregator`] is the only long-lived shared resource in a scan:
//! every worker funnels classified outcomes through [`record`], an observer
//! may take [`snapshot`]s at any rate, and a background task drains pending
//! entries to an append-only JSON-lines sink via [`flush`] so partial
//! progress survives abrupt termination.
//!
//! The record path is a single short mutex critical section; flush swaps the
//! pending batch out under that same lock and performs file IO outside it,
//! so recording is never blocked on the disk.
//!
//! [`record`]: ResultAggregator::record
//! [`snapshot`]: ResultAggregator::snapshot
//! [`flush`]: ResultAggregator::flush

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::net::IpAddr;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::error::{StorageError, StorageResult};
use crate::resolver::ProbeOutcome;
use crate::types::RecordType;

/// Consecutive flush failures tolerated before the session escalates to
/// `Failed`.
pub const MAX_FLUSH_FAILURES: u32 = 3;

/// A discovered resolver: the persisted subset of an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEntry {
    /// The responding address.
    pub address: IpAddr,
    /// Probe latency in milliseconds.
    pub latency_ms: u64,
    /// The record type the scan queried.
    pub record_type: RecordType,
}

/// A consistent view of scan progress for reporting.
///
/// Entries are in completion order (non-deterministic across workers);
/// [`sorted_by_latency`](Self::sorted_by_latency) derives an ordered view
/// without touching storage order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSnapshot {
    /// Outcomes recorded so far (found or not).
    pub total: u64,
    /// Unique addresses confirmed as live DNS servers.
    pub found: u64,
    /// The discovered entries, in completion order.
    pub entries: Vec<ResultEntry>,
}

impl ScanSnapshot {
    /// Entries ordered fastest-first. Derived on demand.
    pub fn sorted_by_latency(&self) -> Vec<ResultEntry> {
        let mut sorted = self.entries.clone();
        sorted.sort_by_key(|e| e.latency_ms);
        sorted
    }
}

#[derive(Default)]
struct Inner {
    seen: HashSet<IpAddr>,
    entries: Vec<ResultEntry>,
    pending: Vec<ResultEntry>,
    total: u64,
    found: u64,
}

/// Thread-safe collector of classified outcomes.
pub struct ResultAggregator {
    record_type: RecordType,
    inner: Mutex<Inner>,
    sink: Mutex<Option<File>>,
    flush_failures: AtomicU32,
}

impl ResultAggregator {
    /// Collector with no durable sink; flush drains pending in memory.
    pub fn in_memory(record_type: RecordType) -> Self {
        Self {
            record_type,
            inner: Mutex::new(Inner::default()),
            sink: Mutex::new(None),
            flush_failures: AtomicU32::new(0),
        }
    }

    /// Collector appending confirmed entries to a JSON-lines file.
    pub fn with_sink(record_type: RecordType, path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::DirectoryError(e.to_string()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(StorageError::AppendFailed)?;

        Ok(Self {
            record_type,
            inner: Mutex::new(Inner::default()),
            sink: Mutex::new(Some(file)),
            flush_failures: AtomicU32::new(0),
        })
    }

    /// Record one classified outcome.
    ///
    /// Safe to call concurrently from any number of workers. A found address
    /// is persisted at most once per session; recording it again only bumps
    /// the completion counter.
    pub fn record(&self, outcome: &ProbeOutcome) {
        let mut inner = self.inner.lock().expect("aggregator lock poisoned");
        inner.total += 1;

        if outcome.status.is_found() && inner.seen.insert(outcome.address) {
            inner.found += 1;
            let entry = ResultEntry {
                address: outcome.address,
                latency_ms: outcome.latency.as_millis() as u64,
                record_type: self.record_type,
            };
            inner.entries.push(entry.clone());
            inner.pending.push(entry);
        }
    }

    /// Just the counters, without cloning entries. Cheap enough for a
    /// high-rate progress observer.
    pub fn counts(&self) -> (u64, u64) {
        let inner = self.inner.lock().expect("aggregator lock poisoned");
        (inner.total, inner.found)
    }

    /// A consistent (not necessarily most-recent) view of progress.
    pub fn snapshot(&self) -> ScanSnapshot {
        let inner = self.inner.lock().expect("aggregator lock poisoned");
        ScanSnapshot {
            total: inner.total,
            found: inner.found,
            entries: inner.entries.clone(),
        }
    }

    /// Append pending entries to the durable sink.
    ///
    /// Returns the number of entries written. On failure the batch is
    /// re-queued at the front of pending (nothing is lost) and the
    /// consecutive-failure counter advances; a success resets it.
    pub fn flush(&self) -> StorageResult<usize> {
        let batch = {
            let mut inner = self.inner.lock().expect("aggregator lock poisoned");
            std::mem::take(&mut inner.pending)
        };
        if batch.is_empty() {
            return Ok(0);
        }

        let result = self.write_batch(&batch);
        match result {
            Ok(()) => {
                self.flush_failures.store(0, Ordering::Relaxed);
                Ok(batch.len())
            }
            Err(err) => {
                let mut inner = self.inner.lock().expect("aggregator lock poisoned");
                let requeued = std::mem::replace(&mut inner.pending, batch);
                inner.pending.extend(requeued);
                self.flush_failures.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    /// Whether flush has failed `MAX_FLUSH_FAILURES` times in a row.
    pub fn flush_exhausted(&self) -> bool {
        self.flush_failures.load(Ordering::Relaxed) >= MAX_FLUSH_FAILURES
    }

    fn write_batch(&self, batch: &[ResultEntry]) -> StorageResult<()> {
        let mut sink = self.sink.lock().expect("sink lock poisoned");
        let Some(file) = sink.as_mut() else {
            return Ok(());
        };

        let mut buf = String::with_capacity(batch.len() * 64);
        for entry in batch {
            buf.push_str(&serde_json::to_string(entry)?);
            buf.push('\n');
        }
        file.write_all(buf.as_bytes())
            .and_then(|()| file.flush())
            .map_err(StorageError::AppendFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::resolver::OutcomeStatus;

    fn outcome(last_octet: u8, status: OutcomeStatus, ms: u64) -> ProbeOutcome {
        ProbeOutcome {
            address: IpAddr::V4(Ipv4Addr::new(203, 0, 113, last_octet)),
            status,
            latency: Duration::from_millis(ms),
            raw_answer: None,
        }
    }

    #[test]
    fn test_found_and_not_found_counting() {
        let agg = ResultAggregator::in_memory(RecordType::A);
        agg.record(&outcome(1, OutcomeStatus::Responsive, 20));
        agg.record(&outcome(2, OutcomeStatus::RespondedWithError, 35));
        agg.record(&outcome(3, OutcomeStatus::Timeout, 2000));
        agg.record(&outcome(4, OutcomeStatus::TransportError, 5));

        let snap = agg.snapshot();
        assert_eq!(snap.total, 4);
        assert_eq!(snap.found, 2);
        assert_eq!(snap.entries.len(), 2);
    }

    #[test]
    fn test_duplicate_outcome_persists_once() {
        let agg = ResultAggregator::in_memory(RecordType::A);
        agg.record(&outcome(1, OutcomeStatus::Responsive, 20));
        agg.record(&outcome(1, OutcomeStatus::Responsive, 20));

        let snap = agg.snapshot();
        assert_eq!(snap.total, 2);
        assert_eq!(snap.found, 1);
        assert_eq!(snap.entries.len(), 1);
    }

    #[test]
    fn test_concurrent_record_loses_nothing() {
        let agg = Arc::new(ResultAggregator::in_memory(RecordType::A));
        let mut handles = Vec::new();

        for t in 0..8u8 {
            let agg = Arc::clone(&agg);
            handles.push(std::thread::spawn(move || {
                for i in 0..100u8 {
                    let addr = IpAddr::V4(Ipv4Addr::new(10, 0, t, i));
                    agg.record(&ProbeOutcome {
                        address: addr,
                        status: OutcomeStatus::Responsive,
                        latency: Duration::from_millis(u64::from(i)),
                        raw_answer: None,
                    });
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let snap = agg.snapshot();
        assert_eq!(snap.total, 800);
        assert_eq!(snap.found, 800);
        assert_eq!(snap.entries.len(), 800);
    }

    #[test]
    fn test_sorted_view_does_not_mutate_storage_order() {
        let agg = ResultAggregator::in_memory(RecordType::A);
        agg.record(&outcome(1, OutcomeStatus::Responsive, 300));
        agg.record(&outcome(2, OutcomeStatus::Responsive, 10));

        let snap = agg.snapshot();
        let sorted = snap.sorted_by_latency();
        assert_eq!(sorted[0].latency_ms, 10);
        // Storage order is still completion order.
        assert_eq!(snap.entries[0].latency_ms, 300);
    }

    #[test]
    fn test_flush_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.jsonl");
        let agg = ResultAggregator::with_sink(RecordType::Mx, &path).unwrap();

        agg.record(&outcome(1, OutcomeStatus::Responsive, 20));
        agg.record(&outcome(2, OutcomeStatus::RespondedWithError, 45));
        assert_eq!(agg.flush().unwrap(), 2);

        // Flushing again with nothing pending is a no-op.
        assert_eq!(agg.flush().unwrap(), 0);

        agg.record(&outcome(3, OutcomeStatus::Responsive, 7));
        assert_eq!(agg.flush().unwrap(), 1);

        let content = std::fs::read_to_string(&path).unwrap();
        let entries: Vec<ResultEntry> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].address.to_string(), "203.0.113.1");
        assert_eq!(entries[2].latency_ms, 7);
        assert!(entries.iter().all(|e| e.record_type == RecordType::Mx));
    }

    #[test]
    fn test_flush_failures_start_clear() {
        let agg = ResultAggregator::in_memory(RecordType::A);
        assert!(!agg.flush_exhausted());
    }
}
