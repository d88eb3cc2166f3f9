//! JSON-based scan result storage.
//!
//! Each completed (or cancelled) scan is stored as one JSON file, listable
//! and exportable by scan ID. This is the final structured snapshot; the
//! *incremental* append-only stream is the aggregator's concern and lives
//! under the `live/` directory so partial progress survives a crash.

use crate::aggregate::{ResultEntry, ScanSnapshot};
use crate::config::Paths;
use crate::error::{StorageError, StorageResult};
use crate::session::{ScanConfig, SessionState};
use crate::types::{HostPolicy, RecordType, ScanId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// A persisted scan record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Unique identifier for this scan.
    pub id: ScanId,
    /// When the scan was started.
    pub started_at: DateTime<Utc>,
    /// When the scan finished (completed, cancelled, or failed).
    pub finished_at: DateTime<Utc>,
    /// Domain queried against every candidate.
    pub domain: String,
    /// Record type queried.
    pub record_type: RecordType,
    /// The scanned ranges, in input order.
    pub ranges: String,
    /// Host policy the enumeration ran under.
    pub host_policy: HostPolicy,
    /// Whether random query labels were used.
    pub random_label: bool,
    /// Terminal state the session reached.
    pub state: SessionState,
    /// Candidates the configuration would offer in total.
    pub total_candidates: u64,
    /// Probes that actually completed.
    pub probed: u64,
    /// Unique addresses confirmed as live DNS servers.
    pub found: u64,
    /// Total scan duration in milliseconds.
    pub duration_ms: u64,
    /// Discovered entries, in completion order.
    pub entries: Vec<ResultEntry>,
}

impl ScanRecord {
    /// Create a record for a session about to run.
    pub fn new(id: ScanId, config: &ScanConfig, total_candidates: u64) -> Self {
        Self {
            id,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            domain: config.domain.clone(),
            record_type: config.record_type,
            ranges: config.ranges.to_string(),
            host_policy: config.host_policy,
            random_label: config.random_label,
            state: SessionState::Idle,
            total_candidates,
            probed: 0,
            found: 0,
            duration_ms: 0,
            entries: Vec::new(),
        }
    }

    /// Finalize the record with the session's terminal state and results.
    pub fn finalize(mut self, state: SessionState, snapshot: ScanSnapshot, duration_ms: u64) -> Self {
        self.finished_at = Utc::now();
        self.state = state;
        self.probed = snapshot.total;
        self.found = snapshot.found;
        self.duration_ms = duration_ms;
        self.entries = snapshot.entries;
        self
    }

    /// Entries ordered fastest-first, for presentation.
    pub fn entries_by_latency(&self) -> Vec<ResultEntry> {
        let mut sorted = self.entries.clone();
        sorted.sort_by_key(|e| e.latency_ms);
        sorted
    }

    /// Get a short summary of the scan.
    pub fn summary(&self) -> String {
        format!(
            "{} {} over {} - {} found / {} probed [{:.2}s, {}]",
            self.domain,
            self.record_type,
            self.ranges,
            self.found,
            self.probed,
            self.duration_ms as f64 / 1000.0,
            self.state,
        )
    }
}

/// JSON file-based scan storage.
pub struct ScanStore {
    scans_dir: PathBuf,
    live_dir: PathBuf,
}

impl ScanStore {
    /// Create a store rooted at the application data directory.
    pub fn new() -> StorageResult<Self> {
        let paths = Paths::get();
        Self::at(paths.scans_dir(), paths.live_dir())
    }

    /// Create a store at explicit directories (used by tests).
    pub fn at(scans_dir: PathBuf, live_dir: PathBuf) -> StorageResult<Self> {
        fs::create_dir_all(&scans_dir).map_err(|e| StorageError::DirectoryError(e.to_string()))?;
        fs::create_dir_all(&live_dir).map_err(|e| StorageError::DirectoryError(e.to_string()))?;
        Ok(Self {
            scans_dir,
            live_dir,
        })
    }

    /// Path for a scan's live append-only result stream.
    pub fn live_stream_path(&self, id: &ScanId) -> PathBuf {
        self.live_dir.join(format!("{id}.jsonl"))
    }

    /// Save a scan record.
    pub fn save(&self, record: &ScanRecord) -> StorageResult<()> {
        let file = self.scan_file(&record.id);
        let content = serde_json::to_string_pretty(record)?;

        fs::write(&file, content).map_err(|e| StorageError::SaveFailed(e.to_string()))
    }

    /// Load a scan record by ID.
    pub fn load(&self, id: &ScanId) -> StorageResult<ScanRecord> {
        let file = self.scan_file(id);

        if !file.exists() {
            return Err(StorageError::ScanNotFound(id.to_string()));
        }

        let content =
            fs::read_to_string(&file).map_err(|e| StorageError::LoadFailed(e.to_string()))?;

        serde_json::from_str(&content).map_err(|e| StorageError::LoadFailed(e.to_string()))
    }

    /// Find a scan by short ID prefix.
    pub fn find_by_prefix(&self, prefix: &str) -> StorageResult<ScanRecord> {
        let matches: Vec<_> = self
            .list_ids()?
            .into_iter()
            .filter(|id| id.to_string().starts_with(prefix))
            .collect();

        match matches.len() {
            0 => Err(StorageError::ScanNotFound(prefix.to_string())),
            1 => self.load(&matches[0]),
            _ => Err(StorageError::LoadFailed(format!(
                "ambiguous prefix '{}': {} matches",
                prefix,
                matches.len()
            ))),
        }
    }

    /// List all scan IDs.
    pub fn list_ids(&self) -> StorageResult<Vec<ScanId>> {
        let mut ids = Vec::new();

        for entry in
            fs::read_dir(&self.scans_dir).map_err(|e| StorageError::DirectoryError(e.to_string()))?
        {
            let entry = entry.map_err(|e| StorageError::DirectoryError(e.to_string()))?;
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem() {
                    if let Ok(id) = stem.to_string_lossy().parse::<ScanId>() {
                        ids.push(id);
                    }
                }
            }
        }

        Ok(ids)
    }

    /// List all scan records, most recent first.
    pub fn list(&self) -> StorageResult<Vec<ScanRecord>> {
        let ids = self.list_ids()?;
        let mut records = Vec::new();

        for id in ids {
            if let Ok(record) = self.load(&id) {
                records.push(record);
            }
        }

        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));

        Ok(records)
    }

    /// List recent scans (last n).
    pub fn list_recent(&self, count: usize) -> StorageResult<Vec<ScanRecord>> {
        let mut records = self.list()?;
        records.truncate(count);
        Ok(records)
    }

    /// Delete a scan record and its live stream.
    pub fn delete(&self, id: &ScanId) -> StorageResult<()> {
        let file = self.scan_file(id);

        if !file.exists() {
            return Err(StorageError::ScanNotFound(id.to_string()));
        }

        fs::remove_file(&file).map_err(|e| StorageError::SaveFailed(e.to_string()))?;
        // The live stream may not exist (e.g. --no-save scans).
        let _ = fs::remove_file(self.live_stream_path(id));
        Ok(())
    }

    /// Delete scans older than a given duration. Returns how many went.
    pub fn cleanup(&self, max_age: chrono::Duration) -> StorageResult<usize> {
        let cutoff = Utc::now() - max_age;
        let mut deleted = 0;

        for record in self.list()? {
            if record.started_at < cutoff {
                self.delete(&record.id)?;
                deleted += 1;
            }
        }

        Ok(deleted)
    }

    /// Get the file path for a scan.
    fn scan_file(&self, id: &ScanId) -> PathBuf {
        self.scans_dir.join(format!("{id}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RangeList;
    use std::net::IpAddr;

    fn test_store() -> (tempfile::TempDir, ScanStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ScanStore::at(dir.path().join("scans"), dir.path().join("live")).unwrap();
        (dir, store)
    }

    fn sample_record() -> ScanRecord {
        let ranges = RangeList::new(vec!["203.0.113.0/30".parse().unwrap()]);
        let config = ScanConfig::new("example.com", ranges);
        let record = ScanRecord::new(ScanId::new(), &config, 3);
        record.finalize(
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
            1500,
        )
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let (_dir, store) = test_store();
        let record = sample_record();
        store.save(&record).unwrap();

        let loaded = store.load(&record.id).unwrap();
        assert_eq!(loaded.domain, "example.com");
        assert_eq!(loaded.found, 1);
        assert_eq!(loaded.entries.len(), 1);
        assert_eq!(loaded.state, SessionState::Completed);
    }

    #[test]
    fn test_find_by_prefix() {
        let (_dir, store) = test_store();
        let record = sample_record();
        store.save(&record).unwrap();

        let found = store.find_by_prefix(&record.id.short()).unwrap();
        assert_eq!(found.id, record.id);

        assert!(matches!(
            store.find_by_prefix("zzzzzzzz"),
            Err(StorageError::ScanNotFound(_))
        ));
    }

    #[test]
    fn test_delete_removes_record_and_stream() {
        let (_dir, store) = test_store();
        let record = sample_record();
        store.save(&record).unwrap();
        std::fs::write(store.live_stream_path(&record.id), "{}\n").unwrap();

        store.delete(&record.id).unwrap();
        assert!(matches!(
            store.load(&record.id),
            Err(StorageError::ScanNotFound(_))
        ));
        assert!(!store.live_stream_path(&record.id).exists());
    }

    #[test]
    fn test_entries_by_latency_sorted_view() {
        let mut record = sample_record();
        record.entries.push(ResultEntry {
            address: "203.0.113.1".parse::<IpAddr>().unwrap(),
            latency_ms: 7,
            record_type: RecordType::A,
        });

        let sorted = record.entries_by_latency();
        assert_eq!(sorted[0].latency_ms, 7);
        // Storage order untouched.
        assert_eq!(record.entries[0].latency_ms, 42);
    }

    #[test]
    fn test_list_recent_orders_newest_first() {
        let (_dir, store) = test_store();
        let mut older = sample_record();
        older.started_at = Utc::now() - chrono::Duration::hours(2);
        let newer = sample_record();
        store.save(&older).unwrap();
        store.save(&newer).unwrap();

        let recent = store.list_recent(1).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, newer.id);
    }
}
