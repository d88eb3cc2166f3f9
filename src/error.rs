//! Error types for dnsweep.
//!
//! Uses `thiserror` for ergonomic error definitions. Each subsystem gets its
//! own enum; `CliError` is the umbrella used at the binary edge.
//!
//! Probe-level failures (timeouts, unreachable hosts) are NOT errors; they
//! are classified outcomes recorded as "not found". Only configuration,
//! storage, and state-machine problems surface through these types.

use std::path::PathBuf;
use thiserror::Error;

use crate::session::SessionState;

/// Configuration errors. Fatal to session start and surfaced before any
/// network activity.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("line {line}: invalid CIDR range '{content}': {reason}")]
    InvalidRangeLine {
        line: usize,
        content: String,
        reason: String,
    },

    #[error("invalid CIDR range '{0}': {1}")]
    InvalidRange(String, String),

    #[error("no ranges to scan (input contained no non-comment lines)")]
    EmptyRangeList,

    #[error("unsupported record type: {0}")]
    UnsupportedRecordType(String),

    #[error("concurrency must be a positive integer (got {0})")]
    InvalidConcurrency(usize),

    #[error("domain must not be empty")]
    EmptyDomain,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("failed to write {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("invalid settings format: {0}")]
    InvalidFormat(String),

    #[error("could not determine config/data directories")]
    DirectoryNotFound,
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidFormat(e.to_string())
    }
}

/// Invalid session state transitions, e.g. `resume` on a session that is not
/// paused. Signaled to the caller; the session state is unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot {action} a {state} session")]
pub struct StateError {
    /// The operation that was attempted.
    pub action: &'static str,
    /// The state the session was in.
    pub state: SessionState,
}

/// Durable-write and scan-record storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to create storage directory: {0}")]
    DirectoryError(String),

    #[error("failed to save scan: {0}")]
    SaveFailed(String),

    #[error("failed to load scan: {0}")]
    LoadFailed(String),

    #[error("scan not found: {0}")]
    ScanNotFound(String),

    #[error("append to result stream failed: {0}")]
    AppendFailed(#[source] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Top-level error type for CLI operations.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
