//! # dnsweep - A DNS Resolver Discovery Scanner
//!
//! dnsweep sweeps large address spaces for hosts that answer as usable DNS
//! resolvers for a given domain and record type, reporting responsive
//! addresses with their latency.
//!
//! ## Features
//!
//! - **Lazy Enumeration**: CIDR ranges stream candidates block by block; a
//!   /8 never has to be materialized
//! - **Bounded Concurrency**: a fixed worker pool keeps exactly the
//!   configured number of probes outstanding
//! - **Pause/Resume/Cancel**: cursor-exact pause and resume, cooperative
//!   cancellation with a bounded drain
//! - **Soft-Error Detection**: NXDOMAIN/NODATA answers count as discovered
//!   servers - a negative answer still proves the resolver is live
//! - **Incremental Persistence**: confirmed entries stream to an
//!   append-only file as soon as they land
//! - **Multiple Output Formats**: plain text, JSON, CSV, and address lists
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use dnsweep::resolver::TrustDnsProber;
//! use dnsweep::session::{ScanConfig, ScanSession};
//! use dnsweep::types::RangeList;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let ranges = RangeList::parse("198.51.100.0/24").unwrap();
//!     let config = ScanConfig::new("example.com", ranges).with_concurrency(100);
//!
//!     let mut session = ScanSession::new(config).unwrap();
//!     session.start(Arc::new(TrustDnsProber::new())).unwrap();
//!     session.wait().await;
//!
//!     for entry in session.results().sorted_by_latency() {
//!         println!("{} ({}ms)", entry.address, entry.latency_ms);
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`types`] - Address ranges, host policy, record types, scan IDs
//! - [`enumerate`] - Lazy, cursor-restartable candidate enumeration
//! - [`resolver`] - The prober seam and outcome classification
//! - [`scheduler`] - The bounded-concurrency worker pool
//! - [`aggregate`] - Thread-safe result collection and incremental flushing
//! - [`session`] - The scan session aggregate root and its state machine
//! - [`config`] - Settings and XDG paths
//! - [`storage`] - Saved scan records
//! - [`output`] - Presentation formatting
//! - [`error`] - Error types per subsystem

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod enumerate;
pub mod error;
pub mod output;
pub mod resolver;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use aggregate::{ResultAggregator, ResultEntry, ScanSnapshot};
pub use enumerate::{AddressEnumerator, Cursor};
pub use error::{CliError, ConfigError, StateError, StorageError};
pub use resolver::{DnsProber, OutcomeStatus, Probe, ProbeOutcome, TrustDnsProber};
pub use session::{ScanConfig, ScanSession, SessionHandle, SessionState};
pub use types::{AddressRange, HostPolicy, RangeList, RecordType, ScanId};
