//! Resolver collaborator interface.
//!
//! The scanning engine never parses DNS itself. It depends on one
//! capability: given a candidate server, a query name, a record type, and a
//! timeout, return a classified [`ProbeOutcome`]. The [`DnsProber`] trait is
//! that seam; [`TrustDnsProber`] is the production implementation and stub
//! probers back the scheduler and session tests.

mod trust;

pub use trust::TrustDnsProber;

use async_trait::async_trait;
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use crate::types::RecordType;

/// Length of the random query label, matching the historical scanner.
const RANDOM_LABEL_LEN: usize = 8;

const LABEL_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// A single outbound query attempt against a candidate address.
///
/// Created per dispatched unit and owned by the worker executing it.
#[derive(Debug, Clone)]
pub struct Probe {
    /// The candidate address acting as the DNS server.
    pub address: IpAddr,
    /// Fully qualified name to query.
    pub query_name: String,
    /// Record type to query.
    pub record_type: RecordType,
    /// Hard per-probe deadline, enforced by the resolver.
    pub timeout: Duration,
}

/// Classified result of a single probe.
///
/// `RespondedWithError` and `Responsive` are both terminal "found" states;
/// `Timeout` and `TransportError` are both terminal "not found" states.
/// There are no retries within a scan pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeStatus {
    /// The server returned a non-error answer.
    Responsive,
    /// The server returned a protocol-level negative (NXDOMAIN, NODATA).
    /// Proof the address is a live DNS server.
    RespondedWithError,
    /// No response before the deadline.
    Timeout,
    /// Connectivity failure or an empty response within the deadline.
    TransportError,
}

impl OutcomeStatus {
    /// Whether this status counts as a discovered server.
    pub fn is_found(self) -> bool {
        matches!(self, Self::Responsive | Self::RespondedWithError)
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Responsive => write!(f, "responsive"),
            Self::RespondedWithError => write!(f, "responded-with-error"),
            Self::Timeout => write!(f, "timeout"),
            Self::TransportError => write!(f, "transport-error"),
        }
    }
}

/// The classified outcome of one probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// The probed address.
    pub address: IpAddr,
    /// Classification of the response.
    pub status: OutcomeStatus,
    /// Time from dispatch to classification.
    pub latency: Duration,
    /// Display form of the answer, when one was returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_answer: Option<String>,
}

/// The single capability the scanning engine requires of a resolver.
///
/// Implementations must enforce the probe's timeout themselves and must
/// never panic on network failure: every failure mode maps to an
/// [`OutcomeStatus`].
#[async_trait]
pub trait DnsProber: Send + Sync {
    /// Execute one probe and classify the result.
    async fn probe(&self, probe: &Probe) -> ProbeOutcome;
}

/// Generate a fresh random query label from the OS CSPRNG.
///
/// Fixed length, lowercase alphanumeric. Labels defeat response caching on
/// the probed server; collisions across probes are harmless and are not
/// deduplicated.
pub fn random_label() -> String {
    (0..RANDOM_LABEL_LEN)
        .map(|_| LABEL_CHARS[OsRng.gen_range(0..LABEL_CHARS.len())] as char)
        .collect()
}

/// Prefix `domain` with a fresh random label.
pub fn randomized_query_name(domain: &str) -> String {
    format!("{}.{}", random_label(), domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_statuses() {
        assert!(OutcomeStatus::Responsive.is_found());
        assert!(OutcomeStatus::RespondedWithError.is_found());
        assert!(!OutcomeStatus::Timeout.is_found());
        assert!(!OutcomeStatus::TransportError.is_found());
    }

    #[test]
    fn test_random_label_shape() {
        let label = random_label();
        assert_eq!(label.len(), RANDOM_LABEL_LEN);
        assert!(label
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
    }

    #[test]
    fn test_randomized_query_name() {
        let name = randomized_query_name("example.com");
        assert!(name.ends_with(".example.com"));
        assert_eq!(name.len(), RANDOM_LABEL_LEN + 1 + "example.com".len());
    }

    #[test]
    fn test_status_serde_names() {
        let json = serde_json::to_string(&OutcomeStatus::RespondedWithError).unwrap();
        assert_eq!(json, "\"responded-with-error\"");
    }
}
