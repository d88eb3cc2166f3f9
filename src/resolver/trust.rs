//! trust-dns backed prober.
//!
//! Points a fresh resolver at each candidate address as its sole UDP
//! nameserver and classifies whatever comes back. One resolver per probe
//! keeps connection and cache state from leaking between candidate servers.

use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use trust_dns_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::lookup::Lookup;
use trust_dns_resolver::proto::rr::RecordType as WireRecordType;
use trust_dns_resolver::TokioAsyncResolver;

use super::{DnsProber, OutcomeStatus, Probe, ProbeOutcome};
use crate::types::RecordType;

/// DNS port probed on every candidate.
const DNS_PORT: u16 = 53;

/// Maximum answer records rendered into `raw_answer`.
const MAX_RAW_RECORDS: usize = 3;

/// Production prober backed by `trust-dns-resolver` over UDP.
#[derive(Debug, Default)]
pub struct TrustDnsProber;

impl TrustDnsProber {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DnsProber for TrustDnsProber {
    async fn probe(&self, probe: &Probe) -> ProbeOutcome {
        let resolver = build_resolver(SocketAddr::new(probe.address, DNS_PORT), probe.timeout);
        let wire_type = wire_record_type(probe.record_type);

        let start = Instant::now();
        // Outer hard deadline in case the resolver's own timeout slips
        // (e.g. mid-handshake stalls).
        let result = match timeout(probe.timeout, resolver.lookup(probe.query_name.as_str(), wire_type)).await
        {
            Ok(result) => result,
            Err(_) => Err(ResolveError::from(ResolveErrorKind::Timeout)),
        };
        let latency = start.elapsed();

        let (status, raw_answer) = classify(&result);
        ProbeOutcome {
            address: probe.address,
            status,
            latency,
            raw_answer,
        }
    }
}

/// Classification function applied at the resolver boundary.
///
/// Closed mapping from the raw resolver result to [`OutcomeStatus`]:
/// - non-empty answer → `Responsive`
/// - empty answer set within the deadline → `TransportError`
/// - protocol-confirmed negative (`NoRecordsFound`) → `RespondedWithError`
/// - deadline elapsed → `Timeout`
/// - anything else (io/proto/connection failures) → `TransportError`
fn classify(result: &Result<Lookup, ResolveError>) -> (OutcomeStatus, Option<String>) {
    match result {
        Ok(lookup) => {
            if lookup.records().is_empty() {
                (OutcomeStatus::TransportError, None)
            } else {
                (OutcomeStatus::Responsive, Some(render_answer(lookup)))
            }
        }
        Err(err) => match err.kind() {
            ResolveErrorKind::NoRecordsFound { response_code, .. } => (
                OutcomeStatus::RespondedWithError,
                Some(response_code.to_string()),
            ),
            ResolveErrorKind::Timeout => (OutcomeStatus::Timeout, None),
            _ => (OutcomeStatus::TransportError, None),
        },
    }
}

fn render_answer(lookup: &Lookup) -> String {
    let rendered: Vec<String> = lookup
        .iter()
        .take(MAX_RAW_RECORDS)
        .map(|rdata| rdata.to_string())
        .collect();
    rendered.join(", ")
}

fn build_resolver(server: SocketAddr, probe_timeout: Duration) -> TokioAsyncResolver {
    let mut config = ResolverConfig::new();
    config.add_name_server(NameServerConfig {
        socket_addr: server,
        protocol: Protocol::Udp,
        tls_dns_name: None,
        // Negative answers from the probed server are exactly what we are
        // here to observe; do not second-guess them.
        trust_negative_responses: true,
        bind_addr: None,
    });

    let mut opts = ResolverOpts::default();
    opts.timeout = probe_timeout;
    opts.attempts = 1;
    opts.cache_size = 0;
    opts.use_hosts_file = false;

    TokioAsyncResolver::tokio(config, opts)
}

fn wire_record_type(record_type: RecordType) -> WireRecordType {
    match record_type {
        RecordType::A => WireRecordType::A,
        RecordType::Aaaa => WireRecordType::AAAA,
        RecordType::Mx => WireRecordType::MX,
        RecordType::Txt => WireRecordType::TXT,
        RecordType::Ns => WireRecordType::NS,
        RecordType::Cname => WireRecordType::CNAME,
        RecordType::Soa => WireRecordType::SOA,
        RecordType::Ptr => WireRecordType::PTR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::sync::Arc;
    use trust_dns_resolver::proto::op::{Query, ResponseCode};
    use trust_dns_resolver::proto::rr::rdata::A;
    use trust_dns_resolver::proto::rr::{Name, RData, Record};

    fn query() -> Query {
        Query::query(Name::from_ascii("example.com.").unwrap(), WireRecordType::A)
    }

    #[test]
    fn test_classify_answer_is_responsive() {
        let record = Record::from_rdata(
            Name::from_ascii("example.com.").unwrap(),
            300,
            RData::A(A(Ipv4Addr::new(93, 184, 216, 34))),
        );
        let lookup = Lookup::new_with_max_ttl(query(), Arc::from(vec![record]));
        let (status, raw) = classify(&Ok(lookup));
        assert_eq!(status, OutcomeStatus::Responsive);
        assert!(raw.unwrap().contains("93.184.216.34"));
    }

    #[test]
    fn test_classify_empty_answer_is_transport_error() {
        let lookup = Lookup::new_with_max_ttl(query(), Arc::from(vec![]));
        let (status, raw) = classify(&Ok(lookup));
        assert_eq!(status, OutcomeStatus::TransportError);
        assert!(raw.is_none());
    }

    #[test]
    fn test_classify_nxdomain_is_responded_with_error() {
        let err = ResolveError::from(ResolveErrorKind::NoRecordsFound {
            query: Box::new(query()),
            soa: None,
            negative_ttl: None,
            response_code: ResponseCode::NXDomain,
            trusted: true,
        });
        let (status, _) = classify(&Err(err));
        assert_eq!(status, OutcomeStatus::RespondedWithError);
    }

    #[test]
    fn test_classify_timeout() {
        let err = ResolveError::from(ResolveErrorKind::Timeout);
        let (status, _) = classify(&Err(err));
        assert_eq!(status, OutcomeStatus::Timeout);
    }

    #[test]
    fn test_classify_io_failure_is_transport_error() {
        let err = ResolveError::from(ResolveErrorKind::Msg("connection refused".to_string()));
        let (status, _) = classify(&Err(err));
        assert_eq!(status, OutcomeStatus::TransportError);
    }

    #[test]
    fn test_wire_record_type_mapping() {
        assert_eq!(wire_record_type(RecordType::A), WireRecordType::A);
        assert_eq!(wire_record_type(RecordType::Soa), WireRecordType::SOA);
        assert_eq!(wire_record_type(RecordType::Ptr), WireRecordType::PTR);
    }
}
