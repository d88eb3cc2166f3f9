//! Address range types with CIDR and dotted-mask support.
//!
//! Provides parsing for the scanner's range-list input:
//! - CIDR notation (`198.51.100.0/24`)
//! - Dotted netmask notation (`198.51.100.0/255.255.255.0`), including the
//!   legacy mask repair for malformed masks
//! - Line-oriented lists with blank lines and `#` comments
//!
//! Ranges are IPv4 only; `AAAA` remains available as a *query* type.

use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult};

/// Policy for which host addresses a range yields.
///
/// The historical enumerator started every block's last octet at 1 and never
/// yielded a `.0` address. Whether that exclusion is intentional is
/// undecidable from the outside, so it is a named, configurable policy
/// rather than an inherited accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum HostPolicy {
    /// Legacy parity: skip any candidate whose last octet is 0. A /32 range
    /// still yields its single address.
    SkipZeroOctet,
    /// Yield every address in the range, 2^(32-p) candidates.
    Full,
}

impl Default for HostPolicy {
    fn default() -> Self {
        Self::SkipZeroOctet
    }
}

impl fmt::Display for HostPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SkipZeroOctet => write!(f, "skip-zero-octet"),
            Self::Full => write!(f, "full"),
        }
    }
}

/// A single immutable IPv4 address range (base address + prefix length).
///
/// The base is always masked to the network address, so `203.0.113.7/30`
/// parses to the same range as `203.0.113.4/30`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressRange {
    net: Ipv4Network,
}

impl AddressRange {
    /// Create a range from a base address and prefix length.
    pub fn new(base: Ipv4Addr, prefix: u8) -> ConfigResult<Self> {
        let net = Ipv4Network::new(base, prefix)
            .map_err(|e| ConfigError::InvalidRange(format!("{base}/{prefix}"), e.to_string()))?;
        // Normalize to the network base so enumeration arithmetic can start
        // from the masked address.
        let net = Ipv4Network::new(net.network(), prefix)
            .map_err(|e| ConfigError::InvalidRange(format!("{base}/{prefix}"), e.to_string()))?;
        Ok(Self { net })
    }

    /// Parse `<address>/<prefix>` or `<address>/<dotted-mask>`.
    pub fn parse(s: &str) -> ConfigResult<Self> {
        parse_range(s).map_err(|reason| ConfigError::InvalidRange(s.to_string(), reason))
    }

    /// The masked base (network) address.
    pub fn base(&self) -> Ipv4Addr {
        self.net.network()
    }

    /// The prefix length, in [0, 32].
    pub fn prefix(&self) -> u8 {
        self.net.prefix()
    }

    /// Total number of addresses covered, 2^(32-p).
    pub fn size(&self) -> u64 {
        1u64 << (32 - self.prefix())
    }

    /// Number of candidates this range yields under the given policy.
    pub fn candidate_count(&self, policy: HostPolicy) -> u64 {
        match policy {
            HostPolicy::Full => self.size(),
            HostPolicy::SkipZeroOctet => {
                let p = self.prefix();
                if p == 32 {
                    // Single-address ranges always yield their address.
                    1
                } else if p <= 24 {
                    // One .0 per /24-equivalent block.
                    self.size() - (1u64 << (24 - p))
                } else {
                    // Sub-/24 range: contains a .0 only if it starts on one.
                    let zero = u64::from(self.base().octets()[3] == 0);
                    self.size() - zero
                }
            }
        }
    }
}

impl FromStr for AddressRange {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base(), self.prefix())
    }
}

/// Parse one range, returning a bare reason on failure so callers can attach
/// line context.
fn parse_range(s: &str) -> Result<AddressRange, String> {
    let s = s.trim();
    let (addr_part, len_part) = s
        .split_once('/')
        .ok_or_else(|| "expected <address>/<prefix>".to_string())?;

    let base: Ipv4Addr = addr_part
        .trim()
        .parse()
        .map_err(|_| format!("invalid IPv4 address '{}'", addr_part.trim()))?;

    let len_part = len_part.trim();
    let prefix = if len_part.contains('.') {
        let mask: Ipv4Addr = len_part
            .parse()
            .map_err(|_| format!("invalid netmask '{len_part}'"))?;
        let repaired = repair_mask(mask.octets());
        mask_to_prefix(repaired).ok_or_else(|| {
            format!(
                "non-contiguous netmask {} (after repair)",
                Ipv4Addr::from(repaired)
            )
        })?
    } else {
        let p: u8 = len_part
            .parse()
            .map_err(|_| format!("invalid prefix length '{len_part}'"))?;
        if p > 32 {
            return Err(format!("prefix length {p} out of range (0-32)"));
        }
        p
    };

    AddressRange::new(base, prefix).map_err(|e| e.to_string())
}

/// Repair a malformed dotted mask where a looser octet follows a stricter
/// one: a 255 in the third octet forces the second to 255, and a 255 in the
/// second forces the first to 255. `240.192.255.0` becomes `255.255.255.0`.
///
/// This is legacy-observed behavior, not a general CIDR rule; the repaired
/// mask must still be contiguous to be accepted.
fn repair_mask(mut octets: [u8; 4]) -> [u8; 4] {
    if octets[2] == 255 {
        octets[1] = 255;
    }
    if octets[1] == 255 {
        octets[0] = 255;
    }
    octets
}

/// Convert a dotted mask to a prefix length, rejecting non-contiguous masks.
fn mask_to_prefix(octets: [u8; 4]) -> Option<u8> {
    let mask = u32::from(Ipv4Addr::from(octets));
    let prefix = mask.leading_ones();
    if mask == prefix_to_mask(prefix as u8) {
        Some(prefix as u8)
    } else {
        None
    }
}

fn prefix_to_mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

/// An ordered list of address ranges parsed from a range-list input.
#[derive(Debug, Clone, Default)]
pub struct RangeList {
    ranges: Vec<AddressRange>,
}

impl RangeList {
    /// Build a list from already-parsed ranges.
    pub fn new(ranges: Vec<AddressRange>) -> Self {
        Self { ranges }
    }

    /// Parse a range-list text: one range per line, blank lines and lines
    /// beginning with `#` ignored. A malformed line is rejected with its
    /// line number and content.
    pub fn parse(text: &str) -> ConfigResult<Self> {
        let mut ranges = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let range = parse_range(line).map_err(|reason| ConfigError::InvalidRangeLine {
                line: idx + 1,
                content: line.to_string(),
                reason,
            })?;
            ranges.push(range);
        }

        if ranges.is_empty() {
            return Err(ConfigError::EmptyRangeList);
        }

        Ok(Self { ranges })
    }

    /// Read and parse a range-list file.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&text)
    }

    /// The ranges, in input order.
    pub fn ranges(&self) -> &[AddressRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Total candidates across all ranges under the given policy.
    pub fn candidate_count(&self, policy: HostPolicy) -> u64 {
        self.ranges.iter().map(|r| r.candidate_count(policy)).sum()
    }
}

impl fmt::Display for RangeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ranges.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cidr() {
        let range = AddressRange::parse("198.51.100.0/24").unwrap();
        assert_eq!(range.base(), Ipv4Addr::new(198, 51, 100, 0));
        assert_eq!(range.prefix(), 24);
        assert_eq!(range.size(), 256);
    }

    #[test]
    fn test_base_is_masked() {
        let range = AddressRange::parse("203.0.113.7/30").unwrap();
        assert_eq!(range.base(), Ipv4Addr::new(203, 0, 113, 4));
    }

    #[test]
    fn test_parse_dotted_mask() {
        let range = AddressRange::parse("10.0.0.0/255.255.0.0").unwrap();
        assert_eq!(range.prefix(), 16);
    }

    #[test]
    fn test_mask_repair_cascades() {
        // Third octet 255 forces the second, which then forces the first.
        let range = AddressRange::parse("10.0.0.0/240.192.255.0").unwrap();
        assert_eq!(range.prefix(), 24);
    }

    #[test]
    fn test_mask_repair_second_octet_only() {
        let range = AddressRange::parse("10.0.0.0/0.255.0.0").unwrap();
        assert_eq!(range.prefix(), 16);
    }

    #[test]
    fn test_non_contiguous_mask_rejected() {
        // The repair never touches the last octet; this stays broken.
        assert!(AddressRange::parse("10.0.0.0/255.255.0.255").is_err());
    }

    #[test]
    fn test_rejects_bare_address() {
        assert!(AddressRange::parse("198.51.100.1").is_err());
    }

    #[test]
    fn test_rejects_prefix_out_of_range() {
        assert!(AddressRange::parse("10.0.0.0/33").is_err());
    }

    #[test]
    fn test_rejects_ipv6() {
        assert!(AddressRange::parse("2001:db8::/32").is_err());
    }

    #[test]
    fn test_candidate_count_full() {
        let range = AddressRange::parse("10.0.0.0/22").unwrap();
        assert_eq!(range.candidate_count(HostPolicy::Full), 1024);
    }

    #[test]
    fn test_candidate_count_skip_zero() {
        // Four /24 blocks, each losing its .0.
        let range = AddressRange::parse("10.0.0.0/22").unwrap();
        assert_eq!(range.candidate_count(HostPolicy::SkipZeroOctet), 1020);

        // /30 starting on a .0 loses one candidate.
        let range = AddressRange::parse("203.0.113.0/30").unwrap();
        assert_eq!(range.candidate_count(HostPolicy::SkipZeroOctet), 3);

        // /30 not containing a .0 loses none.
        let range = AddressRange::parse("203.0.113.4/30").unwrap();
        assert_eq!(range.candidate_count(HostPolicy::SkipZeroOctet), 4);
    }

    #[test]
    fn test_candidate_count_single_address() {
        // A /32 yields its address under both policies, even x.y.z.0.
        let range = AddressRange::parse("203.0.113.0/32").unwrap();
        assert_eq!(range.candidate_count(HostPolicy::SkipZeroOctet), 1);
        assert_eq!(range.candidate_count(HostPolicy::Full), 1);
    }

    #[test]
    fn test_range_list_skips_comments_and_blanks() {
        let text = "# edge ranges\n\n198.51.100.0/24\n  \n# more\n203.0.113.0/28\n";
        let list = RangeList::parse(text).unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_range_list_error_names_line() {
        let text = "198.51.100.0/24\nnot-a-range\n";
        match RangeList::parse(text) {
            Err(ConfigError::InvalidRangeLine { line, content, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(content, "not-a-range");
            }
            other => panic!("expected InvalidRangeLine, got {other:?}"),
        }
    }

    #[test]
    fn test_range_list_empty_input() {
        assert!(matches!(
            RangeList::parse("# only comments\n"),
            Err(ConfigError::EmptyRangeList)
        ));
    }
}
