//! Lazy address enumeration over CIDR ranges.
//!
//! Turns a [`RangeList`] into a deterministic, restartable sequence of
//! candidate addresses without ever materializing a range. Coarse ranges
//! (prefix < 24) are subdivided into /24-equivalent blocks of 256 addresses
//! and enumerated block by block, so per-call memory stays O(batch size) no
//! matter how large the range is: a /8 costs the same per call as a /28.
//!
//! Enumeration order is fully determined by the configuration (range order,
//! then block order, then ascending addresses). That determinism is what
//! makes cursor-based resume exact: a [`Cursor`] taken at any point and fed
//! back into [`AddressEnumerator::resume`] continues the sequence with no
//! repeats and no gaps.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

use crate::types::{AddressRange, HostPolicy, RangeList};

/// Addresses per /24-equivalent block.
const BLOCK_SIZE: u64 = 256;

/// Opaque, durable position into the enumeration sequence.
///
/// Serializable so a paused or interrupted session can persist its exact
/// dispatch frontier. The cursor always points at the next position to be
/// *offered*, never at one already handed out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    range: usize,
    block: u32,
    offset: u32,
}

/// Lazy enumerator over one or more address ranges.
pub struct AddressEnumerator {
    ranges: RangeList,
    policy: HostPolicy,
    cursor: Cursor,
}

impl AddressEnumerator {
    /// Start enumerating from the beginning of the range list.
    pub fn new(ranges: RangeList, policy: HostPolicy) -> Self {
        Self {
            ranges,
            policy,
            cursor: Cursor::default(),
        }
    }

    /// Resume enumerating from a previously captured cursor.
    ///
    /// The ranges and policy must match the configuration the cursor was
    /// taken under; the cursor is otherwise opaque.
    pub fn resume(ranges: RangeList, policy: HostPolicy, cursor: Cursor) -> Self {
        Self {
            ranges,
            policy,
            cursor,
        }
    }

    /// The current position. Everything before it has been offered.
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// The host policy in effect.
    pub fn policy(&self) -> HostPolicy {
        self.policy
    }

    /// Total candidates the full sequence yields under the policy.
    pub fn total_candidates(&self) -> u64 {
        self.ranges.candidate_count(self.policy)
    }

    /// Pull the next candidate, advancing the cursor. `None` once exhausted.
    pub fn next_candidate(&mut self) -> Option<Ipv4Addr> {
        loop {
            let range = *self.ranges.ranges().get(self.cursor.range)?;
            let (block_count, block_size) = geometry(&range);

            if u64::from(self.cursor.block) >= block_count {
                self.cursor.range += 1;
                self.cursor.block = 0;
                self.cursor.offset = 0;
                continue;
            }
            if u64::from(self.cursor.offset) >= block_size {
                self.cursor.block += 1;
                self.cursor.offset = 0;
                continue;
            }

            let addr_bits = u64::from(u32::from(range.base()))
                + u64::from(self.cursor.block) * block_size
                + u64::from(self.cursor.offset);
            self.cursor.offset += 1;

            let addr = Ipv4Addr::from(addr_bits as u32);
            if self.excluded(&range, addr) {
                continue;
            }
            return Some(addr);
        }
    }

    /// Pull up to `n` candidates in order.
    ///
    /// Returns the batch and an exhausted flag. The flag is set once the
    /// sequence ran out while filling the batch; a full batch that consumed
    /// the final candidate reports exhaustion on the next call.
    pub fn next_batch(&mut self, n: usize) -> (Vec<Ipv4Addr>, bool) {
        let mut batch = Vec::with_capacity(n.min(1024));
        while batch.len() < n {
            match self.next_candidate() {
                Some(addr) => batch.push(addr),
                None => return (batch, true),
            }
        }
        (batch, false)
    }

    fn excluded(&self, range: &AddressRange, addr: Ipv4Addr) -> bool {
        match self.policy {
            HostPolicy::Full => false,
            HostPolicy::SkipZeroOctet => range.prefix() < 32 && addr.octets()[3] == 0,
        }
    }
}

/// Block layout for a range: (block count, block size).
///
/// Ranges at /24 or finer are a single contiguous block; coarser ranges
/// split into 2^(24-p) blocks of 256.
fn geometry(range: &AddressRange) -> (u64, u64) {
    let prefix = range.prefix();
    if prefix >= 24 {
        (1, 1u64 << (32 - prefix))
    } else {
        (1u64 << (24 - prefix), BLOCK_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn list(specs: &[&str]) -> RangeList {
        RangeList::new(specs.iter().map(|s| s.parse().unwrap()).collect())
    }

    fn drain(e: &mut AddressEnumerator) -> Vec<Ipv4Addr> {
        let mut out = Vec::new();
        while let Some(a) = e.next_candidate() {
            out.push(a);
        }
        out
    }

    #[test]
    fn test_slash_30_full() {
        let mut e = AddressEnumerator::new(list(&["203.0.113.0/30"]), HostPolicy::Full);
        let addrs = drain(&mut e);
        let expected: Vec<Ipv4Addr> = (0..4).map(|i| Ipv4Addr::new(203, 0, 113, i)).collect();
        assert_eq!(addrs, expected);
    }

    #[test]
    fn test_slash_30_skip_zero_octet() {
        let mut e = AddressEnumerator::new(list(&["203.0.113.0/30"]), HostPolicy::SkipZeroOctet);
        let addrs = drain(&mut e);
        let expected: Vec<Ipv4Addr> = (1..4).map(|i| Ipv4Addr::new(203, 0, 113, i)).collect();
        assert_eq!(addrs, expected);
    }

    #[test]
    fn test_slash_32_always_yields() {
        let mut e = AddressEnumerator::new(list(&["203.0.113.0/32"]), HostPolicy::SkipZeroOctet);
        assert_eq!(drain(&mut e), vec![Ipv4Addr::new(203, 0, 113, 0)]);
    }

    #[test]
    fn test_block_subdivision_order() {
        // /22 splits into four /24 blocks enumerated in order.
        let mut e = AddressEnumerator::new(list(&["10.0.0.0/22"]), HostPolicy::SkipZeroOctet);
        let addrs = drain(&mut e);
        assert_eq!(addrs.len(), 1020);
        assert_eq!(addrs[0], Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(addrs[254], Ipv4Addr::new(10, 0, 0, 255));
        assert_eq!(addrs[255], Ipv4Addr::new(10, 0, 1, 1));
        assert_eq!(*addrs.last().unwrap(), Ipv4Addr::new(10, 0, 3, 255));
    }

    #[test]
    fn test_no_duplicates_no_gaps() {
        for policy in [HostPolicy::Full, HostPolicy::SkipZeroOctet] {
            let ranges = list(&["10.0.0.0/22"]);
            let expected = ranges.candidate_count(policy);
            let mut e = AddressEnumerator::new(ranges, policy);
            let addrs = drain(&mut e);
            let unique: HashSet<_> = addrs.iter().copied().collect();
            assert_eq!(addrs.len() as u64, expected);
            assert_eq!(unique.len(), addrs.len());
        }
    }

    #[test]
    fn test_multiple_ranges_in_input_order() {
        let mut e = AddressEnumerator::new(
            list(&["203.0.113.4/30", "198.51.100.0/31"]),
            HostPolicy::Full,
        );
        let addrs = drain(&mut e);
        assert_eq!(
            addrs,
            vec![
                Ipv4Addr::new(203, 0, 113, 4),
                Ipv4Addr::new(203, 0, 113, 5),
                Ipv4Addr::new(203, 0, 113, 6),
                Ipv4Addr::new(203, 0, 113, 7),
                Ipv4Addr::new(198, 51, 100, 0),
                Ipv4Addr::new(198, 51, 100, 1),
            ]
        );
    }

    #[test]
    fn test_cursor_resume_matches_continuous() {
        let ranges = list(&["10.0.0.0/23", "203.0.113.0/29"]);
        let policy = HostPolicy::SkipZeroOctet;

        let mut continuous = AddressEnumerator::new(ranges.clone(), policy);
        let all = drain(&mut continuous);

        // Split at assorted points, including block and range boundaries.
        for split in [0usize, 1, 100, 255, 256, 509, 510, 513, all.len()] {
            let mut first = AddressEnumerator::new(ranges.clone(), policy);
            let mut head = Vec::new();
            for _ in 0..split {
                head.push(first.next_candidate().unwrap());
            }
            let cursor = first.cursor();
            drop(first);

            let mut second = AddressEnumerator::resume(ranges.clone(), policy, cursor);
            let tail = drain(&mut second);

            let mut joined = head;
            joined.extend(tail);
            assert_eq!(joined, all, "split at {split} diverged");
        }
    }

    #[test]
    fn test_cursor_serializes_opaquely() {
        let ranges = list(&["10.0.0.0/23"]);
        let mut e = AddressEnumerator::new(ranges.clone(), HostPolicy::Full);
        let (_, _) = e.next_batch(300);

        let json = serde_json::to_string(&e.cursor()).unwrap();
        let restored: Cursor = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, e.cursor());

        let mut resumed = AddressEnumerator::resume(ranges, HostPolicy::Full, restored);
        assert_eq!(resumed.next_candidate(), e.next_candidate());
    }

    #[test]
    fn test_next_batch_exhaustion() {
        let mut e = AddressEnumerator::new(list(&["203.0.113.0/30"]), HostPolicy::Full);
        let (batch, exhausted) = e.next_batch(3);
        assert_eq!(batch.len(), 3);
        assert!(!exhausted);

        let (batch, exhausted) = e.next_batch(3);
        assert_eq!(batch.len(), 1);
        assert!(exhausted);

        let (batch, exhausted) = e.next_batch(3);
        assert!(batch.is_empty());
        assert!(exhausted);
    }

    #[test]
    fn test_total_candidates_matches_yield() {
        let ranges = list(&["10.0.0.0/22", "203.0.113.0/30", "192.0.2.0/32"]);
        for policy in [HostPolicy::Full, HostPolicy::SkipZeroOctet] {
            let mut e = AddressEnumerator::new(ranges.clone(), policy);
            let total = e.total_candidates();
            assert_eq!(drain(&mut e).len() as u64, total);
        }
    }
}
