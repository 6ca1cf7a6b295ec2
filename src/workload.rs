//! Synthetic rule sets for benchmarks and tests.
//!
//! Rule `i` covers the 11 source addresses `base + i * stride` through
//! `base + i * stride + 10`, any destination, any port, TCP and any DSCP.
//! With the default stride of 32 the blocks never touch, so a flow from
//! `block + 2` matches exactly rule `i` and a flow from `block - 1` matches
//! nothing.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::{Error, Result};
use crate::family::{AddressFamily, V4, V6};
use crate::rule::{AclRule, FieldSet};

/// Distance between the first addresses of consecutive blocks.
pub const DEFAULT_STRIDE: u32 = 0x20;

/// Addresses past the first one covered by each block.
pub const BLOCK_SPAN: u32 = 10;

/// Source port of generated flows.
pub const FLOW_SRC_PORT: u16 = 0x1234;

/// Destination port of generated flows.
pub const FLOW_DST_PORT: u16 = 80;

/// TCP.
pub const FLOW_PROTO: u8 = 6;

/// `count` disjoint source-address blocks starting at `base`.
#[derive(Debug, Clone)]
pub struct Workload<F: AddressFamily> {
    base: F::Coord,
    stride: u32,
    count: u32,
    peer: F::Addr,
}

impl Workload<V4> {
    /// Blocks from `10.0.0.0`, flows towards `18.52.86.120`.
    pub fn v4(count: u32) -> Result<Self> {
        Self::new(Ipv4Addr::new(10, 0, 0, 0), Ipv4Addr::new(0x12, 0x34, 0x56, 0x78), count, DEFAULT_STRIDE)
    }
}

impl Workload<V6> {
    /// Blocks from `2001:0:0:1111::a00:0`, flows towards `2001:db8::1`.
    pub fn v6(count: u32) -> Result<Self> {
        let base = Ipv6Addr::new(0x2001, 0, 0, 0x1111, 0, 0, 0x0a00, 0);
        let peer = Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1);
        Self::new(base, peer, count, DEFAULT_STRIDE)
    }
}

impl<F: AddressFamily> Workload<F> {
    /// Build a workload; fails if the blocks do not fit the address space or
    /// overlap (`stride <= BLOCK_SPAN`), or if `base` leaves no room for an
    /// unmatched address below the first block.
    pub fn new(base: F::Addr, peer: F::Addr, count: u32, stride: u32) -> Result<Self> {
        if stride <= BLOCK_SPAN {
            return Err(Error::InvalidRange(format!(
                "stride {} overlaps blocks of {} addresses",
                stride,
                BLOCK_SPAN + 1
            )));
        }
        let base_coord = F::addr_to_coord(base);
        let first = base_coord.clone() - F::Coord::from(1u8);
        let last = base_coord.clone()
            + F::Coord::from(count.saturating_sub(1)) * F::Coord::from(stride)
            + F::Coord::from(BLOCK_SPAN);
        if F::coord_to_addr(&first).is_none() || F::coord_to_addr(&last).is_none() {
            return Err(Error::InvalidRange(format!(
                "{} blocks from {} do not fit in {}",
                count,
                base,
                F::NAME
            )));
        }
        Ok(Self {
            base: base_coord,
            stride,
            count,
            peer,
        })
    }

    pub fn len(&self) -> u32 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Address `delta` past the start of block `i`.
    fn addr(&self, i: u32, delta: i64) -> F::Addr {
        let offset = F::Coord::from(i) * F::Coord::from(self.stride);
        let delta = if delta < 0 {
            -F::Coord::from(delta.unsigned_abs() as u32)
        } else {
            F::Coord::from(delta as u32)
        };
        let coord = self.base.clone() + offset + delta;
        F::coord_to_addr(&coord).unwrap_or(F::MAX_ADDR)
    }

    /// Rule for block `i`; the payload is `i`.
    pub fn rule(&self, i: u32) -> AclRule<F, u32> {
        let min = FieldSet::new(self.addr(i, 0), F::MIN_ADDR, 0, 0, FLOW_PROTO, 0);
        let max = FieldSet::new(
            self.addr(i, i64::from(BLOCK_SPAN)),
            F::MAX_ADDR,
            u16::MAX,
            u16::MAX,
            FLOW_PROTO,
            u8::MAX,
        );
        AclRule::new(min, max, 0, i)
    }

    /// All rules in block order.
    pub fn rules(&self) -> impl Iterator<Item = AclRule<F, u32>> + '_ {
        (0..self.count).map(move |i| self.rule(i))
    }

    fn flow(&self, src: F::Addr) -> FieldSet<F> {
        FieldSet::new(src, self.peer, FLOW_SRC_PORT, FLOW_DST_PORT, FLOW_PROTO, 0)
    }

    /// Flow matching only rule `i`.
    pub fn inside(&self, i: u32) -> FieldSet<F> {
        self.flow(self.addr(i, 2))
    }

    /// Flow one address below block `i`, matching no rule.
    pub fn outside(&self, i: u32) -> FieldSet<F> {
        self.flow(self.addr(i, -1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v4_blocks() {
        let w = Workload::v4(4).unwrap();
        let r = w.rule(1);
        assert_eq!(r.min().src(), Ipv4Addr::new(10, 0, 0, 32));
        assert_eq!(r.max().src(), Ipv4Addr::new(10, 0, 0, 42));
        assert_eq!(*r.payload(), 1);
        assert_eq!(w.inside(1).src(), Ipv4Addr::new(10, 0, 0, 34));
        assert_eq!(w.outside(1).src(), Ipv4Addr::new(10, 0, 0, 31));
        assert_eq!(w.outside(0).src(), Ipv4Addr::new(9, 255, 255, 255));
        assert!(r.matches(&w.inside(1)));
        assert!(!r.matches(&w.outside(1)));
        assert_eq!(w.rules().count(), 4);
    }

    #[test]
    fn test_v6_blocks() {
        let w = Workload::v6(3).unwrap();
        let r = w.rule(2);
        assert_eq!(r.min().src(), Ipv6Addr::new(0x2001, 0, 0, 0x1111, 0, 0, 0x0a00, 0x40));
        assert!(r.matches(&w.inside(2)));
        assert!(!r.matches(&w.outside(2)));
    }

    #[test]
    fn test_rejects_overflow_and_overlap() {
        assert!(Workload::<V4>::new(Ipv4Addr::new(255, 255, 255, 0), Ipv4Addr::LOCALHOST, 100, 32).is_err());
        assert!(Workload::<V4>::new(Ipv4Addr::UNSPECIFIED, Ipv4Addr::LOCALHOST, 1, 32).is_err());
        assert!(Workload::<V4>::new(Ipv4Addr::new(10, 0, 0, 0), Ipv4Addr::LOCALHOST, 1, 10).is_err());
        assert!(Workload::v4(1_000_000).is_ok());
    }
}
