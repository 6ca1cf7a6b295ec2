//! Rule records.
//!
//! An [`AclRule`] is two inclusive [`FieldSet`]s (the lowest and highest
//! matching flow) plus a priority and a caller payload. Rules are plain data;
//! [`crate::encode`] turns them into index ranges.

use std::fmt;

use crate::encode;
use crate::family::AddressFamily;
use crate::tuple::{Dim, Range};

/// The six matchable fields of a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldSet<F: AddressFamily> {
    src: F::Addr,
    dst: F::Addr,
    src_port: u16,
    dst_port: u16,
    proto: u8,
    dscp: u8,
}

impl<F: AddressFamily> FieldSet<F> {
    pub fn new(src: F::Addr, dst: F::Addr, src_port: u16, dst_port: u16, proto: u8, dscp: u8) -> Self {
        Self {
            src,
            dst,
            src_port,
            dst_port,
            proto,
            dscp,
        }
    }

    /// Every field at its lowest value.
    pub fn lowest() -> Self {
        Self::new(F::MIN_ADDR, F::MIN_ADDR, 0, 0, 0, 0)
    }

    /// Every field at its highest value.
    pub fn highest() -> Self {
        Self::new(F::MAX_ADDR, F::MAX_ADDR, u16::MAX, u16::MAX, u8::MAX, u8::MAX)
    }

    /// Fields of a flow between two sockets.
    pub fn from_sockets(src: &F::Socket, dst: &F::Socket, proto: u8, dscp: u8) -> Self {
        let (src_addr, src_port) = F::socket_parts(src);
        let (dst_addr, dst_port) = F::socket_parts(dst);
        Self::new(src_addr, dst_addr, src_port, dst_port, proto, dscp)
    }

    pub fn src(&self) -> F::Addr {
        self.src
    }

    pub fn dst(&self) -> F::Addr {
        self.dst
    }

    pub fn src_port(&self) -> u16 {
        self.src_port
    }

    pub fn dst_port(&self) -> u16 {
        self.dst_port
    }

    pub fn proto(&self) -> u8 {
        self.proto
    }

    pub fn dscp(&self) -> u8 {
        self.dscp
    }

    /// Source side as a socket address.
    pub fn src_socket(&self) -> F::Socket {
        F::socket(self.src, self.src_port)
    }

    /// Destination side as a socket address.
    pub fn dst_socket(&self) -> F::Socket {
        F::socket(self.dst, self.dst_port)
    }

    /// Replace every field at once.
    pub fn set(&mut self, src: F::Addr, dst: F::Addr, src_port: u16, dst_port: u16, proto: u8, dscp: u8) {
        *self = Self::new(src, dst, src_port, dst_port, proto, dscp);
    }

    pub fn with_src(mut self, src: F::Addr) -> Self {
        self.src = src;
        self
    }

    pub fn with_dst(mut self, dst: F::Addr) -> Self {
        self.dst = dst;
        self
    }

    pub fn with_src_port(mut self, port: u16) -> Self {
        self.src_port = port;
        self
    }

    pub fn with_dst_port(mut self, port: u16) -> Self {
        self.dst_port = port;
        self
    }

    pub fn with_proto(mut self, proto: u8) -> Self {
        self.proto = proto;
        self
    }

    pub fn with_dscp(mut self, dscp: u8) -> Self {
        self.dscp = dscp;
        self
    }

    /// First field where `self` is above `upper`, if any.
    pub(crate) fn first_above(&self, upper: &Self) -> Option<Dim> {
        if self.src > upper.src {
            Some(Dim::SrcAddr)
        } else if self.dst > upper.dst {
            Some(Dim::DstAddr)
        } else if self.src_port > upper.src_port {
            Some(Dim::SrcPort)
        } else if self.dst_port > upper.dst_port {
            Some(Dim::DstPort)
        } else if self.proto > upper.proto {
            Some(Dim::Proto)
        } else if self.dscp > upper.dscp {
            Some(Dim::Dscp)
        } else {
            None
        }
    }
}

impl<F: AddressFamily> fmt::Display for FieldSet<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}, {}, {}",
            self.src, self.dst, self.src_port, self.dst_port, self.proto, self.dscp
        )
    }
}

/// An ACL rule: an inclusive box over flow fields plus priority and payload.
///
/// The priority is carried for callers; lookups return every matching rule
/// and never rank by it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclRule<F: AddressFamily, P = ()> {
    min: FieldSet<F>,
    max: FieldSet<F>,
    priority: i32,
    payload: P,
}

impl<F: AddressFamily, P> AclRule<F, P> {
    pub fn new(min: FieldSet<F>, max: FieldSet<F>, priority: i32, payload: P) -> Self {
        Self {
            min,
            max,
            priority,
            payload,
        }
    }

    /// Rule matching exactly one flow.
    pub fn exact(fields: FieldSet<F>, priority: i32, payload: P) -> Self {
        Self::new(fields, fields, priority, payload)
    }

    pub fn min(&self) -> &FieldSet<F> {
        &self.min
    }

    pub fn max(&self) -> &FieldSet<F> {
        &self.max
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut P {
        &mut self.payload
    }

    pub fn into_payload(self) -> P {
        self.payload
    }

    /// Replace bounds and priority at once.
    pub fn set(&mut self, min: FieldSet<F>, max: FieldSet<F>, priority: i32) {
        self.min = min;
        self.max = max;
        self.priority = priority;
    }

    /// `min <= max` in every field.
    pub fn is_well_formed(&self) -> bool {
        self.first_inverted().is_none()
    }

    /// First field where `min > max`, if any.
    pub fn first_inverted(&self) -> Option<Dim> {
        self.min.first_above(&self.max)
    }

    /// The index range for this rule.
    pub fn range(&self) -> Range<F::Coord> {
        encode::make_range(&self.min, &self.max)
    }

    /// Whether `flow` falls inside the rule's inclusive bounds.
    pub fn matches(&self, flow: &FieldSet<F>) -> bool {
        self.min.first_above(flow).is_none() && flow.first_above(&self.max).is_none()
    }
}

impl<F: AddressFamily, P> fmt::Display for AclRule<F, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (lo, hi) = (&self.min, &self.max);
        write!(
            f,
            "{}-{}, {}-{}, {}-{}, {}-{}, {}-{}, {}-{}",
            lo.src,
            hi.src,
            lo.dst,
            hi.dst,
            lo.src_port,
            hi.src_port,
            lo.dst_port,
            hi.dst_port,
            lo.proto,
            hi.proto,
            lo.dscp,
            hi.dscp
        )
    }
}
