//! Address families.
//!
//! The index itself is family-agnostic; an [`AddressFamily`] fixes the
//! address type, the socket-address type and the coordinate type wide enough
//! for that family's tuples. [`V4`] uses `i64` coordinates (32-bit addresses
//! plus slack), [`V6`] uses `num::BigInt` (128-bit addresses plus slack).

use num::{BigInt, ToPrimitive};
use std::fmt;
use std::hash::Hash;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddrV4, SocketAddrV6};
use std::str::FromStr;

use crate::tuple::Coordinate;

/// Coordinate type of IPv4 tuples.
pub type Ipv4Coord = i64;

/// Coordinate type of IPv6 tuples.
pub type Ipv6Coord = BigInt;

/// Static description of an address family.
pub trait AddressFamily: fmt::Debug + Clone + Copy + PartialEq + Eq + Hash + 'static {
    /// Host address.
    type Addr: Copy + Eq + Ord + Hash + fmt::Debug + fmt::Display + FromStr;
    /// Socket address (address and port).
    type Socket: Copy + Eq + fmt::Debug;
    /// Coordinate type of tuples built from this family.
    type Coord: Coordinate;

    /// Human-readable family name.
    const NAME: &'static str;
    /// Lowest address (`0.0.0.0` / `::`).
    const MIN_ADDR: Self::Addr;
    /// Highest address (`255.255.255.255` / `ffff:...:ffff`).
    const MAX_ADDR: Self::Addr;

    /// Widen an address into a coordinate.
    fn addr_to_coord(addr: Self::Addr) -> Self::Coord;

    /// Narrow a coordinate back into an address, `None` when out of range.
    fn coord_to_addr(coord: &Self::Coord) -> Option<Self::Addr>;

    /// Extract an address of this family from a generic IP address.
    fn from_ip(ip: IpAddr) -> Option<Self::Addr>;

    /// Split a socket address into its address and port.
    fn socket_parts(sock: &Self::Socket) -> (Self::Addr, u16);

    /// Build a socket address from an address and a port.
    fn socket(addr: Self::Addr, port: u16) -> Self::Socket;
}

/// IPv4 address family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum V4 {}

/// IPv6 address family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum V6 {}

impl AddressFamily for V4 {
    type Addr = Ipv4Addr;
    type Socket = SocketAddrV4;
    type Coord = Ipv4Coord;

    const NAME: &'static str = "IPv4";
    const MIN_ADDR: Ipv4Addr = Ipv4Addr::UNSPECIFIED;
    const MAX_ADDR: Ipv4Addr = Ipv4Addr::BROADCAST;

    #[inline]
    fn addr_to_coord(addr: Ipv4Addr) -> i64 {
        i64::from(u32::from(addr))
    }

    fn coord_to_addr(coord: &i64) -> Option<Ipv4Addr> {
        u32::try_from(*coord).ok().map(Ipv4Addr::from)
    }

    fn from_ip(ip: IpAddr) -> Option<Ipv4Addr> {
        match ip {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        }
    }

    fn socket_parts(sock: &SocketAddrV4) -> (Ipv4Addr, u16) {
        (*sock.ip(), sock.port())
    }

    fn socket(addr: Ipv4Addr, port: u16) -> SocketAddrV4 {
        SocketAddrV4::new(addr, port)
    }
}

impl AddressFamily for V6 {
    type Addr = Ipv6Addr;
    type Socket = SocketAddrV6;
    type Coord = Ipv6Coord;

    const NAME: &'static str = "IPv6";
    const MIN_ADDR: Ipv6Addr = Ipv6Addr::UNSPECIFIED;
    const MAX_ADDR: Ipv6Addr = Ipv6Addr::new(
        0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff,
    );

    #[inline]
    fn addr_to_coord(addr: Ipv6Addr) -> BigInt {
        BigInt::from(u128::from(addr))
    }

    fn coord_to_addr(coord: &BigInt) -> Option<Ipv6Addr> {
        coord.to_u128().map(Ipv6Addr::from)
    }

    fn from_ip(ip: IpAddr) -> Option<Ipv6Addr> {
        match ip {
            IpAddr::V6(v6) => Some(v6),
            IpAddr::V4(_) => None,
        }
    }

    fn socket_parts(sock: &SocketAddrV6) -> (Ipv6Addr, u16) {
        (*sock.ip(), sock.port())
    }

    fn socket(addr: Ipv6Addr, port: u16) -> SocketAddrV6 {
        SocketAddrV6::new(addr, port, 0, 0)
    }
}
