//! rtacl - An R-tree based ACL classifier.
//!
//! This crate indexes network access-control rules as 6-dimensional boxes
//! (source address, destination address, source port, destination port,
//! protocol, DSCP) and finds every rule matching a flow.
//!
//! # Features
//!
//! - **Dynamic R-tree**: Guttman R-tree with quadratic split, condense-on-delete
//!   and strict point containment, generic over the coordinate type
//! - **Inclusive ranges**: rule bounds are widened by one unit so the strict
//!   index behaves as closed ACL intervals
//! - **IPv4 and IPv6**: `i64` coordinates for IPv4, `num::BigInt` for IPv6,
//!   sharing one tree implementation
//! - **Typed handles**: the index stores [`RuleId`]s into a [`RuleTable`]
//! - **Rule files**: YAML/JSON rule lists with CIDR, range and protocol-name syntax
//! - **Profiling**: [`Prof`] latency histograms for benchmark drivers, and
//!   [`workload`] synthetic rule sets to drive them
//!
//! # Quick Start
//!
//! ```ignore
//! use rtacl::{Acl4, AclRule, FieldSet};
//! use std::net::Ipv4Addr;
//!
//! let mut acl = Acl4::new();
//!
//! // 10.0.0.0 - 10.0.0.10, any destination, any port, TCP, any DSCP
//! let min = FieldSet::lowest().with_src(Ipv4Addr::new(10, 0, 0, 0)).with_proto(6);
//! let max = FieldSet::highest().with_src(Ipv4Addr::new(10, 0, 0, 10)).with_proto(6);
//! let id = acl.add_rule(AclRule::new(min, max, 0, "r1"))?;
//!
//! let flow = FieldSet::new(Ipv4Addr::new(10, 0, 0, 2), Ipv4Addr::new(1, 2, 3, 4), 4660, 80, 6, 0);
//! assert_eq!(acl.classify(&flow), vec![id]);
//! ```
//!
//! # Using the tree directly
//!
//! ```ignore
//! use rtacl::{encode, Entry, RTree};
//!
//! let mut tree = RTree::new();
//! tree.insert(Entry::new(encode::make_range(&min, &max), 7u32));
//! let hits = tree.query(&encode::make_key(&flow));
//! ```
//!
//! # Matching
//!
//! Every rule containing the flow is returned, in no particular order.
//! Rule priorities are carried but never used to rank matches.

mod error;
mod tuple;

pub mod acl;
pub mod config;
pub mod encode;
pub mod family;
pub mod prof;
pub mod rtree;
pub mod rule;
pub mod table;
pub mod workload;

// Re-export core types
pub use error::{Error, Result};
pub use tuple::{Coordinate, Dim, Range, Tuple, DIM};

// Re-export index types
pub use rtree::{Entry, RTree, RTreeParams};

// Re-export rule and ACL types
pub use acl::{Acl, Acl4, Acl6};
pub use family::{AddressFamily, Ipv4Coord, Ipv6Coord, V4, V6};
pub use rule::{AclRule, FieldSet};
pub use table::{RuleId, RuleTable};

// Re-export configuration
pub use config::{AclConfig, Family, RuleSpec};

pub use prof::Prof;
