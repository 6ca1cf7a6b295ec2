//! ACL database: a rule table plus the R-tree indexing it.

use crate::config::AclConfig;
use crate::encode;
use crate::error::{Error, Result};
use crate::family::{AddressFamily, V4, V6};
use crate::rtree::{Entry, RTree, RTreeParams};
use crate::rule::{AclRule, FieldSet};
use crate::table::{RuleId, RuleTable};

/// IPv4 ACL.
pub type Acl4<P = ()> = Acl<V4, P>;

/// IPv6 ACL.
pub type Acl6<P = ()> = Acl<V6, P>;

/// A set of rules of family `F` with payload `P`, indexed for flow lookup.
///
/// The index stores only [`RuleId`] handles; rules live in a side table and
/// come back out of [`Acl::remove_rule`].
pub struct Acl<F: AddressFamily, P = ()> {
    index: RTree<F::Coord, RuleId>,
    rules: RuleTable<AclRule<F, P>>,
}

impl<F: AddressFamily, P> Default for Acl<F, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: AddressFamily, P> Acl<F, P> {
    pub fn new() -> Self {
        Self {
            index: RTree::new(),
            rules: RuleTable::new(),
        }
    }

    pub fn with_params(params: RTreeParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            index: RTree::with_params(params),
            rules: RuleTable::new(),
        })
    }

    /// Add a rule and return its id.
    ///
    /// Rules with `min > max` in some field are rejected.
    pub fn add_rule(&mut self, rule: AclRule<F, P>) -> Result<RuleId> {
        if let Some(dim) = rule.first_inverted() {
            return Err(Error::InvalidRange(format!(
                "{} (min > max in {})",
                rule,
                dim.name()
            )));
        }
        let range = rule.range();
        let id = self.rules.insert(rule);
        self.index.insert(Entry::new(range, id));
        log::debug!("Added rule {} ({} rules)", id, self.rules.len());
        Ok(id)
    }

    /// Remove a rule, returning it; `None` if `id` is not live.
    pub fn remove_rule(&mut self, id: RuleId) -> Option<AclRule<F, P>> {
        let Some(rule) = self.rules.get(id) else {
            log::warn!("Remove of unknown rule {}", id);
            return None;
        };
        let removed = self.index.remove(&Entry::new(rule.range(), id));
        debug_assert!(removed, "rule {} missing from index", id);
        log::debug!("Removed rule {} ({} rules)", id, self.rules.len() - 1);
        self.rules.remove(id)
    }

    /// Ids of every rule matching `flow`, in no particular order.
    ///
    /// All matches are returned; priorities are not used to pick a winner.
    pub fn classify(&self, flow: &FieldSet<F>) -> Vec<RuleId> {
        let key = encode::make_key(flow);
        let mut out = Vec::new();
        self.index.query_with(&key, |e| out.push(e.handle));
        out
    }

    /// Every rule matching `flow`, with its id.
    pub fn matches(&self, flow: &FieldSet<F>) -> Vec<(RuleId, &AclRule<F, P>)> {
        self.classify(flow)
            .into_iter()
            .filter_map(|id| self.rules.get(id).map(|r| (id, r)))
            .collect()
    }

    pub fn rule(&self, id: RuleId) -> Option<&AclRule<F, P>> {
        self.rules.get(id)
    }

    /// Mutable access to a rule's payload. Bounds are fixed once indexed.
    pub fn payload_mut(&mut self, id: RuleId) -> Option<&mut P> {
        self.rules.get_mut(id).map(AclRule::payload_mut)
    }

    /// Live rules in id order.
    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &AclRule<F, P>)> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The underlying index.
    pub fn index(&self) -> &RTree<F::Coord, RuleId> {
        &self.index
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.rules.clear();
    }
}

impl<F: AddressFamily> Acl<F, String> {
    /// Build an ACL from a rule file; each payload is the rule's name.
    pub fn from_config(config: &AclConfig) -> Result<Self> {
        if !config.family.is::<F>() {
            return Err(Error::AddressFamilyMismatch {
                expected: F::NAME,
                actual: config.family.to_string(),
            });
        }
        let mut acl = Self::with_params(config.params)?;
        for spec in &config.rules {
            let rule = spec
                .to_rule::<F>()
                .map_err(|e| Error::Config(format!("rule {:?}: {}", spec.name, e)))?;
            acl.add_rule(rule)?;
        }
        log::info!("Built {} ACL with {} rules", F::NAME, acl.len());
        Ok(acl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Family, RuleSpec};
    use std::net::Ipv4Addr;

    fn src_block(lo: Ipv4Addr, hi: Ipv4Addr) -> AclRule<V4, &'static str> {
        let min = FieldSet::lowest().with_src(lo).with_proto(6);
        let max = FieldSet::highest().with_src(hi).with_proto(6);
        AclRule::new(min, max, 0, "block")
    }

    fn flow(src: Ipv4Addr) -> FieldSet<V4> {
        FieldSet::new(src, Ipv4Addr::new(18, 52, 86, 120), 4660, 80, 6, 0)
    }

    #[test]
    fn test_add_classify_remove() {
        let mut acl = Acl4::new();
        let id = acl
            .add_rule(src_block(Ipv4Addr::new(10, 0, 0, 0), Ipv4Addr::new(10, 0, 0, 10)))
            .unwrap();
        assert_eq!(acl.len(), 1);
        assert_eq!(acl.classify(&flow(Ipv4Addr::new(10, 0, 0, 2))), vec![id]);
        assert!(acl.classify(&flow(Ipv4Addr::new(10, 0, 0, 11))).is_empty());

        let rule = acl.remove_rule(id).unwrap();
        assert_eq!(*rule.payload(), "block");
        assert!(acl.is_empty());
        assert!(acl.classify(&flow(Ipv4Addr::new(10, 0, 0, 2))).is_empty());
        assert!(acl.remove_rule(id).is_none());
    }

    #[test]
    fn test_malformed_rule_rejected() {
        let mut acl = Acl4::new();
        let rule = src_block(Ipv4Addr::new(10, 0, 0, 10), Ipv4Addr::new(10, 0, 0, 0));
        assert!(matches!(acl.add_rule(rule), Err(Error::InvalidRange(_))));
        assert!(acl.is_empty());
    }

    #[test]
    fn test_overlapping_rules_all_match() {
        let mut acl = Acl4::new();
        let wide = acl
            .add_rule(src_block(Ipv4Addr::new(10, 0, 0, 0), Ipv4Addr::new(10, 0, 0, 255)))
            .unwrap();
        let narrow = acl
            .add_rule(AclRule::new(
                FieldSet::lowest().with_src(Ipv4Addr::new(10, 0, 0, 5)).with_proto(6),
                FieldSet::highest().with_src(Ipv4Addr::new(10, 0, 0, 6)).with_proto(6),
                100,
                "narrow",
            ))
            .unwrap();

        let mut hits = acl.classify(&flow(Ipv4Addr::new(10, 0, 0, 5)));
        hits.sort();
        assert_eq!(hits, vec![wide, narrow]);

        let names: Vec<&str> = acl
            .matches(&flow(Ipv4Addr::new(10, 0, 0, 200)))
            .into_iter()
            .map(|(_, r)| *r.payload())
            .collect();
        assert_eq!(names, vec!["block"]);
    }

    #[test]
    fn test_payload_mut() {
        let mut acl: Acl4<u32> = Acl::new();
        let id = acl.add_rule(AclRule::exact(flow(Ipv4Addr::LOCALHOST), 0, 1)).unwrap();
        *acl.payload_mut(id).unwrap() += 1;
        assert_eq!(acl.rule(id).map(|r| *r.payload()), Some(2));
        assert_eq!(acl.classify(&flow(Ipv4Addr::LOCALHOST)), vec![id]);
    }

    #[test]
    fn test_from_config() {
        let config = AclConfig {
            family: Family::Ipv4,
            params: RTreeParams::default(),
            rules: vec![
                RuleSpec {
                    name: "r1".into(),
                    src: Some("10.0.0.0-10.0.0.10".into()),
                    proto: Some("tcp".into()),
                    ..Default::default()
                },
                RuleSpec {
                    name: "dns".into(),
                    dst_port: Some(53.into()),
                    proto: Some("udp".into()),
                    ..Default::default()
                },
            ],
        };
        let acl = Acl4::<String>::from_config(&config).unwrap();
        assert_eq!(acl.len(), 2);

        let hits = acl.matches(&flow(Ipv4Addr::new(10, 0, 0, 2)));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].1.payload(), "r1");

        let dns = FieldSet::new(Ipv4Addr::new(1, 1, 1, 1), Ipv4Addr::new(8, 8, 8, 8), 5353, 53, 17, 0);
        assert_eq!(acl.matches(&dns)[0].1.payload(), "dns");
    }

    #[test]
    fn test_from_config_family_mismatch() {
        let config = AclConfig {
            family: Family::Ipv6,
            ..Default::default()
        };
        assert!(matches!(
            Acl4::<String>::from_config(&config),
            Err(Error::AddressFamilyMismatch { .. })
        ));
    }

    #[test]
    fn test_from_config_bad_rule() {
        let config = AclConfig {
            rules: vec![RuleSpec {
                name: "bad".into(),
                src: Some("::1".into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        match Acl4::<String>::from_config(&config) {
            Err(Error::Config(msg)) => assert!(msg.contains("bad"), "got: {}", msg),
            other => panic!("expected config error, got {:?}", other.map(|a| a.len())),
        }
    }
}
