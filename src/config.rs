//! Rule file configuration.
//!
//! A rule file lists the rules of one ACL in YAML or JSON:
//!
//! ```yaml
//! family: ipv4
//! params:
//!   max_entries: 16
//! rules:
//!   - name: web
//!     src: 10.0.0.0-10.0.0.10
//!     dst: 192.168.0.0/16
//!     dst_port: 80-443
//!     proto: tcp
//!   - name: dns
//!     dst_port: 53
//!     proto: udp
//!     priority: 10
//! ```
//!
//! Omitted fields match everything. Addresses accept `any`, a single address,
//! an `a-b` range or a CIDR block; ports, protocol and DSCP accept `any`, a
//! number or an `a-b` range, and the protocol also a well-known name.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::path::Path;

use ipnet::IpNet;

use crate::error::{Error, Result};
use crate::family::AddressFamily;
use crate::rtree::RTreeParams;
use crate::rule::{AclRule, FieldSet};

/// Address family of a rule file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    #[default]
    #[serde(alias = "v4", alias = "inet")]
    Ipv4,
    #[serde(alias = "v6", alias = "inet6")]
    Ipv6,
}

impl Family {
    /// Name matching [`AddressFamily::NAME`].
    pub fn name(&self) -> &'static str {
        match self {
            Family::Ipv4 => "IPv4",
            Family::Ipv6 => "IPv6",
        }
    }

    /// Whether this is the family `F`.
    pub fn is<F: AddressFamily>(&self) -> bool {
        self.name() == F::NAME
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A numeric field as written in a rule file: a bare number or text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSpec {
    Number(u64),
    Text(String),
}

impl From<u64> for FieldSpec {
    fn from(n: u64) -> Self {
        FieldSpec::Number(n)
    }
}

impl From<&str> for FieldSpec {
    fn from(s: &str) -> Self {
        FieldSpec::Text(s.to_string())
    }
}

/// One rule of a rule file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSpec {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_port: Option<FieldSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_port: Option<FieldSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proto: Option<FieldSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dscp: Option<FieldSpec>,
    pub priority: i32,
}

impl RuleSpec {
    /// Build the rule described here; the payload is the rule name.
    pub fn to_rule<F: AddressFamily>(&self) -> Result<AclRule<F, String>> {
        let (src_lo, src_hi) = parse_addr_range::<F>(self.src.as_deref())?;
        let (dst_lo, dst_hi) = parse_addr_range::<F>(self.dst.as_deref())?;
        let (sp_lo, sp_hi) = parse_port_range(self.src_port.as_ref())?;
        let (dp_lo, dp_hi) = parse_port_range(self.dst_port.as_ref())?;
        let (proto_lo, proto_hi) = parse_proto_range(self.proto.as_ref())?;
        let (dscp_lo, dscp_hi) = parse_dscp_range(self.dscp.as_ref())?;

        let min = FieldSet::new(src_lo, dst_lo, sp_lo, dp_lo, proto_lo, dscp_lo);
        let max = FieldSet::new(src_hi, dst_hi, sp_hi, dp_hi, proto_hi, dscp_hi);
        Ok(AclRule::new(min, max, self.priority, self.name.clone()))
    }
}

/// Contents of a rule file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AclConfig {
    pub family: Family,
    pub params: RTreeParams,
    pub rules: Vec<RuleSpec>,
}

impl AclConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let config: AclConfig = serde_yaml::from_str(s)?;
        config.params.validate()?;
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: AclConfig = serde_json::from_str(s)?;
        config.params.validate()?;
        Ok(config)
    }

    /// Load a rule file, choosing the format from its extension
    /// (`.json`, `.yaml` or `.yml`).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let text = std::fs::read_to_string(path)?;
        let config = match ext.as_deref() {
            Some("json") => Self::from_json_str(&text)?,
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text)?,
            _ => {
                return Err(Error::Config(format!(
                    "unsupported rule file extension: {}",
                    path.display()
                )))
            }
        };
        log::info!(
            "Loaded {} {} rules from {:?}",
            config.rules.len(),
            config.family,
            path
        );
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn is_any(s: &str) -> bool {
    matches!(s.trim(), "" | "*" | "any" | "all")
}

fn parse_ip<F: AddressFamily>(s: &str) -> Result<F::Addr> {
    let s = s.trim();
    let ip: IpAddr = s
        .parse()
        .map_err(|_| Error::InvalidAddress(s.to_string()))?;
    F::from_ip(ip).ok_or_else(|| Error::AddressFamilyMismatch {
        expected: F::NAME,
        actual: s.to_string(),
    })
}

/// Parse `any`, `addr`, `lo-hi` or `net/len` into inclusive bounds.
pub fn parse_addr_range<F: AddressFamily>(spec: Option<&str>) -> Result<(F::Addr, F::Addr)> {
    let s = match spec {
        Some(s) if !is_any(s) => s.trim(),
        _ => return Ok((F::MIN_ADDR, F::MAX_ADDR)),
    };

    if s.contains('/') {
        let net: IpNet = s
            .parse()
            .map_err(|_| Error::InvalidAddress(s.to_string()))?;
        let mismatch = || Error::AddressFamilyMismatch {
            expected: F::NAME,
            actual: s.to_string(),
        };
        let lo = F::from_ip(net.network()).ok_or_else(mismatch)?;
        let hi = F::from_ip(net.broadcast()).ok_or_else(mismatch)?;
        return Ok((lo, hi));
    }

    if let Some((lo, hi)) = s.split_once('-') {
        let lo = parse_ip::<F>(lo)?;
        let hi = parse_ip::<F>(hi)?;
        if lo > hi {
            return Err(Error::InvalidRange(s.to_string()));
        }
        return Ok((lo, hi));
    }

    let addr = parse_ip::<F>(s)?;
    Ok((addr, addr))
}

/// Parse `any`, `n` or `lo-hi` bounded by `max`.
fn parse_num_range(
    spec: Option<&FieldSpec>,
    max: u64,
    invalid: fn(String) -> Error,
) -> Result<(u64, u64)> {
    let (lo, hi) = match spec {
        None => return Ok((0, max)),
        Some(FieldSpec::Number(n)) => (*n, *n),
        Some(FieldSpec::Text(s)) if is_any(s) => return Ok((0, max)),
        Some(FieldSpec::Text(s)) => {
            let num = |t: &str| t.trim().parse::<u64>().map_err(|_| invalid(s.clone()));
            match s.split_once('-') {
                Some((lo, hi)) => (num(lo)?, num(hi)?),
                None => {
                    let n = num(s)?;
                    (n, n)
                }
            }
        }
    };
    if hi > max {
        return Err(invalid(format!("{} exceeds {}", hi, max)));
    }
    if lo > hi {
        return Err(Error::InvalidRange(format!("{}-{}", lo, hi)));
    }
    Ok((lo, hi))
}

/// Parse a port, port range or `any`.
pub fn parse_port_range(spec: Option<&FieldSpec>) -> Result<(u16, u16)> {
    let (lo, hi) = parse_num_range(spec, u16::MAX.into(), Error::InvalidPort)?;
    Ok((lo as u16, hi as u16))
}

/// Parse a DSCP value, range or `any`.
pub fn parse_dscp_range(spec: Option<&FieldSpec>) -> Result<(u8, u8)> {
    let (lo, hi) = parse_num_range(spec, u8::MAX.into(), Error::InvalidDscp)?;
    Ok((lo as u8, hi as u8))
}

/// Parse a protocol name, number, range or `any`.
pub fn parse_proto_range(spec: Option<&FieldSpec>) -> Result<(u8, u8)> {
    if let Some(FieldSpec::Text(s)) = spec {
        if let Some(n) = proto_number(s) {
            return Ok((n, n));
        }
    }
    let (lo, hi) = parse_num_range(spec, u8::MAX.into(), Error::InvalidProtocol)?;
    Ok((lo as u8, hi as u8))
}

/// IANA number of a well-known protocol name.
pub fn proto_number(name: &str) -> Option<u8> {
    match name.trim().to_ascii_lowercase().as_str() {
        "icmp" => Some(1),
        "tcp" => Some(6),
        "udp" => Some(17),
        "gre" => Some(47),
        "esp" => Some(50),
        "ah" => Some(51),
        "icmpv6" | "ipv6-icmp" => Some(58),
        "sctp" => Some(132),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::{V4, V6};
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_parse_addr_forms() {
        let any = parse_addr_range::<V4>(None).unwrap();
        assert_eq!(any, (Ipv4Addr::UNSPECIFIED, Ipv4Addr::BROADCAST));
        assert_eq!(parse_addr_range::<V4>(Some("any")).unwrap(), any);

        let single = parse_addr_range::<V4>(Some("10.0.0.1")).unwrap();
        assert_eq!(single, (Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 1)));

        let range = parse_addr_range::<V4>(Some("10.0.0.0 - 10.0.0.10")).unwrap();
        assert_eq!(range, (Ipv4Addr::new(10, 0, 0, 0), Ipv4Addr::new(10, 0, 0, 10)));

        let cidr = parse_addr_range::<V4>(Some("192.168.1.77/24")).unwrap();
        assert_eq!(cidr, (Ipv4Addr::new(192, 168, 1, 0), Ipv4Addr::new(192, 168, 1, 255)));
    }

    #[test]
    fn test_parse_addr_v6() {
        let (lo, hi) = parse_addr_range::<V6>(Some("2001:db8::/32")).unwrap();
        assert_eq!(lo, "2001:db8::".parse::<Ipv6Addr>().unwrap());
        assert_eq!(hi, "2001:db8:ffff:ffff:ffff:ffff:ffff:ffff".parse::<Ipv6Addr>().unwrap());
    }

    #[test]
    fn test_parse_addr_errors() {
        assert!(matches!(
            parse_addr_range::<V4>(Some("10.0.0.300")),
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            parse_addr_range::<V4>(Some("::1")),
            Err(Error::AddressFamilyMismatch { expected: "IPv4", .. })
        ));
        assert!(matches!(
            parse_addr_range::<V6>(Some("10.0.0.0/8")),
            Err(Error::AddressFamilyMismatch { expected: "IPv6", .. })
        ));
        assert!(matches!(
            parse_addr_range::<V4>(Some("10.0.0.9-10.0.0.1")),
            Err(Error::InvalidRange(_))
        ));
    }

    #[test]
    fn test_parse_ports() {
        assert_eq!(parse_port_range(None).unwrap(), (0, 65535));
        assert_eq!(parse_port_range(Some(&80.into())).unwrap(), (80, 80));
        assert_eq!(parse_port_range(Some(&"1024-2048".into())).unwrap(), (1024, 2048));
        assert_eq!(parse_port_range(Some(&"*".into())).unwrap(), (0, 65535));
        assert!(matches!(parse_port_range(Some(&70000.into())), Err(Error::InvalidPort(_))));
        assert!(matches!(parse_port_range(Some(&"http".into())), Err(Error::InvalidPort(_))));
        assert!(matches!(parse_port_range(Some(&"443-80".into())), Err(Error::InvalidRange(_))));
    }

    #[test]
    fn test_parse_proto_and_dscp() {
        assert_eq!(parse_proto_range(Some(&"TCP".into())).unwrap(), (6, 6));
        assert_eq!(parse_proto_range(Some(&"icmpv6".into())).unwrap(), (58, 58));
        assert_eq!(parse_proto_range(Some(&17.into())).unwrap(), (17, 17));
        assert_eq!(parse_proto_range(None).unwrap(), (0, 255));
        assert!(matches!(parse_proto_range(Some(&"quic".into())), Err(Error::InvalidProtocol(_))));

        assert_eq!(parse_dscp_range(Some(&"8-15".into())).unwrap(), (8, 15));
        assert!(matches!(parse_dscp_range(Some(&256.into())), Err(Error::InvalidDscp(_))));
    }

    #[test]
    fn test_yaml_config() {
        let yaml = r#"
family: ipv4
params:
  max_entries: 8
rules:
  - name: web
    src: 10.0.0.0-10.0.0.10
    dst_port: 80-443
    proto: tcp
  - name: dns
    dst_port: 53
    proto: udp
    priority: 10
"#;
        let config = AclConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.family, Family::Ipv4);
        assert_eq!(config.params.max_entries, 8);
        assert_eq!(config.params.min_entries, 4);
        assert_eq!(config.rules.len(), 2);
        assert_eq!(config.rules[0].dst_port, Some(FieldSpec::Text("80-443".into())));
        assert_eq!(config.rules[1].dst_port, Some(FieldSpec::Number(53)));
        assert_eq!(config.rules[1].priority, 10);
    }

    #[test]
    fn test_yaml_config_rejects_bad_params() {
        let yaml = "params:\n  max_entries: 2\n  min_entries: 1\n";
        assert!(matches!(
            AclConfig::from_yaml_str(yaml),
            Err(Error::InvalidParams { .. })
        ));
    }

    #[test]
    fn test_json_config() {
        let json = r#"{"family": "ipv6", "rules": [{"name": "all"}]}"#;
        let config = AclConfig::from_json_str(json).unwrap();
        assert_eq!(config.family, Family::Ipv6);
        assert!(config.family.is::<V6>());
        assert!(!config.family.is::<V4>());
        assert_eq!(config.params, RTreeParams::default());
        assert_eq!(config.rules[0].src, None);
    }

    #[test]
    fn test_rule_spec_to_rule() {
        let spec = RuleSpec {
            name: "web".into(),
            src: Some("10.0.0.0/29".into()),
            dst_port: Some(443.into()),
            proto: Some("tcp".into()),
            priority: 3,
            ..Default::default()
        };
        let rule = spec.to_rule::<V4>().unwrap();
        assert_eq!(rule.min().src(), Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(rule.max().src(), Ipv4Addr::new(10, 0, 0, 7));
        assert_eq!(rule.min().dst_port(), 443);
        assert_eq!(rule.max().dst_port(), 443);
        assert_eq!(rule.max().src_port(), 65535);
        assert_eq!(rule.min().proto(), 6);
        assert_eq!(rule.priority(), 3);
        assert_eq!(rule.payload(), "web");
    }

    #[test]
    fn test_config_yaml_roundtrip_keeps_rules() {
        let config = AclConfig {
            family: Family::Ipv4,
            params: RTreeParams::default(),
            rules: vec![RuleSpec {
                name: "ssh".into(),
                dst_port: Some(22.into()),
                ..Default::default()
            }],
        };
        let yaml = config.to_yaml().unwrap();
        assert!(!yaml.contains("src_port"));
        assert_eq!(AclConfig::from_yaml_str(&yaml).unwrap(), config);
    }
}
