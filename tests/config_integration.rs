//! Integration tests for loading rule files from disk.

use rtacl::{Acl, AclConfig, Error, Family, FieldSet, V4, V6};
use std::io::Write;
use std::net::{Ipv4Addr, Ipv6Addr};
use tempfile::Builder;

const V4_RULES: &str = r#"
family: ipv4
rules:
  - name: web
    src: 10.0.0.0-10.0.0.10
    dst: 192.168.0.0/16
    dst_port: 80-443
    proto: tcp
  - name: dns
    dst_port: 53
    proto: udp
    priority: 10
  - name: mgmt
    src: 10.0.0.5
    dscp: 46
"#;

fn write_rules(suffix: &str, body: &str) -> tempfile::NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn names(acl: &Acl<V4, String>, flow: &FieldSet<V4>) -> Vec<String> {
    let mut out: Vec<String> = acl.matches(flow).into_iter().map(|(_, r)| r.payload().clone()).collect();
    out.sort();
    out
}

#[test]
fn test_load_yaml_rule_file() {
    let file = write_rules(".yaml", V4_RULES);
    let config = AclConfig::from_path(file.path()).unwrap();
    assert_eq!(config.family, Family::Ipv4);
    assert_eq!(config.rules.len(), 3);

    let acl = Acl::<V4, String>::from_config(&config).unwrap();
    assert_eq!(acl.len(), 3);

    let web = FieldSet::<V4>::new(Ipv4Addr::new(10, 0, 0, 2), Ipv4Addr::new(192, 168, 3, 4), 40000, 443, 6, 0);
    assert_eq!(names(&acl, &web), vec!["web"]);
    assert!(names(&acl, &web.with_dst_port(8080)).is_empty());
    assert!(names(&acl, &web.with_dst(Ipv4Addr::new(172, 16, 0, 1))).is_empty());

    // mgmt overlaps web for 10.0.0.5 with DSCP 46
    let both = web.with_src(Ipv4Addr::new(10, 0, 0, 5)).with_dscp(46);
    assert_eq!(names(&acl, &both), vec!["mgmt", "web"]);

    let dns = FieldSet::<V4>::new(Ipv4Addr::new(1, 2, 3, 4), Ipv4Addr::new(8, 8, 8, 8), 5353, 53, 17, 0);
    assert_eq!(names(&acl, &dns), vec!["dns"]);
}

#[test]
fn test_load_json_rule_file() {
    let json = r#"{
        "family": "ipv6",
        "params": {"max_entries": 8},
        "rules": [
            {"name": "doc", "src": "2001:db8::/32", "proto": 58},
            {"name": "any"}
        ]
    }"#;
    let file = write_rules(".json", json);
    let config = AclConfig::from_path(file.path()).unwrap();
    assert_eq!(config.params.max_entries, 8);
    assert_eq!(config.params.min_entries, 4);

    let acl = Acl::<V6, String>::from_config(&config).unwrap();
    assert_eq!(acl.index().params().max_entries, 8);

    let flow = FieldSet::<V6>::new("2001:db8::7".parse().unwrap(), Ipv6Addr::LOCALHOST, 0, 0, 58, 0);
    let mut hits: Vec<&str> = acl.matches(&flow).into_iter().map(|(_, r)| r.payload().as_str()).collect();
    hits.sort();
    assert_eq!(hits, vec!["any", "doc"]);
}

#[test]
fn test_yaml_roundtrip_through_file() {
    let config = AclConfig::from_yaml_str(V4_RULES).unwrap();
    let file = write_rules(".yml", &config.to_yaml().unwrap());
    assert_eq!(AclConfig::from_path(file.path()).unwrap(), config);

    let file = write_rules(".json", &config.to_json().unwrap());
    assert_eq!(AclConfig::from_path(file.path()).unwrap(), config);
}

#[test]
fn test_unknown_extension_rejected() {
    let file = write_rules(".txt", V4_RULES);
    assert!(matches!(AclConfig::from_path(file.path()), Err(Error::Config(_))));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yaml");
    assert!(matches!(AclConfig::from_path(&path), Err(Error::Io(_))));
}

#[test]
fn test_malformed_yaml_reported() {
    let file = write_rules(".yaml", "rules: [\n  - name: broken\n    priority: high\n");
    assert!(matches!(AclConfig::from_path(file.path()), Err(Error::Yaml(_))));
}

#[test]
fn test_family_mismatch_on_build() {
    let file = write_rules(".yaml", V4_RULES);
    let config = AclConfig::from_path(file.path()).unwrap();
    assert!(matches!(
        Acl::<V6, String>::from_config(&config),
        Err(Error::AddressFamilyMismatch { expected: "IPv6", .. })
    ));
}

#[test]
fn test_bad_rule_names_the_rule() {
    let yaml = "rules:\n  - name: typo\n    dst_port: 80-70000\n";
    let file = write_rules(".yaml", yaml);
    let config = AclConfig::from_path(file.path()).unwrap();
    match Acl::<V4, String>::from_config(&config) {
        Err(Error::Config(msg)) => assert!(msg.contains("typo"), "got: {}", msg),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("expected an error"),
    }
}
