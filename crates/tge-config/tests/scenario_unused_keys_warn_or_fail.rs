//! Unused-key guard.
//!
//! GREEN when:
//! - unknown leaves are reported under Warn without error
//! - the same leaves fail under Fail
//! - every key the pipeline reads is considered consumed

use tge_config::{load_layered_yaml_from_strings, report_unused_keys, UnusedKeyPolicy};

const FULL_YAML: &str = r#"
market:
  time_zone: "Europe/Warsaw"
  unit: "PLN/MWh"
source:
  url: "https://wyniki.tge.pl/pl/wyniki/rdn/fixing-I/"
  user_agent: "tge-test"
  accept_language: "pl-PL"
  referer: "https://wyniki.tge.pl/"
  timeout_secs: 30
extraction:
  price_column_candidates: ["fixing i kurs", "kurs fix"]
  repeated_hour: reject
validation:
  min_price: -500
  max_price: 10000
  min_hours: 23
  max_hours: 25
archive:
  dir: "data/prices"
"#;

#[test]
fn fully_consumed_config_is_clean() {
    let loaded = load_layered_yaml_from_strings(&[FULL_YAML]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean(), "unexpected: {:?}", report.unused_leaf_pointers);
    loaded.settings().unwrap();
}

#[test]
fn warn_mode_reports_without_error() {
    let yaml = r#"
market:
  time_zone: "Europe/Warsaw"
  timezone: "typo"
retry:
  attempts: 3
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn).unwrap();
    assert_eq!(
        report.unused_leaf_pointers,
        vec!["/market/timezone".to_string(), "/retry/attempts".to_string()]
    );
}

#[test]
fn fail_mode_errors() {
    let yaml = "source:\n  urls: \"x\"\n";
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let err = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("CONFIG_UNUSED_KEYS"), "got: {msg}");
    assert!(msg.contains("/source/urls"), "got: {msg}");
}
