//! Config hash stability.
//!
//! GREEN when:
//! - Loading the same layers twice yields the same hash.
//! - Reordering keys within a layer does not change the hash.
//! - An overlay that changes a value changes the hash.
//! - The typed config reflects the overlay and keeps untouched defaults.

use aet_config::{load_layered_yaml_from_strings, TowerConfig};

const BASE_YAML: &str = r#"
paths:
  root: "/srv/tower"
watcher:
  poll_interval_ms: 250
broker:
  paper:
    keys_env:
      api_key: "ALPACA_PAPER_API_KEY"
      api_secret: "ALPACA_PAPER_SECRET_KEY"
"#;

const BASE_YAML_REORDERED: &str = r#"
broker:
  paper:
    keys_env:
      api_secret: "ALPACA_PAPER_SECRET_KEY"
      api_key: "ALPACA_PAPER_API_KEY"
watcher:
  poll_interval_ms: 250
paths:
  root: "/srv/tower"
"#;

const OVERLAY_YAML: &str = r#"
dispatch:
  timeout_secs: 5
watcher:
  poll_interval_ms: 100
"#;

#[test]
fn same_input_same_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
    assert_eq!(a.config_hash.len(), 64);
}

#[test]
fn key_order_does_not_matter() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
}

#[test]
fn overlay_changes_hash_and_typed_values() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let layered = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_ne!(base.config_hash, layered.config_hash);

    let cfg = TowerConfig::from_json(&layered.config_json).unwrap();
    assert_eq!(cfg.watcher.poll_interval_ms, 100);
    assert_eq!(cfg.watcher.settle_ms, 100);
    assert_eq!(cfg.dispatch.timeout_secs, 5);
    assert_eq!(cfg.paths.root, std::path::PathBuf::from("/srv/tower"));
    assert_eq!(cfg.broker.live.trading_base_url, "https://api.alpaca.markets");
}

#[test]
fn empty_layer_is_ignored() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML, ""]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
}
