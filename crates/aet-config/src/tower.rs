use crate::deep_merge;
use aet_schemas::Mode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerConfig {
    pub paths: PathsConfig,
    pub watcher: WatcherConfig,
    pub dispatch: DispatchConfig,
    pub broker: BrokerConfig,
}

impl Default for TowerConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            watcher: WatcherConfig {
                poll_interval_ms: 500,
                settle_ms: 100,
            },
            dispatch: DispatchConfig { timeout_secs: 30 },
            broker: BrokerConfig {
                paper: BrokerEndpoint::alpaca(Mode::Paper),
                live: BrokerEndpoint::alpaca(Mode::Live),
            },
        }
    }
}

impl TowerConfig {
    /// Lay `overrides` over the defaults. Partial sections keep the
    /// defaults for whatever they leave out, per mode.
    pub fn from_json(overrides: &Value) -> Result<Self> {
        let defaults = serde_json::to_value(TowerConfig::default()).context("serialize defaults")?;
        let merged = deep_merge(defaults, overrides.clone());
        serde_json::from_value(merged).context("CONFIG_INVALID: config does not match schema")
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Relative entries resolve against `root`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    pub root: PathBuf,
    pub incoming: PathBuf,
    pub processing: PathBuf,
    pub completed: PathBuf,
    pub failed: PathBuf,
    pub responses: PathBuf,
    pub ledger: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            incoming: PathBuf::from("orders/incoming"),
            processing: PathBuf::from("orders/processing"),
            completed: PathBuf::from("orders/completed"),
            failed: PathBuf::from("orders/failed"),
            responses: PathBuf::from("responses"),
            ledger: PathBuf::from("data/processed_orders.txt"),
        }
    }
}

impl PathsConfig {
    pub fn resolve(&self, p: &Path) -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }

    pub fn incoming_dir(&self) -> PathBuf {
        self.resolve(&self.incoming)
    }

    pub fn processing_dir(&self) -> PathBuf {
        self.resolve(&self.processing)
    }

    pub fn completed_dir(&self) -> PathBuf {
        self.resolve(&self.completed)
    }

    pub fn failed_dir(&self) -> PathBuf {
        self.resolve(&self.failed)
    }

    pub fn responses_dir(&self) -> PathBuf {
        self.resolve(&self.responses)
    }

    pub fn ledger_file(&self) -> PathBuf {
        self.resolve(&self.ledger)
    }
}

// ---------------------------------------------------------------------------
// Watcher / dispatch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatcherConfig {
    pub poll_interval_ms: u64,
    /// How long a file must sit unchanged before it is picked up.
    pub settle_ms: u64,
}

impl WatcherConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    pub timeout_secs: u64,
}

impl DispatchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

// ---------------------------------------------------------------------------
// Broker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub paper: BrokerEndpoint,
    pub live: BrokerEndpoint,
}

impl BrokerConfig {
    pub fn endpoint(&self, mode: Mode) -> &BrokerEndpoint {
        match mode {
            Mode::Paper => &self.paper,
            Mode::Live => &self.live,
        }
    }
}

/// Where to reach the broker for one mode, and which env vars hold its
/// credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerEndpoint {
    pub trading_base_url: String,
    pub data_base_url: String,
    pub keys_env: KeysEnv,
}

impl BrokerEndpoint {
    fn alpaca(mode: Mode) -> Self {
        let (trading, prefix) = match mode {
            Mode::Paper => ("https://paper-api.alpaca.markets", "ALPACA_PAPER"),
            Mode::Live => ("https://api.alpaca.markets", "ALPACA_LIVE"),
        };
        Self {
            trading_base_url: trading.to_string(),
            data_base_url: "https://data.alpaca.markets".to_string(),
            keys_env: KeysEnv {
                api_key: format!("{prefix}_API_KEY"),
                api_secret: format!("{prefix}_SECRET_KEY"),
            },
        }
    }
}

/// Env var NAMES, never values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysEnv {
    pub api_key: String,
    pub api_secret: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_overrides_yield_defaults() {
        let c = TowerConfig::from_json(&json!({})).unwrap();
        assert_eq!(c, TowerConfig::default());
        assert_eq!(c.broker.live.keys_env.api_key, "ALPACA_LIVE_API_KEY");
        assert_eq!(c.broker.paper.keys_env.api_secret, "ALPACA_PAPER_SECRET_KEY");
    }

    #[test]
    fn partial_live_override_keeps_live_defaults() {
        let c = TowerConfig::from_json(&json!({
            "broker": {"live": {"trading_base_url": "http://127.0.0.1:9999"}}
        }))
        .unwrap();
        assert_eq!(c.broker.live.trading_base_url, "http://127.0.0.1:9999");
        assert_eq!(c.broker.live.keys_env.api_key, "ALPACA_LIVE_API_KEY");
        assert_eq!(c.broker.paper.trading_base_url, "https://paper-api.alpaca.markets");
    }

    #[test]
    fn relative_paths_resolve_against_root() {
        let c = TowerConfig::from_json(&json!({
            "paths": {"root": "/srv/tower", "responses": "/var/responses"}
        }))
        .unwrap();
        assert_eq!(c.paths.incoming_dir(), PathBuf::from("/srv/tower/orders/incoming"));
        assert_eq!(c.paths.ledger_file(), PathBuf::from("/srv/tower/data/processed_orders.txt"));
        assert_eq!(c.paths.responses_dir(), PathBuf::from("/var/responses"));
    }

    #[test]
    fn wrong_types_are_rejected() {
        let err = TowerConfig::from_json(&json!({"watcher": {"poll_interval_ms": "fast"}})).unwrap_err();
        assert!(err.to_string().contains("CONFIG_INVALID"));
    }
}
