use aet_config::TowerConfig;
use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A valid 20-digit filename timestamp.
pub const TS: &str = "20260214120000000000";

pub fn order_file_name(mode: &str, agent: &str, order_type: &str, ts: &str) -> String {
    format!("{mode}_{agent}_{order_type}_{ts}.json")
}

/// A market stock buy whose envelope agrees with `order_file_name(mode, agent, "stockbuy", _)`.
pub fn stock_buy_body(mode: &str, agent: &str, client_order_id: &str) -> Value {
    json!({
        "agent_id": agent,
        "client_order_id": client_order_id,
        "order_type": "stockbuy",
        "mode": mode,
        "payload": {
            "symbol": "AAPL",
            "qty": 10,
            "order_class": "market",
            "time_in_force": "day"
        }
    })
}

/// Write `body` as `dir/name`, staged through a `.tmp` sibling.
pub fn write_order_file(dir: &Path, name: &str, body: &Value) -> Result<PathBuf> {
    let path = dir.join(name);
    let tmp = dir.join(format!("{name}.tmp"));
    fs::write(&tmp, serde_json::to_vec_pretty(body)?)
        .with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, &path).with_context(|| format!("rename into {}", path.display()))?;
    Ok(path)
}

/// A throwaway tower root with every path under one temp dir.
pub struct TestTower {
    dir: TempDir,
    pub cfg: TowerConfig,
}

impl TestTower {
    /// No settle delay, fast polling, one-second dispatch timeout.
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp dir")?;
        let mut cfg = TowerConfig::default();
        cfg.paths.root = dir.path().to_path_buf();
        cfg.watcher.poll_interval_ms = 10;
        cfg.watcher.settle_ms = 0;
        cfg.dispatch.timeout_secs = 1;
        Ok(Self { dir, cfg })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn incoming(&self) -> PathBuf {
        self.cfg.paths.incoming_dir()
    }

    pub fn processing(&self) -> PathBuf {
        self.cfg.paths.processing_dir()
    }

    pub fn completed(&self) -> PathBuf {
        self.cfg.paths.completed_dir()
    }

    pub fn failed(&self) -> PathBuf {
        self.cfg.paths.failed_dir()
    }

    pub fn responses(&self) -> PathBuf {
        self.cfg.paths.responses_dir()
    }

    /// Drop an order into intake, creating the directory if needed.
    pub fn submit(&self, name: &str, body: &Value) -> Result<PathBuf> {
        let incoming = self.incoming();
        fs::create_dir_all(&incoming)?;
        write_order_file(&incoming, name, body)
    }

    /// Parse the outcome written for a filename's fields.
    pub fn read_outcome(&self, agent: &str, mode: &str, order_type: &str, ts: &str) -> Result<Value> {
        let date = ts.get(..8).unwrap_or(ts);
        let path = self
            .responses()
            .join(agent)
            .join(mode)
            .join(date)
            .join(format!("response_{mode}_{agent}_{order_type}_{ts}.json"));
        let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Names of the regular files directly under `dir`, sorted.
    pub fn list(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .map(|rd| {
                rd.filter_map(|e| e.ok())
                    .filter(|e| e.path().is_file())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}
