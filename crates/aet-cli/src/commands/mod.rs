//! Command handler modules for the `aet` binary.
//!
//! Shared helpers live here; command-specific logic lives in the submodules.

pub mod create;
pub mod ledger;
pub mod watch;

use aet_config::{LoadedConfig, TowerConfig};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Layered YAML over the defaults, with an optional `paths.root` override.
pub fn load_config(config_paths: &[String], root: Option<PathBuf>) -> Result<(TowerConfig, LoadedConfig)> {
    let (mut cfg, loaded) = aet_config::load_tower_config(config_paths)?;
    if let Some(root) = root {
        cfg.paths.root = root;
    }
    Ok((cfg, loaded))
}

/// Dry-run validation. Returns false (after printing why) on rejection.
pub fn validate(file: &Path) -> bool {
    match aet_validate::validate_order_file(file) {
        Ok(order) => {
            println!(
                "ok mode={} agent_id={} order_type={} client_order_id={}",
                order.mode(),
                order.agent_id(),
                order.order_type(),
                order.client_order_id
            );
            true
        }
        Err(e) => {
            println!("invalid stage={} error={}", e.stage(), e);
            false
        }
    }
}
