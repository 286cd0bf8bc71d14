//! Outcome records, persisted where producers can find them.
//!
//! Layout: `<root>/<agent_id>/<mode>/<YYYYMMDD>/response_<mode>_<agent_id>_<order_type>_<timestamp>.json`
//! where `YYYYMMDD` is the first 8 characters of the intake timestamp.

use aet_schemas::{ErrorKind, OutcomeRecord};
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Identity of the intake file an outcome answers. Strings, not enums:
/// error outcomes may carry sentinel values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeTarget {
    pub agent_id: String,
    pub mode: String,
    pub order_type: String,
    pub timestamp: String,
}

impl OutcomeTarget {
    pub fn new(
        agent_id: impl Into<String>,
        mode: impl Into<String>,
        order_type: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            mode: mode.into(),
            order_type: order_type.into(),
            timestamp: timestamp.into(),
        }
    }

    /// First 8 characters of the timestamp (the calendar date).
    pub fn date(&self) -> &str {
        self.timestamp.get(..8).unwrap_or(&self.timestamp)
    }

    pub fn file_name(&self) -> String {
        format!(
            "response_{}_{}_{}_{}.json",
            self.mode, self.agent_id, self.order_type, self.timestamp
        )
    }
}

#[derive(Debug, Clone)]
pub struct ResponseWriter {
    root: PathBuf,
}

impl ResponseWriter {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn partition_dir(&self, target: &OutcomeTarget) -> PathBuf {
        self.root
            .join(&target.agent_id)
            .join(&target.mode)
            .join(target.date())
    }

    pub fn response_path(&self, target: &OutcomeTarget) -> PathBuf {
        self.partition_dir(target).join(target.file_name())
    }

    /// Persist `record` for `target`, replacing any previous outcome at the
    /// same path. Returns the final path.
    pub fn write(&self, target: &OutcomeTarget, record: &OutcomeRecord) -> Result<PathBuf> {
        for (label, v) in [
            ("agent_id", target.agent_id.as_str()),
            ("mode", target.mode.as_str()),
            ("order_type", target.order_type.as_str()),
            ("timestamp", target.timestamp.as_str()),
        ] {
            check_component(label, v)?;
        }

        let dir = self.partition_dir(target);
        fs::create_dir_all(&dir)
            .with_context(|| format!("create response dir failed: {}", dir.display()))?;

        let final_path = dir.join(target.file_name());
        let body = serde_json::to_string_pretty(record).context("serialize outcome record")?;
        write_atomic(&final_path, body.as_bytes())?;

        tracing::debug!(path = %final_path.display(), status = ?record.status, "outcome written");
        Ok(final_path)
    }

    pub fn write_success(
        &self,
        target: &OutcomeTarget,
        client_order_id: &str,
        request_order_id: Option<String>,
        data: Value,
    ) -> Result<PathBuf> {
        let record = OutcomeRecord::success(&target.agent_id, client_order_id, request_order_id, data);
        self.write(target, &record)
    }

    pub fn write_error(
        &self,
        target: &OutcomeTarget,
        client_order_id: &str,
        request_order_id: Option<String>,
        kind: ErrorKind,
        message: &str,
        details: Option<Value>,
    ) -> Result<PathBuf> {
        let record = OutcomeRecord::error(
            &target.agent_id,
            client_order_id,
            request_order_id,
            kind,
            message,
            details,
        );
        self.write(target, &record)
    }
}

/// Path components must stay inside the partition they name.
fn check_component(label: &str, v: &str) -> Result<()> {
    if v.is_empty() || v == "." || v == ".." || v.contains(['/', '\\', '\0']) {
        bail!("OUTCOME_PATH_INVALID: {label}={v:?} is not a safe path component");
    }
    Ok(())
}

/// Write to a hidden sibling, fsync, then rename over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = dir.join(format!(".outcome-{}.tmp", Uuid::new_v4().as_simple()));

    let result = (|| -> Result<()> {
        let mut f = File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
        f.write_all(bytes)
            .with_context(|| format!("write {}", tmp.display()))?;
        f.write_all(b"\n")
            .with_context(|| format!("write {}", tmp.display()))?;
        f.sync_all()
            .with_context(|| format!("fsync {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_uses_first_eight_timestamp_chars() {
        let w = ResponseWriter::new("/srv/responses");
        let t = OutcomeTarget::new("testbot", "paper", "stockbuy", "20260214120000000000");
        assert_eq!(
            w.response_path(&t),
            PathBuf::from(
                "/srv/responses/testbot/paper/20260214/response_paper_testbot_stockbuy_20260214120000000000.json"
            )
        );
    }

    #[test]
    fn short_timestamp_uses_whole_value_as_date() {
        let t = OutcomeTarget::new("a", "paper", "x", "2026");
        assert_eq!(t.date(), "2026");
    }

    #[test]
    fn unsafe_components_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let w = ResponseWriter::new(dir.path());
        let t = OutcomeTarget::new("..", "paper", "stockbuy", "20260214120000000000");
        let err = w
            .write_error(&t, "k", None, ErrorKind::ValidationError, "bad", None)
            .unwrap_err();
        assert!(err.to_string().contains("OUTCOME_PATH_INVALID"));
    }
}
