use crate::dirs::{relocate, TowerDirs};
use crate::watcher::is_candidate;
use aet_ledger::Ledger;
use aet_outcome::{OutcomeTarget, ResponseWriter};
use aet_validate::salvage_filename;
use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// What startup found in the processing area.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub inspected: usize,
    /// Already recorded in the ledger; moved on to completed.
    pub completed: Vec<PathBuf>,
    /// Outcome unknown; left where they are for an operator.
    pub flagged: Vec<PathBuf>,
    /// Outcome records written for completed files that had none.
    pub outcomes_written: Vec<PathBuf>,
}

/// Resolve files a crashed run left between dispatch and completion.
///
/// A key in the ledger proves the broker accepted the order, so the file
/// only missed its final move. Anything else may or may not have reached the
/// broker and is never resubmitted automatically.
///
/// A completed file whose success outcome is missing gets a reconciled one
/// (no broker data survives the crash), so its producer is still answered.
pub fn reconcile_processing(
    dirs: &TowerDirs,
    ledger: &Ledger,
    writer: &ResponseWriter,
) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();

    let mut entries: Vec<PathBuf> = fs::read_dir(&dirs.processing)
        .with_context(|| format!("read dir {}", dirs.processing.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_candidate(p))
        .collect();
    entries.sort();

    for path in entries {
        report.inspected += 1;

        let key = match read_client_order_id(&path) {
            Ok(k) => k,
            Err(e) => {
                tracing::error!(
                    file = %path.display(),
                    error = %format!("{e:#}"),
                    "unreadable file in processing area; needs manual review"
                );
                report.flagged.push(path);
                continue;
            }
        };

        if ledger.contains(&key) {
            if let Some(written) = answer_reconciled(&path, &key, writer) {
                report.outcomes_written.push(written);
            }
            let dest = relocate(&path, &dirs.completed)?;
            tracing::warn!(
                client_order_id = %key,
                dest = %dest.display(),
                "in-flight file was already recorded; finishing its move to completed"
            );
            report.completed.push(dest);
        } else {
            tracing::error!(
                client_order_id = %key,
                file = %path.display(),
                "in-flight file not in ledger; it may or may not have reached the broker, left for manual review"
            );
            report.flagged.push(path);
        }
    }

    if report.inspected > 0 {
        tracing::info!(
            inspected = report.inspected,
            completed = report.completed.len(),
            flagged = report.flagged.len(),
            outcomes_written = report.outcomes_written.len(),
            "processing area reconciled"
        );
    }
    Ok(report)
}

/// Write a reconciled success outcome unless a success is already on disk.
fn answer_reconciled(path: &Path, key: &str, writer: &ResponseWriter) -> Option<PathBuf> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let f = salvage_filename(&name);
    let target = OutcomeTarget::new(f.agent_id, f.mode, f.order_type, f.timestamp);

    let existing = writer.response_path(&target);
    if existing_status(&existing).as_deref() == Some("success") {
        return None;
    }

    let data = json!({
        "reconciled": true,
        "detail": "recorded in ledger before a restart; broker response not retained",
    });
    match writer.write_success(&target, key, None, data) {
        Ok(p) => Some(p),
        Err(e) => {
            tracing::warn!(
                client_order_id = %key,
                error = %format!("{e:#}"),
                "reconciled outcome not written"
            );
            None
        }
    }
}

fn existing_status(path: &Path) -> Option<String> {
    let raw = fs::read_to_string(path).ok()?;
    let v: Value = serde_json::from_str(&raw).ok()?;
    v.get("status").and_then(Value::as_str).map(str::to_string)
}

fn read_client_order_id(path: &Path) -> Result<String> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let body: Value = serde_json::from_str(&raw).context("parse json")?;
    body.get("client_order_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .context("no client_order_id")
}
