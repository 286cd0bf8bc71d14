//! Durable set of idempotency keys that have already been dispatched.
//!
//! Backing file: one key per line, append-only, no header. Order and repeated
//! lines carry no meaning; the file is loaded into a set on open.

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

pub const DUPLICATE_REASON: &str = "Order already processed (found in ledger)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerStats {
    pub total_processed: usize,
}

#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    keys: HashSet<String>,
    /// The file's last line has no terminator (hand edit or torn append).
    /// The next append starts with `\n` so the two keys stay separate.
    unterminated: bool,
}

impl Ledger {
    /// Open (or lazily create) the ledger at `path`.
    ///
    /// A missing file is an empty ledger. Blank lines are skipped and every
    /// line is trimmed before insertion. Parent directories are created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create ledger dir {}", parent.display()))?;
        }

        let (keys, unterminated) = match fs::read_to_string(&path) {
            Ok(raw) => {
                let keys: HashSet<String> = raw
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect();
                (keys, !raw.is_empty() && !raw.ends_with('\n'))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => (HashSet::new(), false),
            Err(e) => {
                return Err(e).with_context(|| format!("read ledger {}", path.display()));
            }
        };

        tracing::debug!(path = %path.display(), keys = keys.len(), unterminated, "ledger loaded");
        Ok(Self {
            path,
            keys,
            unterminated,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Some(reason)` when `key` has already been recorded.
    pub fn is_duplicate(&self, key: &str) -> Option<&'static str> {
        self.keys.contains(key).then_some(DUPLICATE_REASON)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Record `key` as processed and fsync the append before returning.
    ///
    /// The in-memory set is updated first, so even when the append fails this
    /// process will refuse to dispatch the key again.
    pub fn record(&mut self, key: &str) -> Result<()> {
        check_key(key)?;
        self.keys.insert(key.to_string());

        let line = if self.unterminated {
            format!("\n{key}\n")
        } else {
            format!("{key}\n")
        };
        match self.append(line.as_bytes()) {
            Ok(()) => {
                self.unterminated = false;
                Ok(())
            }
            Err(e) => {
                // A partial write may have left the tail unterminated.
                self.unterminated = true;
                Err(e)
            }
        }
    }

    /// One write, then fsync.
    fn append(&self, bytes: &[u8]) -> Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open ledger for append {}", self.path.display()))?;
        f.write_all(bytes)
            .with_context(|| format!("append ledger {}", self.path.display()))?;
        f.sync_data()
            .with_context(|| format!("fsync ledger {}", self.path.display()))
    }

    /// Check and record in one step. Returns `false` (and writes nothing)
    /// when the key was already present.
    ///
    /// `&mut self` makes the pair atomic for any caller sharing the ledger
    /// behind a mutex.
    pub fn record_if_absent(&mut self, key: &str) -> Result<bool> {
        if self.keys.contains(key) {
            return Ok(false);
        }
        self.record(key)?;
        Ok(true)
    }

    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            total_processed: self.keys.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// All recorded keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.keys.iter().map(String::as_str).collect();
        out.sort_unstable();
        out
    }

    /// Forget every key and delete the backing file.
    ///
    /// Administrative and test use only: after this, every previously
    /// dispatched order can be dispatched again.
    pub fn clear(&mut self) -> Result<()> {
        self.keys.clear();
        self.unterminated = false;
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("remove ledger {}", self.path.display()));
            }
        }
        tracing::warn!(path = %self.path.display(), "ledger cleared");
        Ok(())
    }
}

/// A key must survive the line-oriented, trimming reload unchanged.
fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        bail!("LEDGER_KEY_INVALID: empty key");
    }
    if key.contains(['\n', '\r']) {
        bail!("LEDGER_KEY_INVALID: key contains a line terminator");
    }
    if key.trim() != key {
        bail!("LEDGER_KEY_INVALID: key has leading or trailing whitespace");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::open(dir.path().join("nested/data/ledger.txt")).unwrap();
        assert!(ledger.is_empty());
        assert!(dir.path().join("nested/data").is_dir());
    }

    #[test]
    fn blank_lines_skipped_and_lines_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.txt");
        fs::write(&path, "a\n\n   \n  b  \r\nc").unwrap();

        let ledger = Ledger::open(&path).unwrap();
        assert_eq!(ledger.keys(), vec!["a", "b", "c"]);
    }

    #[test]
    fn unrepresentable_keys_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = Ledger::open(dir.path().join("l.txt")).unwrap();
        assert!(ledger.record("").is_err());
        assert!(ledger.record("a\nb").is_err());
        assert!(ledger.record(" padded").is_err());
        assert!(ledger.is_empty());
    }

    #[test]
    fn record_if_absent_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("l.txt");
        let mut ledger = Ledger::open(&path).unwrap();
        assert!(ledger.record_if_absent("k").unwrap());
        assert!(!ledger.record_if_absent("k").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "k\n");
    }

    #[test]
    fn clear_removes_file_and_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("l.txt");
        let mut ledger = Ledger::open(&path).unwrap();
        ledger.record("k").unwrap();
        ledger.clear().unwrap();
        assert!(ledger.is_empty());
        assert!(!path.exists());
        // clearing twice is fine
        ledger.clear().unwrap();
    }
}
