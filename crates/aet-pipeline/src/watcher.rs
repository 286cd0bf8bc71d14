use crate::machine::Pipeline;
use crate::stats::RunStats;
use aet_config::WatcherConfig;
use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::watch;

/// `*.json`, not hidden, not a producer's in-progress `.tmp`.
pub fn is_candidate(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    !name.starts_with('.') && !name.ends_with(".tmp") && name.ends_with(".json")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Observation {
    len: u64,
    modified: SystemTime,
}

/// Polling scanner over the intake directory.
///
/// A file is handed out once it has looked the same (size and mtime) for at
/// least `settle`, so a producer that writes in place is not read half-way.
#[derive(Debug)]
pub struct Watcher {
    incoming: PathBuf,
    poll_interval: Duration,
    settle: Duration,
    seen: HashMap<PathBuf, (Observation, Instant)>,
    stuck: HashSet<PathBuf>,
}

impl Watcher {
    pub fn new(incoming: impl Into<PathBuf>, cfg: &WatcherConfig) -> Self {
        Self {
            incoming: incoming.into(),
            poll_interval: cfg.poll_interval(),
            settle: cfg.settle(),
            seen: HashMap::new(),
            stuck: HashSet::new(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Files that are ready now, oldest first.
    pub fn scan(&mut self) -> Result<Vec<PathBuf>> {
        self.collect(self.settle)
    }

    /// Every current candidate, ignoring the settle window.
    pub fn scan_now(&mut self) -> Result<Vec<PathBuf>> {
        self.collect(Duration::ZERO)
    }

    fn collect(&mut self, settle: Duration) -> Result<Vec<PathBuf>> {
        let now = Instant::now();
        let mut present = HashSet::new();
        let mut ready: Vec<(SystemTime, PathBuf)> = Vec::new();

        for entry in fs::read_dir(&self.incoming)
            .with_context(|| format!("read dir {}", self.incoming.display()))?
        {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            if !is_candidate(&path) || self.stuck.contains(&path) {
                continue;
            }
            // Vanished between listing and stat; the next scan will tell.
            let Ok(meta) = entry.metadata() else { continue };
            if !meta.is_file() {
                continue;
            }
            let obs = Observation {
                len: meta.len(),
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            };
            present.insert(path.clone());

            let since = match self.seen.get(&path) {
                Some((prev, since)) if *prev == obs => *since,
                _ => {
                    self.seen.insert(path.clone(), (obs, now));
                    now
                }
            };
            if now.duration_since(since) >= settle {
                ready.push((obs.modified, path));
            }
        }

        self.seen.retain(|p, _| present.contains(p));
        self.stuck.retain(|p| p.exists());

        ready.sort();
        Ok(ready.into_iter().map(|(_, p)| p).collect())
    }

    /// Called after a file was processed. A file still sitting in intake
    /// could not be moved and is not offered again.
    fn done(&mut self, path: &Path) {
        self.seen.remove(path);
        if path.exists() {
            tracing::error!(
                file = %path.display(),
                "file could not be moved out of intake; skipping it until it is removed"
            );
            self.stuck.insert(path.to_path_buf());
        }
    }
}

/// Scan and process until `shutdown` flips to true (or once, when `once`).
///
/// A shutdown request is honoured between files; the file in hand is always
/// driven to a terminal area first.
pub async fn run_watch(
    pipeline: &mut Pipeline,
    watcher: &mut Watcher,
    mut shutdown: watch::Receiver<bool>,
    once: bool,
) -> Result<RunStats> {
    tracing::info!(
        incoming = %watcher.incoming.display(),
        poll_ms = watcher.poll_interval.as_millis() as u64,
        settle_ms = watcher.settle.as_millis() as u64,
        "watching for order files"
    );

    loop {
        if *shutdown.borrow() {
            break;
        }

        let ready = if once { watcher.scan_now() } else { watcher.scan() };
        match ready {
            Ok(files) => {
                for path in files {
                    if *shutdown.borrow() {
                        break;
                    }
                    let disposition = pipeline.process_file(&path).await;
                    tracing::debug!(?disposition, "file settled");
                    watcher.done(&path);
                }
            }
            Err(e) => tracing::warn!(error = %format!("{e:#}"), "intake scan failed"),
        }

        if once {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(watcher.poll_interval) => {}
            changed = shutdown.changed() => {
                // Sender gone: nobody can ask us to stop any more, so stop now.
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    let stats = pipeline.stats();
    tracing::info!(%stats, "watcher stopped");
    Ok(stats)
}
