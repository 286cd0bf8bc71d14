use aet_config::PathsConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// The four file-state directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TowerDirs {
    pub incoming: PathBuf,
    pub processing: PathBuf,
    pub completed: PathBuf,
    pub failed: PathBuf,
}

impl TowerDirs {
    pub fn from_config(paths: &PathsConfig) -> Self {
        Self {
            incoming: paths.incoming_dir(),
            processing: paths.processing_dir(),
            completed: paths.completed_dir(),
            failed: paths.failed_dir(),
        }
    }

    pub fn ensure(&self) -> Result<()> {
        for dir in [&self.incoming, &self.processing, &self.completed, &self.failed] {
            fs::create_dir_all(dir).with_context(|| format!("create dir {}", dir.display()))?;
        }
        Ok(())
    }
}

/// Move `src` into `dest_dir`, keeping its name.
///
/// An existing file at the destination is never overwritten: the moved file
/// gets a `.<uuid>` infix before its extension instead.
pub fn relocate(src: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let name = src
        .file_name()
        .with_context(|| format!("no file name in {}", src.display()))?;

    let mut dest = dest_dir.join(name);
    if dest.exists() {
        let stem = Path::new(name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = Path::new(name)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        dest = dest_dir.join(format!("{stem}.{}{ext}", Uuid::new_v4().as_simple()));
        tracing::warn!(
            src = %src.display(),
            dest = %dest.display(),
            "destination already holds a file with this name; keeping both"
        );
    }

    fs::rename(src, &dest)
        .with_context(|| format!("rename {} -> {}", src.display(), dest.display()))?;
    Ok(dest)
}
