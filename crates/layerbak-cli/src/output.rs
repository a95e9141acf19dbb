//! Writing backups and restored plaintext to disk

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

/// Where an existing file at `path` is moved before it is replaced.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".backup");
    PathBuf::from(name)
}

/// Stage `data` in a synced temporary file next to `path`.
fn stage(path: &Path, data: &[u8]) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temporary file in {}", dir.display()))?;
    tmp.write_all(data)
        .with_context(|| format!("writing temporary file for {}", path.display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("syncing temporary file for {}", path.display()))?;
    Ok(tmp)
}

/// Write `data` to `path` so that readers see either the old file or the
/// complete new one.
///
/// An existing file at `path` is renamed to `<path>.backup` before the new
/// one is moved into place. Returns that location when it happened.
pub fn write_atomically(path: &Path, data: &[u8]) -> Result<Option<PathBuf>> {
    let tmp = stage(path, data)?;

    let previous = if path.exists() {
        let saved = backup_path(path);
        std::fs::rename(path, &saved)
            .with_context(|| format!("moving {} to {}", path.display(), saved.display()))?;
        tracing::info!(from = %path.display(), to = %saved.display(), "kept previous file");
        Some(saved)
    } else {
        None
    };

    tmp.persist(path)
        .with_context(|| format!("moving restored data into {}", path.display()))?;
    Ok(previous)
}

/// Write `data` to a file that must not exist yet.
pub fn write_new(path: &Path, data: &[u8]) -> Result<()> {
    if path.exists() {
        anyhow::bail!("refusing to overwrite existing file: {}", path.display());
    }
    let tmp = stage(path, data)?;
    tmp.persist_noclobber(path)
        .with_context(|| format!("creating {}", path.display()))?;
    Ok(())
}
