//! Per-session directory of fetched assets

use museum_core::{AssetHandle, ContentHash, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Owns one `session-<uuid>` directory for the life of the process.
///
/// Every insert gets its own file, so two handles never share storage even
/// when the bytes are identical. Dropping the cache removes the directory.
#[derive(Debug)]
pub struct AssetCache {
    dir: PathBuf,
    seq: AtomicU64,
}

impl AssetCache {
    /// Create a fresh session directory under `root`
    pub fn create(root: &Path) -> Result<Self> {
        let dir = root.join(format!("session-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir)?;
        tracing::debug!(dir = %dir.display(), "opened asset cache");
        Ok(Self {
            dir,
            seq: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` and return the handle that owns the file
    pub fn insert(
        &self,
        bytes: &[u8],
        dimensions: (u32, u32),
        extension: &str,
        source: impl Into<String>,
    ) -> Result<AssetHandle> {
        let hash = ContentHash::from_bytes(bytes);
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let path = self
            .dir
            .join(format!("{}-{}.{}", hash.short(), seq, extension));
        std::fs::write(&path, bytes)?;
        Ok(AssetHandle::new(path, hash, dimensions, bytes.len(), source))
    }

    /// Number of files currently held
    pub fn file_count(&self) -> usize {
        std::fs::read_dir(&self.dir)
            .map(|entries| entries.filter_map(|e| e.ok()).count())
            .unwrap_or(0)
    }
}

impl Drop for AssetCache {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => tracing::debug!(dir = %self.dir.display(), "closed asset cache"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                dir = %self.dir.display(),
                error = %e,
                "failed to remove asset cache"
            ),
        }
    }
}
