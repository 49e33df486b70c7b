//! Locally addressable handles to fetched image assets

use crate::hash::ContentHash;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A reference-counted handle to image bytes materialised on local disk.
///
/// Clones share one backing file. When the last clone is dropped the file
/// is removed, so a texture that has been superseded on every material
/// that used it releases its storage.
#[derive(Clone)]
pub struct AssetHandle {
    inner: Arc<AssetFile>,
}

struct AssetFile {
    path: PathBuf,
    hash: ContentHash,
    width: u32,
    height: u32,
    byte_len: usize,
    source: String,
}

impl Drop for AssetFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "revoked asset handle"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove revoked asset"
            ),
        }
    }
}

impl AssetHandle {
    /// Wrap an already-written file. The handle takes ownership of the file.
    pub fn new(
        path: impl Into<PathBuf>,
        hash: ContentHash,
        dimensions: (u32, u32),
        byte_len: usize,
        source: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(AssetFile {
                path: path.into(),
                hash,
                width: dimensions.0,
                height: dimensions.1,
                byte_len,
                source: source.into(),
            }),
        }
    }

    /// `file://` URI usable as a texture source
    pub fn uri(&self) -> String {
        format!("file://{}", self.inner.path.display())
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn hash(&self) -> ContentHash {
        self.inner.hash
    }

    /// Pixel dimensions (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.inner.width, self.inner.height)
    }

    pub fn byte_len(&self) -> usize {
        self.inner.byte_len
    }

    /// Where the asset came from on the service (e.g. "output/out1.png")
    pub fn source(&self) -> &str {
        &self.inner.source
    }

    /// True if both handles refer to the same materialised asset
    pub fn same_asset(&self, other: &AssetHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of live clones, including this one
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl PartialEq for AssetHandle {
    fn eq(&self, other: &Self) -> bool {
        self.same_asset(other)
    }
}

impl Eq for AssetHandle {}

impl fmt::Debug for AssetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetHandle")
            .field("uri", &self.uri())
            .field("hash", &self.inner.hash)
            .field("dimensions", &self.dimensions())
            .finish()
    }
}
