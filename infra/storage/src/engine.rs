//! Sandboxed, crash-safe file I/O.
//!
//! [`Storage`] owns a canonical root directory. Every relative path handed to it is
//! resolved inside that root, and every write goes through a unique temporary file that
//! is synced to disk before being renamed over the target, so readers only ever see the
//! previous complete file or the new complete file.

use crate::builder::StorageBuilder;
use crate::error::{StorageError, StorageErrorExt};
use crate::maintenance;
use crate::security;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Marker embedded in temporary file names; anything carrying it is safe to purge.
pub(crate) const TMP_MARKER: &str = ".evotmp.";

/// On-disk encoding applied transparently by [`Storage`].
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum Compression {
    #[default]
    None,
    /// LZ4 block format with the uncompressed size prepended.
    Lz4,
}

impl Compression {
    fn encode(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::None => data.to_vec(),
            Self::Lz4 => lz4_flex::compress_prepend_size(data),
        }
    }

    fn decode(self, data: Vec<u8>) -> Result<Vec<u8>, StorageError> {
        match self {
            Self::None => Ok(data),
            Self::Lz4 => lz4_flex::decompress_size_prepended(&data).context("LZ4 frame rejected"),
        }
    }
}

#[derive(Debug)]
pub struct StorageInner {
    /// Canonical physical root; every resolved path starts with it.
    pub(crate) root: PathBuf,
    pub(crate) compression: Compression,
    /// Minimum age before an orphaned temporary file is purged.
    pub(crate) tmp_grace: Duration,
    pub(crate) tmp_counter: AtomicU64,
}

/// A cheaply clonable handle to a storage root.
///
/// # Example
///
/// ```rust
/// use evo_storage::{Compression, Storage, StorageError};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), StorageError> {
///     # let tmp = tempfile::tempdir().unwrap();
///     let storage = Storage::builder()
///         .root(tmp.path().join("state"))
///         .compression(Compression::Lz4)
///         .connect()
///         .await?;
///
///     storage.write("profile.evosnap", b"snapshot bytes").await?;
///     assert_eq!(storage.read_optional("profile.evosnap").await?.as_deref(), Some(&b"snapshot bytes"[..]));
///     assert_eq!(storage.read_optional("missing.evosnap").await?, None);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Storage {
    pub(crate) inner: Arc<StorageInner>,
}

impl Deref for Storage {
    type Target = StorageInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Storage {
    #[must_use = "The storage engine is not initialized until you call .connect()"]
    pub fn builder() -> StorageBuilder {
        StorageBuilder::new()
    }

    /// The canonical root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Resolves a relative path to its physical location inside the root.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::PathTraversalAttempt`] for absolute paths, paths that climb
    /// above the root, or paths whose existing ancestors are symlinks leading outside it.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
        security::resolve_path(&self.root, path)
    }

    /// Reads and decodes a whole file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FileNotFound`] if the file does not exist, or
    /// [`StorageError::Decompress`] if compressed data is damaged.
    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, StorageError> {
        let resolved = self.resolve(path)?;
        match fs::read(&resolved).await {
            Ok(data) => self.compression.decode(data),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::FileNotFound {
                    message: resolved.display().to_string().into(),
                    context: None,
                })
            },
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(format!("Read failed: {}", resolved.display()).into()),
            }),
        }
    }

    /// Like [`Storage::read`], but a missing file is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Any failure other than absence.
    pub async fn read_optional(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        match self.read(path).await {
            Ok(data) => Ok(Some(data)),
            Err(StorageError::FileNotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Replaces a file atomically.
    ///
    /// The encoded bytes go to `<name>.evotmp.<n>`, are synced, then renamed over the
    /// target; the parent directory is synced afterwards so the rename itself survives a
    /// power loss. A crash at any point leaves either the old or the new file intact.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] when the disk refuses any step. The previous contents
    /// of the target are untouched in that case.
    pub async fn write(&self, path: impl AsRef<Path>, data: &[u8]) -> Result<(), StorageError> {
        let resolved = self.resolve(path)?;

        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)
                .await
                .context(format!("Failed to create parent of {}", resolved.display()))?;
        }

        let temp = tmp_path(&resolved, &self.tmp_counter);
        if let Err(err) = write_synced(&temp, &self.compression.encode(data)).await {
            let _ = fs::remove_file(&temp).await;
            return Err(err);
        }

        if let Err(err) = replace(&temp, &resolved).await {
            let _ = fs::remove_file(&temp).await;
            return Err(err);
        }

        if let Some(parent) = resolved.parent() {
            sync_dir(parent).await;
        }

        debug!(path = %resolved.display(), bytes = data.len(), "File replaced atomically");
        Ok(())
    }

    /// Removes temporary files older than the grace period left behind by interrupted
    /// writes. Runs once on [`StorageBuilder::connect`]; failures are only logged.
    pub async fn purge_tmp(&self) -> usize {
        maintenance::purge_tmp(&self.root, self.tmp_grace).await
    }
}

async fn write_synced(temp: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let mut file = fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(temp)
        .await
        .context(format!("Temp creation failed: {}", temp.display()))?;
    file.write_all(bytes).await.context("Write failed")?;
    file.sync_all().await.context("Hardware sync failed")?;
    Ok(())
}

async fn replace(temp: &Path, target: &Path) -> Result<(), StorageError> {
    match fs::rename(temp, target).await {
        Ok(()) => Ok(()),
        // Platforms without atomic replace refuse to rename over an existing file.
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
            fs::remove_file(target)
                .await
                .context(format!("Failed to replace existing file: {}", target.display()))?;
            fs::rename(temp, target)
                .await
                .context(format!("Atomic swap failed: {} -> {}", temp.display(), target.display()))
        },
        Err(err) => Err(StorageError::Io {
            source: err,
            context: Some(
                format!("Atomic swap failed: {} -> {}", temp.display(), target.display()).into(),
            ),
        }),
    }
}

async fn sync_dir(path: &Path) {
    match fs::File::open(path).await {
        Ok(dir) => {
            if let Err(err) = dir.sync_all().await {
                warn!(path = %path.display(), error = %err, "Directory sync failed");
            }
        },
        Err(err) => warn!(path = %path.display(), error = %err, "Directory open failed"),
    }
}

fn tmp_path(target: &Path, counter: &AtomicU64) -> PathBuf {
    let n = counter.fetch_add(1, Ordering::Relaxed);
    let file_name = target.file_name().and_then(|s| s.to_str()).unwrap_or("storage");
    target.with_file_name(format!("{file_name}{TMP_MARKER}{}.{n}", std::process::id()))
}
