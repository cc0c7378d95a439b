use crate::engine::{Compression, Storage, StorageInner};
use crate::error::{StorageError, StorageErrorExt};
use private::Sealed;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Duration;
use tokio::fs;
use tracing::info;

const DEFAULT_TMP_GRACE: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct StorageOptions {
    compression: Compression,
    create: bool,
    tmp_grace: Duration,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self { compression: Compression::None, create: true, tmp_grace: DEFAULT_TMP_GRACE }
    }
}

#[derive(Debug, Default)]
pub struct NoRoot;
#[derive(Debug)]
pub struct WithRoot(PathBuf);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoRoot {}
impl Sealed for WithRoot {}

/// Typestate builder for [`Storage`]; `connect` only exists once a root is set.
#[allow(private_bounds)]
#[derive(Debug, Default)]
pub struct StorageBuilder<S: Sealed = NoRoot> {
    state: S,
    options: StorageOptions,
}

#[allow(private_bounds)]
impl<S: Sealed> StorageBuilder<S> {
    #[must_use = "Sets the on-disk encoding"]
    pub const fn compression(mut self, compression: Compression) -> Self {
        self.options.compression = compression;
        self
    }

    #[must_use = "Sets whether a missing root directory is created"]
    pub const fn create(mut self, enable: bool) -> Self {
        self.options.create = enable;
        self
    }

    /// Orphaned temporary files younger than this survive the startup purge.
    #[must_use = "Sets the temporary file grace period"]
    pub const fn tmp_grace(mut self, grace: Duration) -> Self {
        self.options.tmp_grace = grace;
        self
    }

    fn transition<N: Sealed>(self, state: N) -> StorageBuilder<N> {
        StorageBuilder { state, options: self.options }
    }
}

impl StorageBuilder<NoRoot> {
    #[must_use = "Creates a new storage builder with default options"]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "Sets the root directory"]
    pub fn root(self, path: impl Into<PathBuf>) -> StorageBuilder<WithRoot> {
        self.transition(WithRoot(path.into()))
    }
}

impl StorageBuilder<WithRoot> {
    /// Creates (optionally) and canonicalizes the root, then purges stale temporary files.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the root is missing while `create(false)` is set,
    /// or if it cannot be created or resolved.
    pub async fn connect(self) -> Result<Storage, StorageError> {
        let root = &self.state.0;

        if self.options.create {
            fs::create_dir_all(root)
                .await
                .context(format!("Failed to bootstrap storage root: {}", root.display()))?;
        }

        let canonical = fs::canonicalize(root)
            .await
            .context(format!("Failed to resolve storage root: {}", root.display()))?;
        info!(path = %canonical.display(), compression = ?self.options.compression, "Storage root ready");

        let storage = Storage {
            inner: Arc::new(StorageInner {
                root: canonical,
                compression: self.options.compression,
                tmp_grace: self.options.tmp_grace,
                tmp_counter: AtomicU64::new(1),
            }),
        };

        storage.purge_tmp().await;

        Ok(storage)
    }
}
