use crate::codec;
use crate::error::PersistenceError;
use crate::store::PersistenceStore;
use evo_domain::constants::SNAPSHOT_FILE;
use evo_domain::snapshot::Snapshot;
use evo_storage::{Compression, Storage, StorageError};
use std::path::Path;
use tracing::debug;

/// Keeps the snapshot in a single file under a data directory.
///
/// Writes go through [`Storage::write`]: temp file, `fsync`, rename, directory sync.
#[derive(Debug, Clone)]
pub struct FileStore {
    storage: Storage,
}

impl FileStore {
    /// Opens (and creates) `data_dir`, purging temporary files left by a crash.
    ///
    /// # Errors
    /// [`PersistenceError::Storage`] when the directory cannot be created or resolved.
    pub async fn open(
        data_dir: impl AsRef<Path>,
        compression: Compression,
    ) -> Result<Self, PersistenceError> {
        let storage = Storage::builder()
            .root(data_dir.as_ref())
            .compression(compression)
            .connect()
            .await?;
        Ok(Self { storage })
    }

    #[must_use]
    pub const fn from_storage(storage: Storage) -> Self {
        Self { storage }
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

impl PersistenceStore for FileStore {
    async fn try_load(&self) -> Result<Option<Snapshot>, PersistenceError> {
        let bytes = match self.storage.read_optional(SNAPSHOT_FILE).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(None),
            Err(StorageError::Decompress { source, .. }) => {
                return Err(PersistenceError::Corrupt {
                    message: source.to_string().into(),
                    context: Some("LZ4 frame".into()),
                });
            },
            Err(err) => return Err(err.into()),
        };

        let snapshot = codec::decode(&bytes)?;
        debug!(bytes = bytes.len(), last_seen = snapshot.last_seen, "Snapshot loaded");
        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        let bytes = codec::encode(snapshot)?;
        self.storage.write(SNAPSHOT_FILE, &bytes).await?;
        debug!(bytes = bytes.len(), last_seen = snapshot.last_seen, "Snapshot saved");
        Ok(())
    }
}
