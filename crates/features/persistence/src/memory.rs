use crate::codec;
use crate::error::PersistenceError;
use crate::store::PersistenceStore;
use evo_domain::snapshot::Snapshot;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct Slot {
    bytes: Mutex<Option<Vec<u8>>>,
    fail_writes: AtomicBool,
    saves: AtomicUsize,
}

/// In-process store holding the encoded snapshot bytes.
///
/// Clones share the same slot, so a test can keep a handle while the engine owns
/// another. Bytes go through the real codec, so corruption handling is exercised too.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Slot>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// See [`codec::encode`].
    pub fn with_snapshot(snapshot: &Snapshot) -> Result<Self, PersistenceError> {
        let store = Self::new();
        store.put_raw(codec::encode(snapshot)?);
        Ok(store)
    }

    /// Makes every following `save` fail until switched off again.
    pub fn fail_writes(&self, fail: bool) {
        self.slot.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Successful saves so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.slot.saves.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn raw(&self) -> Option<Vec<u8>> {
        self.slot.bytes.lock().clone()
    }

    /// Replaces the stored bytes verbatim.
    pub fn put_raw(&self, bytes: Vec<u8>) {
        *self.slot.bytes.lock() = Some(bytes);
    }

    /// The stored snapshot, if present and readable.
    #[must_use]
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.raw().and_then(|bytes| codec::decode(&bytes).ok())
    }
}

impl PersistenceStore for MemoryStore {
    async fn try_load(&self) -> Result<Option<Snapshot>, PersistenceError> {
        self.raw().map(|bytes| codec::decode(&bytes)).transpose()
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        if self.slot.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable {
                message: "writes disabled".into(),
                context: Some("memory store".into()),
            });
        }
        let bytes = codec::encode(snapshot)?;
        self.put_raw(bytes);
        self.slot.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
