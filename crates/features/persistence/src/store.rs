use crate::error::PersistenceError;
use evo_domain::snapshot::Snapshot;
use std::fmt::Debug;
use std::future::Future;
use tracing::warn;

/// Durable home of the profile snapshot.
///
/// `save` must be atomic from the caller's view: a later `load` returns either the
/// previous snapshot or the new one, never a mix. Implementations are handed a copy of
/// the profile, so continued ticking cannot race a write in progress.
pub trait PersistenceStore: Send + Sync + Debug + 'static {
    /// `Ok(None)` when nothing was ever saved; [`PersistenceError::Corrupt`] when stored
    /// bytes are unreadable.
    fn try_load(&self) -> impl Future<Output = Result<Option<Snapshot>, PersistenceError>> + Send;

    fn save(&self, snapshot: &Snapshot) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// Fail-soft load: missing and unreadable data both come back as `None`.
    fn load(&self) -> impl Future<Output = Option<Snapshot>> + Send {
        async {
            match self.try_load().await {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    warn!(error = %err, "Snapshot could not be loaded");
                    None
                },
            }
        }
    }
}
