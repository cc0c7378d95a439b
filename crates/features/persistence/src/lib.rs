//! # Persistence
//!
//! The [`PersistenceStore`] contract plus two implementations:
//!
//! * [`FileStore`]: one crash-safe file (`profile.evosnap`) in a data directory;
//! * [`MemoryStore`]: shared in-process bytes for tests and embedders.
//!
//! Both encode through [`codec`], whose SHA-256 digest turns any damaged save into a
//! clean [`PersistenceError::Corrupt`] instead of a half-restored profile.

pub mod codec;
mod error;
mod file;
mod memory;
mod store;

pub use crate::error::{PersistenceError, PersistenceErrorExt};
pub use crate::file::FileStore;
pub use crate::memory::MemoryStore;
pub use crate::store::PersistenceStore;
pub use evo_storage::Compression;
