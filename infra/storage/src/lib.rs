//! Sandboxed file storage for engine state.
//!
//! - **Sandbox**: relative paths only; traversal and symlink escapes are rejected.
//! - **Atomic replace**: unique temp file + `fsync` + `rename` + directory sync, so a
//!   crash mid-write never leaves a torn file behind.
//! - **Compression**: optional LZ4, invisible to callers.
//! - **Self-healing**: temporary files orphaned by a crash are purged on connect.
//!
//! ```rust
//! use evo_storage::{Storage, StorageError};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), StorageError> {
//! # let tmp = tempfile::tempdir().unwrap();
//! let storage = Storage::builder().root(tmp.path()).connect().await?;
//! storage.write("profile.evosnap", b"v1").await?;
//! storage.write("profile.evosnap", b"v2").await?;
//! assert_eq!(storage.read("profile.evosnap").await?, b"v2");
//! # Ok(())
//! # }
//! ```

mod builder;
mod engine;
mod error;
mod maintenance;
mod security;

pub use builder::StorageBuilder;
pub use engine::{Compression, Storage};
pub use error::{StorageError, StorageErrorExt};
