//! Snapshot wire format.
//!
//! ```text
//! [ "EVSN" (4) ][ version u8 (1) ][ SHA-256 of payload (32) ][ postcard payload ]
//! ```
//!
//! postcard writes `f64` as its raw IEEE-754 bytes, so values, experience and
//! timestamps come back bit for bit.

use crate::error::{PersistenceError, PersistenceErrorExt};
use evo_domain::snapshot::Snapshot;
use sha2::{Digest, Sha256};

pub const MAGIC: &[u8; 4] = b"EVSN";
pub const VERSION: u8 = 1;

const DIGEST_LEN: usize = 32;
const HEADER_LEN: usize = MAGIC.len() + 1 + DIGEST_LEN;

/// # Errors
/// [`PersistenceError::Encode`] if postcard refuses the snapshot.
pub fn encode(snapshot: &Snapshot) -> Result<Vec<u8>, PersistenceError> {
    let payload = postcard::to_stdvec(snapshot).context("Snapshot payload")?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(MAGIC);
    bytes.push(VERSION);
    bytes.extend_from_slice(Sha256::digest(&payload).as_slice());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// # Errors
/// [`PersistenceError::Corrupt`] for a short buffer, wrong magic, unknown version,
/// digest mismatch or an undecodable payload.
pub fn decode(bytes: &[u8]) -> Result<Snapshot, PersistenceError> {
    if bytes.len() < HEADER_LEN {
        return Err(corrupt(format!("{} bytes is shorter than the header", bytes.len())));
    }
    let (magic, rest) = bytes.split_at(MAGIC.len());
    if magic != MAGIC {
        return Err(corrupt("bad magic".to_owned()));
    }
    let (version, rest) = rest.split_at(1);
    if version[0] != VERSION {
        return Err(corrupt(format!("unsupported version {}", version[0])));
    }
    let (digest, payload) = rest.split_at(DIGEST_LEN);
    let actual = Sha256::digest(payload);
    if actual.as_slice() != digest {
        return Err(corrupt(format!(
            "digest mismatch: stored {}, computed {}",
            hex::encode(digest),
            hex::encode(actual.as_slice())
        )));
    }

    postcard::from_bytes(payload).map_err(|e| corrupt(format!("payload: {e}")))
}

fn corrupt(message: String) -> PersistenceError {
    PersistenceError::Corrupt { message: std::borrow::Cow::Owned(message), context: None }
}
