//! # Domain Models
//!
//! Pure progression types shared by every crate: the persisted [`snapshot::Snapshot`],
//! the read-only [`view::ProfileView`] handed to presentation layers, the events they
//! subscribe to, the fixed growth constants, and the deploy-time config shapes.
//! Only `serde` is allowed here; no I/O, no clocks, no growth logic.

pub mod config;
pub mod constants;
pub mod events;
pub mod snapshot;
pub mod view;
