//! # Progression
//!
//! The deterministic heart of the engine.
//!
//! * [`growth`]: pure compounding with saturation at the ceiling.
//! * [`GrowthDomain`]: one validated counter.
//! * [`ProgressionProfile`]: every domain plus experience, level and timestamps;
//!   converts to and from the persisted [`Snapshot`](evo_domain::snapshot::Snapshot).
//!
//! ```rust
//! use evo_progression::ProgressionProfile;
//!
//! let mut profile = ProgressionProfile::new(0);
//! let outcome = profile.tick(60.0).unwrap();
//! assert!(outcome.experience_gained > 0.0);
//! assert_eq!(profile.level(), 1);
//! ```

mod domain;
mod error;
pub mod growth;
mod profile;

pub use crate::domain::GrowthDomain;
pub use crate::error::{GrowthError, GrowthErrorExt};
pub use crate::profile::{LevelChange, ProgressionProfile, TickOutcome};
