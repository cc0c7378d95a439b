//! Kernel utilities shared across slices.
//! Keep this crate lightweight: layered config loading and the [`clock::Clock`] seam that
//! makes every time-dependent path testable.
//!
//! ```rust
//! use evo_kernel::clock::{Clock, ManualClock};
//!
//! let clock = ManualClock::new(1_000);
//! clock.advance_secs(2.5);
//! assert_eq!(clock.now_millis(), 3_500);
//! ```

pub mod clock;
pub mod config;

pub use evo_domain as domain;
