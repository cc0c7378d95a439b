//! Growth constants. Fixed at build time so every replay of the same history produces
//! the same profile.

use std::time::Duration;

/// Experience required per level.
pub const LEVEL_EXPERIENCE_UNIT: f64 = 1000.0;

/// Experience granted per unit of aggregate domain growth.
pub const EXPERIENCE_PER_GROWTH: f64 = 0.001;

/// Saturation ceiling of every domain value.
pub const MAX_DOMAIN_VALUE: f64 = 1.0e15;

/// Upper bound of any per-second growth rate.
pub const MAX_RATE: f64 = 0.01;

/// Rate added to every domain for each level gained.
pub const RATE_STEP_PER_LEVEL: f64 = 1.0e-6;

/// Gaps at or below this earn no catch-up growth; the next regular tick covers them.
pub const RECONCILIATION_THRESHOLD: Duration = Duration::from_secs(5);

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

pub const SAVE_INTERVAL: Duration = Duration::from_secs(30);

/// File name of the persisted snapshot inside the data directory.
pub const SNAPSHOT_FILE: &str = "profile.evosnap";

/// `(name, initial value, initial rate per second)` of a freshly created profile.
pub const DEFAULT_DOMAINS: &[(&str, f64, f64)] =
    &[("power", 100.0, 1.0e-4), ("immunity", 50.0, 8.0e-5), ("influence", 10.0, 5.0e-5)];
