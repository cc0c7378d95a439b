//! # Offline reconciliation
//!
//! Credits the wall-clock gap between the profile's `last_seen` and `now` in a single
//! tick. Used once per process start and once per resume from suspension, never while
//! the scheduler is running regular ticks.

use evo_domain::constants::RECONCILIATION_THRESHOLD;
use evo_progression::{GrowthError, ProgressionProfile, TickOutcome};
use tracing::{info, warn};

/// The wall clock read earlier than the profile's `last_seen`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockSkew {
    /// How far the clock went backwards.
    pub seconds: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationResult {
    /// The measured gap, clamped at zero.
    pub elapsed_seconds: f64,
    /// Whether catch-up growth was applied and `last_seen` moved to `now`.
    pub applied: bool,
    pub skew: Option<ClockSkew>,
    pub outcome: Option<TickOutcome>,
}

/// Applies catch-up growth for `now_millis - last_seen`.
///
/// * negative gap: nothing is granted, `skew` is set, `last_seen` stays put;
/// * gap up to [`RECONCILIATION_THRESHOLD`]: nothing is granted and `last_seen` stays
///   put, so the next regular tick credits the gap instead;
/// * otherwise: exactly one `tick(gap)`, then `last_seen = now_millis`.
///
/// # Errors
///
/// Propagates [`GrowthError`] from the tick; the profile is unchanged in that case.
///
/// ```rust
/// use evo_progression::ProgressionProfile;
/// use evo_reconciler::reconcile;
///
/// let mut profile = ProgressionProfile::new(0);
/// let result = reconcile(&mut profile, 3_600_000).unwrap();
/// assert!(result.applied);
/// assert_eq!(profile.last_seen(), 3_600_000);
/// ```
pub fn reconcile(
    profile: &mut ProgressionProfile,
    now_millis: i64,
) -> Result<ReconciliationResult, GrowthError> {
    let gap = profile.seconds_since_seen(now_millis);

    if gap < 0.0 {
        warn!(skew_seconds = -gap, last_seen = profile.last_seen(), now_millis, "Clock went backwards");
        return Ok(ReconciliationResult {
            elapsed_seconds: 0.0,
            applied: false,
            skew: Some(ClockSkew { seconds: -gap }),
            outcome: None,
        });
    }

    if gap <= RECONCILIATION_THRESHOLD.as_secs_f64() {
        return Ok(ReconciliationResult {
            elapsed_seconds: gap,
            applied: false,
            skew: None,
            outcome: None,
        });
    }

    let outcome = profile.tick(gap)?;
    profile.mark_seen(now_millis);
    info!(
        elapsed_seconds = gap,
        experience_gained = outcome.experience_gained,
        level = profile.level(),
        "Offline growth reconciled"
    );

    Ok(ReconciliationResult { elapsed_seconds: gap, applied: true, skew: None, outcome: Some(outcome) })
}
