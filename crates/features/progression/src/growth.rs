//! Pure growth functions. No state, no clock.

use crate::error::GrowthError;
use evo_domain::constants::{LEVEL_EXPERIENCE_UNIT, MAX_DOMAIN_VALUE, MAX_RATE, RATE_STEP_PER_LEVEL};

/// Result of growing one value over an interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthStep {
    pub value: f64,
    /// The value sits at [`MAX_DOMAIN_VALUE`] after this step.
    pub saturated: bool,
}

/// Compounds `value` at `rate` per second for `elapsed_seconds`.
///
/// Computes `value * (1 + rate)^elapsed` as `value * exp(elapsed * ln_1p(rate))`, which
/// stays accurate for the tiny rates the engine uses and makes consecutive intervals
/// multiply exactly in real arithmetic. The result saturates at [`MAX_DOMAIN_VALUE`]; an
/// overflowing factor saturates as well. `elapsed_seconds <= 0` leaves `value` as is.
///
/// # Errors
///
/// [`GrowthError::NonFinite`] for NaN or infinite input, [`GrowthError::Negative`] for a
/// negative value or rate.
///
/// ```rust
/// use evo_progression::growth::apply_growth;
///
/// let step = apply_growth(100.0, 0.01, 1.0).unwrap();
/// assert!((step.value - 101.0).abs() < 1e-9);
/// assert!(!step.saturated);
/// ```
pub fn apply_growth(value: f64, rate: f64, elapsed_seconds: f64) -> Result<GrowthStep, GrowthError> {
    check_finite("elapsed_seconds", elapsed_seconds)?;
    check_non_negative("value", value)?;
    check_non_negative("rate", rate)?;

    if elapsed_seconds <= 0.0 || rate == 0.0 || value == 0.0 {
        return Ok(GrowthStep { value, saturated: value >= MAX_DOMAIN_VALUE });
    }

    let grown = value * (elapsed_seconds * rate.ln_1p()).exp();
    if !grown.is_finite() || grown >= MAX_DOMAIN_VALUE {
        return Ok(GrowthStep { value: MAX_DOMAIN_VALUE.max(value), saturated: true });
    }

    // Rounding must never shrink the value.
    Ok(GrowthStep { value: grown.max(value), saturated: false })
}

/// `floor(experience / LEVEL_EXPERIENCE_UNIT) + 1`, saturating at `u32::MAX`.
#[must_use]
pub fn level_for(experience: f64) -> u32 {
    if !experience.is_finite() || experience <= 0.0 {
        return if experience == f64::INFINITY { u32::MAX } else { 1 };
    }
    let level = (experience / LEVEL_EXPERIENCE_UNIT).floor() + 1.0;
    if level >= f64::from(u32::MAX) { u32::MAX } else { level as u32 }
}

/// The rate of a domain after its profile gained `levels_gained` levels; never lower
/// than `rate` and never above [`MAX_RATE`].
#[must_use]
pub fn rate_after_level_up(rate: f64, levels_gained: u32) -> f64 {
    let raised = f64::from(levels_gained).mul_add(RATE_STEP_PER_LEVEL, rate);
    raised.min(MAX_RATE).max(rate)
}

pub(crate) fn check_finite(name: &'static str, input: f64) -> Result<(), GrowthError> {
    if input.is_finite() {
        Ok(())
    } else {
        Err(GrowthError::NonFinite { message: format!("{name} = {input}").into(), context: None })
    }
}

pub(crate) fn check_non_negative(name: &'static str, input: f64) -> Result<(), GrowthError> {
    check_finite(name, input)?;
    if input < 0.0 {
        return Err(GrowthError::Negative {
            message: format!("{name} = {input}").into(),
            context: None,
        });
    }
    Ok(())
}
