use crate::error::GrowthError;
use crate::growth::{self, GrowthStep};
use evo_domain::constants::MAX_DOMAIN_VALUE;

/// One named counter. Construction validates the invariants, so a `GrowthDomain` always
/// holds a finite, non-negative value and rate.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthDomain {
    name: String,
    value: f64,
    rate_per_second: f64,
}

impl GrowthDomain {
    /// # Errors
    ///
    /// [`GrowthError::InvalidDomain`] for an empty name; the [`growth::apply_growth`]
    /// errors for a non-finite or negative value or rate.
    pub fn new(
        name: impl Into<String>,
        value: f64,
        rate_per_second: f64,
    ) -> Result<Self, GrowthError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(GrowthError::InvalidDomain {
                message: "domain name cannot be empty".into(),
                context: None,
            });
        }
        growth::check_non_negative("value", value)?;
        growth::check_non_negative("rate", rate_per_second)?;
        Ok(Self { name, value, rate_per_second })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    #[must_use]
    pub const fn rate_per_second(&self) -> f64 {
        self.rate_per_second
    }

    #[must_use]
    pub fn is_saturated(&self) -> bool {
        self.value >= MAX_DOMAIN_VALUE
    }

    /// Computes growth over `elapsed_seconds` without applying it.
    ///
    /// # Errors
    ///
    /// See [`growth::apply_growth`].
    pub fn project(&self, elapsed_seconds: f64) -> Result<GrowthStep, GrowthError> {
        growth::apply_growth(self.value, self.rate_per_second, elapsed_seconds)
    }

    /// Values only move up.
    pub(crate) fn set_value(&mut self, value: f64) {
        self.value = self.value.max(value);
    }

    /// Rates only move up.
    pub(crate) fn set_rate(&mut self, rate: f64) {
        self.rate_per_second = self.rate_per_second.max(rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructor_validates() {
        assert!(GrowthDomain::new("power", 1.0, 0.001).is_ok());
        assert!(matches!(GrowthDomain::new(" ", 1.0, 0.001), Err(GrowthError::InvalidDomain { .. })));
        assert!(matches!(GrowthDomain::new("power", -1.0, 0.0), Err(GrowthError::Negative { .. })));
        assert!(matches!(
            GrowthDomain::new("power", 1.0, f64::NAN),
            Err(GrowthError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_project_does_not_mutate() {
        let domain = GrowthDomain::new("power", 100.0, 0.01).unwrap();
        let step = domain.project(10.0).unwrap();
        assert!(step.value > 100.0);
        assert_eq!(domain.value(), 100.0);
    }

    #[test]
    fn test_setters_never_decrease() {
        let mut domain = GrowthDomain::new("power", 100.0, 0.01).unwrap();
        domain.set_value(50.0);
        domain.set_rate(0.001);
        assert_eq!(domain.value(), 100.0);
        assert_eq!(domain.rate_per_second(), 0.01);
    }
}
