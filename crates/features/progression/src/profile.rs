use crate::domain::GrowthDomain;
use crate::error::GrowthError;
use crate::growth::{self, level_for, rate_after_level_up};
use evo_domain::constants::{DEFAULT_DOMAINS, EXPERIENCE_PER_GROWTH, MAX_DOMAIN_VALUE, MAX_RATE};
use evo_domain::snapshot::{DomainRecord, Snapshot};
use evo_domain::view::{DomainView, Durability, ProfileView};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelChange {
    pub old: u32,
    pub new: u32,
}

impl LevelChange {
    #[must_use]
    pub const fn gained(&self) -> u32 {
        self.new.saturating_sub(self.old)
    }
}

/// What a single [`ProgressionProfile::tick`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    /// Seconds actually credited; negative input counts as zero.
    pub elapsed_seconds: f64,
    pub experience_gained: f64,
    /// Domains that reached the ceiling during this tick.
    pub saturated: BTreeSet<String>,
    pub level: Option<LevelChange>,
}

/// The aggregate of all domains plus level and experience bookkeeping.
///
/// Owned by exactly one control loop. Every mutation keeps
/// `level == floor(experience / LEVEL_EXPERIENCE_UNIT) + 1`, never lowers a value, a
/// rate or the experience, and never moves `last_seen` backwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressionProfile {
    domains: BTreeMap<String, GrowthDomain>,
    level: u32,
    experience: f64,
    birth_time: i64,
    total_active_seconds: f64,
    last_seen: i64,
}

impl ProgressionProfile {
    /// A first-run profile with the default domains, born and last seen at `now_millis`.
    #[must_use]
    pub fn new(now_millis: i64) -> Self {
        let domains = DEFAULT_DOMAINS
            .iter()
            .filter_map(|(name, value, rate)| GrowthDomain::new(*name, *value, *rate).ok())
            .map(|d| (d.name().to_owned(), d))
            .collect();
        Self::assemble(domains, now_millis)
    }

    /// A fresh profile with caller-chosen domains.
    ///
    /// # Errors
    ///
    /// [`GrowthError::InvalidDomain`] if two domains share a name.
    pub fn with_domains(
        domains: impl IntoIterator<Item = GrowthDomain>,
        now_millis: i64,
    ) -> Result<Self, GrowthError> {
        let mut map = BTreeMap::new();
        for domain in domains {
            let name = domain.name().to_owned();
            if map.insert(name.clone(), domain).is_some() {
                return Err(GrowthError::InvalidDomain {
                    message: format!("duplicate domain '{name}'").into(),
                    context: None,
                });
            }
        }
        Ok(Self::assemble(map, now_millis))
    }

    const fn assemble(domains: BTreeMap<String, GrowthDomain>, now_millis: i64) -> Self {
        Self {
            domains,
            level: 1,
            experience: 0.0,
            birth_time: now_millis,
            total_active_seconds: 0.0,
            last_seen: now_millis,
        }
    }

    /// Domains in name order.
    pub fn domains(&self) -> impl Iterator<Item = &GrowthDomain> {
        self.domains.values()
    }

    #[must_use]
    pub fn domain(&self, name: &str) -> Option<&GrowthDomain> {
        self.domains.get(name)
    }

    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub const fn experience(&self) -> f64 {
        self.experience
    }

    #[must_use]
    pub const fn birth_time(&self) -> i64 {
        self.birth_time
    }

    #[must_use]
    pub const fn total_active_seconds(&self) -> f64 {
        self.total_active_seconds
    }

    #[must_use]
    pub const fn last_seen(&self) -> i64 {
        self.last_seen
    }

    /// Seconds from `last_seen` to `now_millis`; negative when the clock went backwards.
    #[must_use]
    pub fn seconds_since_seen(&self, now_millis: i64) -> f64 {
        now_millis.saturating_sub(self.last_seen) as f64 / 1000.0
    }

    /// Records an observation at `now_millis`. Earlier times are ignored.
    pub fn mark_seen(&mut self, now_millis: i64) {
        self.last_seen = self.last_seen.max(now_millis);
    }

    /// Grows every domain by `delta_seconds` and settles experience and level.
    ///
    /// Consecutive calls compound, so callers must pass real, non-overlapping elapsed
    /// time. `last_seen` is not touched; see [`ProgressionProfile::mark_seen`].
    ///
    /// # Errors
    ///
    /// [`GrowthError::NonFinite`] for NaN or infinite `delta_seconds`. The profile is left
    /// unchanged.
    pub fn tick(&mut self, delta_seconds: f64) -> Result<TickOutcome, GrowthError> {
        if let Err(err) = growth::check_finite("delta_seconds", delta_seconds) {
            warn!(delta_seconds, "Tick rejected");
            return Err(err);
        }
        let elapsed = delta_seconds.max(0.0);

        // Project first so a failure cannot leave a half-applied tick.
        let steps = self
            .domains
            .values()
            .map(|d| d.project(elapsed).map(|step| (d.value(), step)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut outcome = TickOutcome { elapsed_seconds: elapsed, ..TickOutcome::default() };
        let mut growth_sum = 0.0;

        for (domain, (before, step)) in self.domains.values_mut().zip(steps) {
            growth_sum += step.value - before;
            if step.saturated && before < MAX_DOMAIN_VALUE {
                outcome.saturated.insert(domain.name().to_owned());
            }
            domain.set_value(step.value);
        }

        outcome.experience_gained = EXPERIENCE_PER_GROWTH * growth_sum;
        self.experience += outcome.experience_gained;
        self.total_active_seconds += elapsed;

        let new_level = level_for(self.experience).max(self.level);
        if new_level > self.level {
            let change = LevelChange { old: self.level, new: new_level };
            for domain in self.domains.values_mut() {
                domain.set_rate(rate_after_level_up(domain.rate_per_second(), change.gained()));
            }
            self.level = new_level;
            debug!(old = change.old, new = change.new, "Level up");
            outcome.level = Some(change);
        }

        trace!(
            elapsed,
            experience_gained = outcome.experience_gained,
            saturated = outcome.saturated.len(),
            "Tick applied"
        );
        Ok(outcome)
    }

    /// A full copy for the store; later ticks cannot affect it.
    #[must_use]
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            domains: self
                .domains
                .values()
                .map(|d| {
                    (d.name().to_owned(), DomainRecord { value: d.value(), rate: d.rate_per_second() })
                })
                .collect(),
            level: self.level,
            experience: self.experience,
            birth_time: self.birth_time,
            total_active_seconds: self.total_active_seconds,
            last_seen: self.last_seen,
        }
    }

    /// Restores a profile, re-checking everything a damaged or hand-edited save could
    /// break.
    ///
    /// Out-of-range values and rates are clamped and a level that disagrees with the
    /// experience is recomputed, each with a warning.
    ///
    /// # Errors
    ///
    /// [`GrowthError::InvalidSnapshot`] for empty domain names or non-finite or negative
    /// values, rates, experience or active time.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, GrowthError> {
        let invalid = |message: String| GrowthError::InvalidSnapshot {
            message: message.into(),
            context: None,
        };

        if !snapshot.experience.is_finite() || snapshot.experience < 0.0 {
            return Err(invalid(format!("experience = {}", snapshot.experience)));
        }
        if !snapshot.total_active_seconds.is_finite() || snapshot.total_active_seconds < 0.0 {
            return Err(invalid(format!(
                "total_active_seconds = {}",
                snapshot.total_active_seconds
            )));
        }

        let mut domains = BTreeMap::new();
        for (name, record) in snapshot.domains {
            let mut value = record.value;
            if value.is_finite() && value > MAX_DOMAIN_VALUE {
                warn!(domain = %name, value, "Stored value above ceiling; clamping");
                value = MAX_DOMAIN_VALUE;
            }
            let mut rate = record.rate;
            if rate.is_finite() && rate > MAX_RATE {
                warn!(domain = %name, rate, "Stored rate above maximum; clamping");
                rate = MAX_RATE;
            }
            let domain = GrowthDomain::new(name.clone(), value, rate)
                .map_err(|err| invalid(format!("domain '{name}': {err}")))?;
            domains.insert(name, domain);
        }

        let level = level_for(snapshot.experience);
        if level != snapshot.level {
            warn!(stored = snapshot.level, derived = level, "Stored level disagrees with experience");
        }

        Ok(Self {
            domains,
            level,
            experience: snapshot.experience,
            birth_time: snapshot.birth_time,
            total_active_seconds: snapshot.total_active_seconds,
            last_seen: snapshot.last_seen,
        })
    }

    #[must_use]
    pub fn view(&self, durability: Durability) -> ProfileView {
        ProfileView {
            domains: self
                .domains
                .values()
                .map(|d| DomainView {
                    name: d.name().to_owned(),
                    value: d.value(),
                    rate: d.rate_per_second(),
                })
                .collect(),
            level: self.level,
            experience: self.experience,
            birth_time: self.birth_time,
            total_active_seconds: self.total_active_seconds,
            last_seen: self.last_seen,
            durability,
        }
    }
}
