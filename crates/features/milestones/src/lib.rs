//! # Milestones
//!
//! [`MilestoneNotifier::check`] compares the profile before and after a tick or a
//! reconciliation and lists what changed in a way players care about. It is a pure
//! function of its inputs; publishing the events is the scheduler's job.

use evo_domain::config::ThresholdConfig;
use evo_domain::constants::MAX_DOMAIN_VALUE;
use evo_domain::events::MilestoneEvent;
use evo_domain::view::ProfileView;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    pub domain: String,
    pub value: f64,
}

impl From<ThresholdConfig> for Threshold {
    fn from(config: ThresholdConfig) -> Self {
        Self { domain: config.domain, value: config.value }
    }
}

/// Detects milestones against a fixed set of thresholds.
#[derive(Debug, Clone, Default)]
pub struct MilestoneNotifier {
    /// Sorted by domain, then value.
    thresholds: Vec<Threshold>,
}

impl MilestoneNotifier {
    /// Non-finite thresholds can never be crossed and are dropped with a warning.
    #[must_use]
    pub fn new(thresholds: impl IntoIterator<Item = impl Into<Threshold>>) -> Self {
        let mut thresholds: Vec<Threshold> = thresholds
            .into_iter()
            .map(Into::into)
            .filter(|t: &Threshold| {
                let finite = t.value.is_finite();
                if !finite {
                    warn!(domain = %t.domain, value = t.value, "Ignoring non-finite threshold");
                }
                finite
            })
            .collect();
        thresholds.sort_by(|a, b| a.domain.cmp(&b.domain).then(a.value.total_cmp(&b.value)));
        thresholds.dedup();
        Self { thresholds }
    }

    #[must_use]
    pub fn thresholds(&self) -> &[Threshold] {
        &self.thresholds
    }

    /// Events between `before` and `after`, in this order:
    ///
    /// 1. `LevelUp` if the level rose;
    /// 2. `DomainCeilingReached` for each domain (name order) that reached the ceiling;
    /// 3. `Threshold` for each configured threshold with `before < value <= after`.
    ///
    /// A domain missing from `before` counts as 0.
    #[must_use]
    pub fn check(&self, before: &ProfileView, after: &ProfileView) -> Vec<MilestoneEvent> {
        let mut events = Vec::new();

        if after.level > before.level {
            events.push(MilestoneEvent::LevelUp { old: before.level, new: after.level });
        }

        for domain in &after.domains {
            if before.value_of(&domain.name) < MAX_DOMAIN_VALUE && domain.value >= MAX_DOMAIN_VALUE
            {
                events.push(MilestoneEvent::DomainCeilingReached { domain: domain.name.clone() });
            }
        }

        for threshold in &self.thresholds {
            let Some(domain) = after.domain(&threshold.domain) else { continue };
            if before.value_of(&threshold.domain) < threshold.value && threshold.value <= domain.value
            {
                events.push(MilestoneEvent::Threshold {
                    domain: threshold.domain.clone(),
                    value: threshold.value,
                });
            }
        }

        events
    }
}
