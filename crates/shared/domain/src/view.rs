use crate::constants::MAX_DOMAIN_VALUE;
use serde::Serialize;

/// Read-only state of one domain as presented to consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainView {
    pub name: String,
    pub value: f64,
    pub rate: f64,
}

impl DomainView {
    /// Whether the domain sits at the ceiling and can no longer grow.
    #[must_use]
    pub fn saturated(&self) -> bool {
        self.value >= MAX_DOMAIN_VALUE
    }
}

/// Whether everything credited so far has reached the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    #[default]
    Durable,
    /// The last save failed; growth since the last successful save may be lost.
    Degraded,
}

/// An immutable copy of the profile, published after every tick and reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileView {
    /// In domain name order.
    pub domains: Vec<DomainView>,
    pub level: u32,
    pub experience: f64,
    pub birth_time: i64,
    pub total_active_seconds: f64,
    pub last_seen: i64,
    pub durability: Durability,
}

impl ProfileView {
    #[must_use]
    pub fn domain(&self, name: &str) -> Option<&DomainView> {
        self.domains.iter().find(|d| d.name == name)
    }

    /// Value of `name`, or `0.0` when the profile has no such domain.
    #[must_use]
    pub fn value_of(&self, name: &str) -> f64 {
        self.domain(name).map_or(0.0, |d| d.value)
    }

    /// The headline figure: the sum of every domain value.
    #[must_use]
    pub fn total_power(&self) -> f64 {
        self.domains.iter().map(|d| d.value).sum()
    }

    /// Seconds since `birth_time` as of `now_millis`, never negative.
    #[must_use]
    pub fn age_seconds(&self, now_millis: i64) -> f64 {
        (now_millis.saturating_sub(self.birth_time)).max(0) as f64 / 1000.0
    }
}
