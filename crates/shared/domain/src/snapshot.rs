use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persisted state of one domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub value: f64,
    pub rate: f64,
}

/// The sole unit of persistence: a full copy of the profile plus `last_seen`.
///
/// Timestamps are Unix epoch milliseconds. Domains are kept in name order so the
/// encoded form is stable for identical profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub domains: BTreeMap<String, DomainRecord>,
    pub level: u32,
    pub experience: f64,
    pub birth_time: i64,
    pub total_active_seconds: f64,
    pub last_seen: i64,
}
