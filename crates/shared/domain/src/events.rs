use serde::Serialize;

/// Progress worth telling a player about. Produced by comparing two profile views.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MilestoneEvent {
    LevelUp { old: u32, new: u32 },
    /// The domain reached the ceiling and stopped growing.
    DomainCeilingReached { domain: String },
    /// The domain crossed a configured threshold.
    Threshold { domain: String, value: f64 },
}

/// Operational conditions the host should know about. None of them are fatal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineNotice {
    /// The stored snapshot was unreadable; a fresh profile replaced it.
    PersistenceCorrupt,
    /// The wall clock moved backwards by `seconds`; no growth was granted.
    ClockSkewWarning { seconds: f64 },
    /// A save failed; it is retried on the next save cycle.
    PersistenceWriteFailure { message: String },
    Reconciled { elapsed_seconds: f64, applied: bool },
}
