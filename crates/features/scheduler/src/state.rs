use std::fmt;

/// Lifecycle of the engine. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EngineState {
    #[default]
    Idle,
    Running,
    Suspended,
    Stopped,
}

impl EngineState {
    #[must_use]
    pub const fn can_transition(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Idle, Self::Running)
                | (Self::Running, Self::Suspended)
                | (Self::Suspended, Self::Running)
                | (Self::Idle | Self::Running | Self::Suspended, Self::Stopped)
        )
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Suspended => "suspended",
            Self::Stopped => "stopped",
        })
    }
}

/// How a stop request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReport {
    /// The final save went through.
    Flushed,
    /// The final save failed; growth since the last good save is lost.
    FlushFailed { message: String },
    /// Stopped before start; the store was left alone.
    NotStarted,
    AlreadyStopped,
}
