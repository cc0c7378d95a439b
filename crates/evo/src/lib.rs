//! Facade crate for the progression engine.
//! Re-exports the domain, kernel and feature slices and assembles the file-backed engine
//! a host process runs. Keep this crate thin: it composes other crates, it does not
//! implement engine logic.
//!
//! ## Usage
//! - Load an [`EngineConfig`] with [`kernel::config::load_config`].
//! - Call [`file_engine`] and [`TickScheduler::spawn`] the result.

pub use evo_domain as domain;
pub use evo_event_bus as events;
pub use evo_kernel as kernel;

use evo_domain::config::{CompressionKind, EngineConfig};
use evo_event_bus::EventBus;
use evo_kernel::clock::Clock;
use evo_persistence::{Compression, FileStore};
pub use evo_scheduler::{EngineHandle, EngineState, SchedulerError, StopReport, TickScheduler};

/// The engine slices, one per component.
pub mod features {
    pub use evo_milestones as milestones;
    pub use evo_persistence as persistence;
    pub use evo_progression as progression;
    pub use evo_reconciler as reconciler;
    pub use evo_scheduler as scheduler;
}

#[must_use]
pub const fn compression(kind: CompressionKind) -> Compression {
    match kind {
        CompressionKind::None => Compression::None,
        CompressionKind::Lz4 => Compression::Lz4,
    }
}

/// Opens the snapshot directory from `config` and builds an idle engine over it,
/// publishing on `bus` with the configured thresholds.
///
/// # Errors
/// [`SchedulerError::Persistence`] when the data directory cannot be opened.
pub async fn file_engine(
    config: &EngineConfig,
    clock: impl Clock,
    bus: EventBus,
) -> Result<TickScheduler<FileStore>, SchedulerError> {
    let store = FileStore::open(&config.storage.data_dir, compression(config.storage.compression)).await?;

    evo_scheduler::SchedulerBuilder::new()
        .store(store)
        .clock(clock)
        .bus(bus)
        .thresholds(config.thresholds.iter().cloned().map(evo_milestones::Threshold::from))
        .build()
}
