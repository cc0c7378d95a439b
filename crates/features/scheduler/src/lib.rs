//! # Scheduler
//!
//! The control loop of the engine. A [`TickScheduler`] owns the profile and walks it
//! through `Idle -> Running <-> Suspended -> Stopped`:
//!
//! 1. `start`: load (or create) the profile, reconcile the offline gap once, save.
//! 2. `Running`: a tick every `tick_interval` credits the measured time since
//!    `last_seen`; a save every `save_interval`.
//! 3. `suspend`/`resume`: suspended time is reconciled like offline time.
//! 4. `stop`: final tick, exactly one flush.
//!
//! Views, milestones and notices go out through the [`EventBus`](evo_event_bus::EventBus).
//!
//! ```rust
//! use evo_persistence::MemoryStore;
//! use evo_scheduler::{EngineState, SchedulerBuilder, StopReport};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), evo_scheduler::SchedulerError> {
//! let store = MemoryStore::new();
//! let mut scheduler = SchedulerBuilder::new().store(store.clone()).build()?;
//!
//! scheduler.start().await?;
//! assert_eq!(scheduler.state(), EngineState::Running);
//! assert_eq!(scheduler.stop().await, StopReport::Flushed);
//! assert!(store.snapshot().is_some());
//! # Ok(())
//! # }
//! ```

mod builder;
mod error;
mod handle;
mod scheduler;
mod state;

pub use crate::builder::{NoStore, SchedulerBuilder, WithStore};
pub use crate::error::{SchedulerError, SchedulerErrorExt};
pub use crate::handle::EngineHandle;
pub use crate::scheduler::TickScheduler;
pub use crate::state::{EngineState, StopReport};
