use crate::error::SchedulerError;
use crate::scheduler::TickScheduler;
use evo_domain::constants::{SAVE_INTERVAL, TICK_INTERVAL};
use evo_event_bus::EventBus;
use evo_kernel::clock::{Clock, SystemClock};
use evo_milestones::{MilestoneNotifier, Threshold};
use evo_persistence::PersistenceStore;
use private::Sealed;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
pub struct NoStore;
#[derive(Debug)]
pub struct WithStore<S>(S);

mod private {
    pub trait Sealed {}
}
impl Sealed for NoStore {}
impl<S: PersistenceStore> Sealed for WithStore<S> {}

/// Typestate builder: `build` needs a store; everything else has a default.
#[derive(Debug)]
pub struct SchedulerBuilder<S: Sealed = NoStore> {
    store: S,
    clock: Arc<dyn Clock>,
    bus: Option<EventBus>,
    thresholds: Vec<Threshold>,
    tick_interval: Duration,
    save_interval: Duration,
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self {
            store: NoStore,
            clock: Arc::new(SystemClock),
            bus: None,
            thresholds: Vec::new(),
            tick_interval: TICK_INTERVAL,
            save_interval: SAVE_INTERVAL,
        }
    }
}

impl SchedulerBuilder<NoStore> {
    #[must_use = "The builder must be configured before it can be used to build the scheduler."]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store<S: PersistenceStore>(self, store: S) -> SchedulerBuilder<WithStore<S>> {
        SchedulerBuilder {
            store: WithStore(store),
            clock: self.clock,
            bus: self.bus,
            thresholds: self.thresholds,
            tick_interval: self.tick_interval,
            save_interval: self.save_interval,
        }
    }
}

impl<S: Sealed> SchedulerBuilder<S> {
    #[must_use = "The builder must be configured before it can be used to build the scheduler."]
    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Publishes on an existing bus, so observers can subscribe before `start` emits the
    /// reconciliation events.
    #[must_use = "The builder must be configured before it can be used to build the scheduler."]
    pub fn bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    #[must_use = "The builder must be configured before it can be used to build the scheduler."]
    pub fn thresholds(mut self, thresholds: impl IntoIterator<Item = impl Into<Threshold>>) -> Self {
        self.thresholds.extend(thresholds.into_iter().map(Into::into));
        self
    }

    #[must_use = "The builder must be configured before it can be used to build the scheduler."]
    pub const fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    #[must_use = "The builder must be configured before it can be used to build the scheduler."]
    pub const fn save_interval(mut self, interval: Duration) -> Self {
        self.save_interval = interval;
        self
    }
}

impl<S: PersistenceStore> SchedulerBuilder<WithStore<S>> {
    /// Creates an idle scheduler.
    ///
    /// # Errors
    /// Returns [`SchedulerError::InvalidConfiguration`] for a zero tick or save interval.
    pub fn build(self) -> Result<TickScheduler<S>, SchedulerError> {
        if self.tick_interval.is_zero() || self.save_interval.is_zero() {
            return Err(SchedulerError::InvalidConfiguration {
                message: "Tick and save intervals must be greater than zero".into(),
                context: None,
            });
        }

        Ok(TickScheduler::new(
            self.store.0,
            self.clock,
            self.bus.unwrap_or_default(),
            MilestoneNotifier::new(self.thresholds),
            self.tick_interval,
            self.save_interval,
        ))
    }
}
