use crate::error::{SchedulerError, SchedulerErrorExt};
use crate::handle::{Command, EngineHandle};
use crate::state::{EngineState, StopReport};
use evo_domain::events::{EngineNotice, MilestoneEvent};
use evo_domain::view::{Durability, ProfileView};
use evo_event_bus::{Event, EventBus};
use evo_kernel::clock::Clock;
use evo_milestones::MilestoneNotifier;
use evo_persistence::{PersistenceError, PersistenceStore};
use evo_progression::{ProgressionProfile, TickOutcome};
use evo_reconciler::{ReconciliationResult, reconcile};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, trace, warn};

const COMMAND_QUEUE: usize = 16;

/// The single owner of the [`ProgressionProfile`].
///
/// Every mutation (reconciliation, ticks) and every save happens through `&mut self`, so
/// no two growth sources can credit overlapping time. Drive it directly for tests and
/// embedding, or hand it to [`TickScheduler::spawn`] for the timer-driven loop.
#[derive(Debug)]
pub struct TickScheduler<S: PersistenceStore> {
    state: EngineState,
    profile: Option<ProgressionProfile>,
    store: S,
    clock: Arc<dyn Clock>,
    bus: EventBus,
    notifier: MilestoneNotifier,
    durability: Durability,
    skewed: bool,
    tick_interval: Duration,
    save_interval: Duration,
}

impl<S: PersistenceStore> TickScheduler<S> {
    pub(crate) fn new(
        store: S,
        clock: Arc<dyn Clock>,
        bus: EventBus,
        notifier: MilestoneNotifier,
        tick_interval: Duration,
        save_interval: Duration,
    ) -> Self {
        Self {
            state: EngineState::Idle,
            profile: None,
            store,
            clock,
            bus,
            notifier,
            durability: Durability::Durable,
            skewed: false,
            tick_interval,
            save_interval,
        }
    }

    #[must_use]
    pub const fn state(&self) -> EngineState {
        self.state
    }

    #[must_use]
    pub const fn durability(&self) -> Durability {
        self.durability
    }

    #[must_use]
    pub const fn bus(&self) -> &EventBus {
        &self.bus
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// `None` until [`TickScheduler::start`] has loaded or created the profile.
    #[must_use]
    pub const fn profile(&self) -> Option<&ProgressionProfile> {
        self.profile.as_ref()
    }

    #[must_use]
    pub fn view(&self) -> Option<ProfileView> {
        self.profile.as_ref().map(|p| p.view(self.durability))
    }

    /// Loads (or creates) the profile, reconciles the offline gap once, saves and enters
    /// `Running`.
    ///
    /// A corrupt or invalid snapshot is replaced by a new profile and reported as
    /// [`EngineNotice::PersistenceCorrupt`]. Any other load failure leaves the store
    /// untouched and the engine idle.
    ///
    /// # Errors
    /// [`SchedulerError::InvalidTransition`] unless idle; [`SchedulerError::Persistence`]
    /// if the store could not be read; [`SchedulerError::Growth`] if the catch-up tick is
    /// rejected.
    pub async fn start(&mut self) -> Result<ReconciliationResult, SchedulerError> {
        self.expect_state(EngineState::Idle, EngineState::Running)?;

        let now = self.clock.now_millis();
        let mut profile = self.restore(now).await?;
        let before = profile.view(self.durability);
        let result = reconcile(&mut profile, now).context("Startup reconciliation")?;
        self.profile = Some(profile);
        self.after_reconcile(&before, &result);

        // Failures are already reported as notices; the engine runs degraded.
        let _ = self.persist().await;

        self.transition(EngineState::Running);
        self.publish_view();
        Ok(result)
    }

    /// Credits the time since `last_seen`. Ignored unless running.
    ///
    /// # Errors
    /// [`SchedulerError::Growth`] if the growth model rejects the step; the profile is
    /// left unchanged.
    pub fn tick(&mut self) -> Result<Option<TickOutcome>, SchedulerError> {
        if self.state != EngineState::Running {
            trace!(state = %self.state, "Tick ignored");
            return Ok(None);
        }

        let now = self.clock.now_millis();
        let durability = self.durability;
        let Some(profile) = self.profile.as_mut() else {
            return Ok(None);
        };

        let gap = profile.seconds_since_seen(now);
        if gap < 0.0 {
            if !self.skewed {
                self.skewed = true;
                warn!(seconds = -gap, "Clock moved backwards; withholding growth");
                self.notice(EngineNotice::ClockSkewWarning { seconds: -gap });
            }
            return Ok(None);
        }
        self.skewed = false;

        let before = profile.view(durability);
        let outcome = profile.tick(gap).context("Regular tick")?;
        profile.mark_seen(now);
        let after = profile.view(durability);

        trace!(elapsed = outcome.elapsed_seconds, experience = outcome.experience_gained, "Tick");
        self.emit_milestones(&before, &after);
        self.publish(after);
        Ok(Some(outcome))
    }

    /// Final tick up to now, synchronous save, then `Suspended`.
    ///
    /// # Errors
    /// [`SchedulerError::InvalidTransition`] unless running.
    pub async fn suspend(&mut self) -> Result<(), SchedulerError> {
        self.expect_state(EngineState::Running, EngineState::Suspended)?;

        if let Err(err) = self.tick() {
            warn!(error = %err, "Final tick before suspension failed");
        }
        self.transition(EngineState::Suspended);
        let _ = self.persist().await;
        self.publish_view();
        Ok(())
    }

    /// Reconciles the suspended interval like offline time, then `Running`.
    ///
    /// # Errors
    /// [`SchedulerError::InvalidTransition`] unless suspended; [`SchedulerError::Growth`]
    /// if the catch-up tick is rejected, in which case the engine stays suspended.
    pub async fn resume(&mut self) -> Result<ReconciliationResult, SchedulerError> {
        self.expect_state(EngineState::Suspended, EngineState::Running)?;

        let now = self.clock.now_millis();
        let durability = self.durability;
        let Some(profile) = self.profile.as_mut() else {
            return Err(SchedulerError::InvalidTransition {
                message: "No profile loaded".into(),
                context: None,
            });
        };

        let before = profile.view(durability);
        let result = reconcile(profile, now).context("Resume reconciliation")?;
        self.after_reconcile(&before, &result);
        self.transition(EngineState::Running);
        self.publish_view();

        // The suspension save may have failed; try again now rather than a cycle later.
        if self.durability == Durability::Degraded {
            let _ = self.persist().await;
        }
        Ok(result)
    }

    /// Writes a copy of the current profile.
    ///
    /// # Errors
    /// [`SchedulerError::Persistence`] when the store rejects the write. The failure is
    /// also published as a notice and the view is flagged degraded.
    pub async fn save(&mut self) -> Result<(), SchedulerError> {
        self.persist().await.context("Requested save")
    }

    /// Stops the engine, flushing exactly once.
    ///
    /// From `Running` a final tick is applied first. Stopping an idle engine leaves the
    /// store untouched since nothing was loaded.
    pub async fn stop(&mut self) -> StopReport {
        match self.state {
            EngineState::Stopped => return StopReport::AlreadyStopped,
            EngineState::Idle => {
                self.transition(EngineState::Stopped);
                return StopReport::NotStarted;
            },
            EngineState::Running => {
                if let Err(err) = self.tick() {
                    warn!(error = %err, "Final tick before stop failed");
                }
            },
            EngineState::Suspended => {},
        }

        self.transition(EngineState::Stopped);
        match self.persist().await {
            Ok(()) => StopReport::Flushed,
            Err(err) => StopReport::FlushFailed { message: err.to_string() },
        }
    }

    /// Starts the engine if idle and moves it onto its own task.
    ///
    /// # Errors
    /// Whatever [`TickScheduler::start`] returns, plus [`SchedulerError::InvalidTransition`]
    /// for a stopped scheduler.
    pub async fn spawn(mut self) -> Result<EngineHandle, SchedulerError> {
        match self.state {
            EngineState::Idle => {
                self.start().await?;
            },
            EngineState::Stopped => {
                return Err(SchedulerError::InvalidTransition {
                    message: "Cannot spawn a stopped engine".into(),
                    context: None,
                });
            },
            EngineState::Running | EngineState::Suspended => {},
        }
        let Some(view) = self.view() else {
            return Err(SchedulerError::InvalidTransition {
                message: "No profile loaded".into(),
                context: None,
            });
        };

        let profile = self.bus.watch(view)?;
        let (commands, receiver) = mpsc::channel(COMMAND_QUEUE);
        let handle = EngineHandle::new(commands, self.bus.clone(), profile);

        tokio::spawn(self.run(receiver));
        Ok(handle)
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let now = Instant::now();
        let mut ticks = interval_at(now + self.tick_interval, self.tick_interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut saves = interval_at(now + self.save_interval, self.save_interval);
        saves.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            tick_ms = self.tick_interval.as_millis() as u64,
            save_ms = self.save_interval.as_millis() as u64,
            "Engine loop started"
        );

        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(command) => {
                        if self.handle(command).await.is_break() {
                            break;
                        }
                    },
                    None => {
                        debug!("All engine handles dropped; stopping");
                        match self.stop().await {
                            StopReport::FlushFailed { message } => {
                                error!(%message, "Final save failed");
                            },
                            report => debug!(?report, "Engine stopped"),
                        }
                        break;
                    },
                },
                _ = ticks.tick() => {
                    if let Err(err) = self.tick() {
                        warn!(error = %err, "Tick failed");
                    }
                },
                _ = saves.tick() => self.on_save_interval().await,
            }
        }

        info!("Engine loop exited");
    }

    async fn handle(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Suspend(reply) => {
                let _ = reply.send(self.suspend().await);
            },
            Command::Resume(reply) => {
                let _ = reply.send(self.resume().await.map(|_| ()));
            },
            Command::Save(reply) => {
                let _ = reply.send(self.save().await);
            },
            Command::Stop(reply) => {
                let _ = reply.send(self.stop().await);
                return ControlFlow::Break(());
            },
        }
        ControlFlow::Continue(())
    }

    async fn on_save_interval(&mut self) {
        let retry = self.state == EngineState::Suspended && self.durability == Durability::Degraded;
        if self.state == EngineState::Running || retry {
            let _ = self.persist().await;
        }
    }

    async fn restore(&self, now: i64) -> Result<ProgressionProfile, SchedulerError> {
        match self.store.try_load().await {
            Ok(Some(snapshot)) => match ProgressionProfile::from_snapshot(snapshot) {
                Ok(profile) => {
                    info!(level = profile.level(), last_seen = profile.last_seen(), "Profile restored");
                    return Ok(profile);
                },
                Err(err) => warn!(error = %err, "Stored snapshot failed validation"),
            },
            Ok(None) => {
                info!("No stored profile; creating a new one");
                return Ok(ProgressionProfile::new(now));
            },
            Err(err @ PersistenceError::Corrupt { .. }) => {
                warn!(error = %err, "Stored snapshot is unreadable");
            },
            Err(err) => {
                error!(error = %err, "Store could not be read; refusing to start");
                return Err(SchedulerError::Persistence {
                    source: err,
                    context: Some("Loading the stored profile".into()),
                });
            },
        }

        self.notice(EngineNotice::PersistenceCorrupt);
        Ok(ProgressionProfile::new(now))
    }

    fn after_reconcile(&mut self, before: &ProfileView, result: &ReconciliationResult) {
        if let Some(skew) = result.skew {
            self.skewed = true;
            self.notice(EngineNotice::ClockSkewWarning { seconds: skew.seconds });
        } else if result.applied {
            self.skewed = false;
        }
        self.notice(EngineNotice::Reconciled {
            elapsed_seconds: result.elapsed_seconds,
            applied: result.applied,
        });

        if let Some(after) = self.view() {
            self.emit_milestones(before, &after);
        }
    }

    async fn persist(&mut self) -> Result<(), PersistenceError> {
        let Some(snapshot) = self.profile.as_ref().map(ProgressionProfile::to_snapshot) else {
            return Ok(());
        };

        match self.store.save(&snapshot).await {
            Ok(()) => {
                debug!(last_seen = snapshot.last_seen, "Profile saved");
                if self.durability == Durability::Degraded {
                    info!("Saves succeed again; durability restored");
                    self.durability = Durability::Durable;
                    self.publish_view();
                }
                Ok(())
            },
            Err(err) => {
                warn!(error = %err, "Save failed; retrying next cycle");
                self.durability = Durability::Degraded;
                self.notice(EngineNotice::PersistenceWriteFailure { message: err.to_string() });
                self.publish_view();
                Err(err)
            },
        }
    }

    fn expect_state(&self, from: EngineState, to: EngineState) -> Result<(), SchedulerError> {
        if self.state == from && from.can_transition(to) {
            return Ok(());
        }
        Err(SchedulerError::InvalidTransition {
            message: format!("{} -> {to}", self.state).into(),
            context: None,
        })
    }

    fn transition(&mut self, to: EngineState) {
        info!(from = %self.state, to = %to, "Engine state changed");
        self.state = to;
    }

    fn emit_milestones(&self, before: &ProfileView, after: &ProfileView) {
        for event in self.notifier.check(before, after) {
            info!(event = ?event, "Milestone");
            self.broadcast::<MilestoneEvent>(event);
        }
    }

    fn notice(&self, notice: EngineNotice) {
        self.broadcast(notice);
    }

    fn broadcast<T: Event>(&self, event: T) {
        if let Err(err) = self.bus.publish(event) {
            warn!(error = %err, "Failed to publish event");
        }
    }

    fn publish_view(&self) {
        if let Some(view) = self.view() {
            self.publish(view);
        }
    }

    fn publish(&self, view: ProfileView) {
        if let Err(err) = self.bus.publish_watch(view) {
            warn!(error = %err, "Failed to publish profile view");
        }
    }
}
