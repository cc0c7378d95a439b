use crate::error::SchedulerError;
use crate::state::StopReport;
use evo_domain::events::{EngineNotice, MilestoneEvent};
use evo_domain::view::ProfileView;
use evo_event_bus::EventBus;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

type Reply<T> = oneshot::Sender<T>;

#[derive(Debug)]
pub(crate) enum Command {
    Suspend(Reply<Result<(), SchedulerError>>),
    Resume(Reply<Result<(), SchedulerError>>),
    Save(Reply<Result<(), SchedulerError>>),
    Stop(Reply<StopReport>),
}

/// Host-side view of a spawned engine.
///
/// Read access goes through the profile watch channel; lifecycle commands are queued to
/// the engine task, which stays the only writer. Cloning is cheap. When the last handle
/// is dropped the engine stops and flushes on its own.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    bus: EventBus,
    profile: watch::Receiver<Arc<ProfileView>>,
}

impl EngineHandle {
    pub(crate) const fn new(
        commands: mpsc::Sender<Command>,
        bus: EventBus,
        profile: watch::Receiver<Arc<ProfileView>>,
    ) -> Self {
        Self { commands, bus, profile }
    }

    /// The most recently published view.
    #[must_use]
    pub fn current_profile(&self) -> Arc<ProfileView> {
        self.profile.borrow().clone()
    }

    #[must_use]
    pub fn watch_profile(&self) -> watch::Receiver<Arc<ProfileView>> {
        self.profile.clone()
    }

    /// # Errors
    /// [`SchedulerError::EventBus`] if the host registered `MilestoneEvent` as a watch
    /// channel on the shared bus.
    pub fn subscribe_milestones(&self) -> Result<broadcast::Receiver<Arc<MilestoneEvent>>, SchedulerError> {
        Ok(self.bus.subscribe::<MilestoneEvent>()?)
    }

    /// # Errors
    /// [`SchedulerError::EventBus`] on the same channel-kind conflict for `EngineNotice`.
    pub fn subscribe_notices(&self) -> Result<broadcast::Receiver<Arc<EngineNotice>>, SchedulerError> {
        Ok(self.bus.subscribe::<EngineNotice>()?)
    }

    /// # Errors
    /// [`SchedulerError::InvalidTransition`] unless running, [`SchedulerError::Closed`]
    /// once the engine has stopped.
    pub async fn suspend(&self) -> Result<(), SchedulerError> {
        self.request(Command::Suspend).await?
    }

    /// # Errors
    /// [`SchedulerError::InvalidTransition`] unless suspended, [`SchedulerError::Closed`]
    /// once the engine has stopped.
    pub async fn resume(&self) -> Result<(), SchedulerError> {
        self.request(Command::Resume).await?
    }

    /// Saves immediately instead of waiting for the next cycle.
    ///
    /// # Errors
    /// [`SchedulerError::Persistence`] if the write fails, [`SchedulerError::Closed`] once
    /// the engine has stopped.
    pub async fn save(&self) -> Result<(), SchedulerError> {
        self.request(Command::Save).await?
    }

    /// Stops the engine and waits for the final flush. Idempotent.
    pub async fn stop(&self) -> StopReport {
        self.request(Command::Stop).await.unwrap_or(StopReport::AlreadyStopped)
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T, SchedulerError> {
        let (reply, response) = oneshot::channel();
        self.commands.send(command(reply)).await.map_err(|_| closed())?;
        response.await.map_err(|_| closed())
    }
}

fn closed() -> SchedulerError {
    SchedulerError::Closed { message: "Engine task has exited".into(), context: None }
}
