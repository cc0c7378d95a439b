//! # Engine daemon
//!
//! Hosts one engine over the on-disk snapshot and maps process signals onto its
//! lifecycle:
//!
//! | Signal             | Effect                         |
//! |--------------------|--------------------------------|
//! | `SIGUSR1`          | suspend (final tick, save)     |
//! | `SIGUSR2`          | resume (reconcile the pause)   |
//! | `Ctrl+C`/`SIGTERM` | stop (final flush) and exit    |
//!
//! Milestones and notices are written to the log as structured records.
//!
//! ```no_run
//! use evo_daemon::Daemon;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     Daemon::builder().data_dir("/var/lib/evod").build().await?.run().await?;
//!     Ok(())
//! }
//! ```

use anyhow::{Context, Result, anyhow};
use evo::domain::config::{EngineConfig, LoggingConfig};
use evo::domain::events::{EngineNotice, MilestoneEvent};
use evo::events::{EventBus, EventReceiverExt};
use evo::kernel::clock::SystemClock;
use evo::{EngineHandle, StopReport};
use evo_logger::{LevelFilter, Logger};
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

const NAME: &str = "evod";

/// Installs the process logger described by `config`.
///
/// # Errors
/// Fails for an unknown level name or when [`evo_logger`] rejects the setup.
pub fn init_logger(config: &LoggingConfig) -> Result<Logger> {
    let level: LevelFilter = config
        .level
        .parse()
        .map_err(|e| anyhow!("Invalid log level '{}': {e}", config.level))?;

    let builder = Logger::builder().name(NAME).level(level).json(config.json);
    let logger = match &config.directory {
        Some(directory) => builder.directory(directory).init()?,
        None => builder.init()?,
    };
    Ok(logger)
}

#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug, Default)]
pub struct DaemonBuilder {
    cfg: EngineConfig,
}

impl DaemonBuilder {
    pub fn config(mut self, cfg: EngineConfig) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cfg.storage.data_dir = dir.into();
        self
    }

    /// Opens the store, starts the engine (load, reconcile, save) and spawns its loop.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be opened or the startup
    /// reconciliation is rejected.
    pub async fn build(self) -> Result<Daemon> {
        info!(
            data_dir = %self.cfg.storage.data_dir.display(),
            compression = ?self.cfg.storage.compression,
            thresholds = self.cfg.thresholds.len(),
            "Initializing engine"
        );

        // Observers attach before `spawn` so startup milestones are not missed.
        let bus = EventBus::new();
        let milestones = bus.subscribe::<MilestoneEvent>()?;
        let notices = bus.subscribe::<EngineNotice>()?;
        tokio::spawn(log_events("milestone", milestones));
        tokio::spawn(log_events("notice", notices));

        let engine = evo::file_engine(&self.cfg, SystemClock, bus)
            .await
            .context("Failed to open the snapshot store")?;
        let handle = engine.spawn().await.context("Failed to start the engine")?;

        let view = handle.current_profile();
        info!(level = view.level, total_power = view.total_power(), "Engine running");
        Ok(Daemon { handle })
    }
}

/// A running engine owned by the host process.
#[must_use = "call .run().await to keep the engine alive"]
#[derive(Debug)]
pub struct Daemon {
    handle: EngineHandle,
}

impl Daemon {
    pub fn builder() -> DaemonBuilder {
        DaemonBuilder::default()
    }

    #[must_use]
    pub const fn handle(&self) -> &EngineHandle {
        &self.handle
    }

    /// Runs until Ctrl+C or SIGTERM, then stops the engine.
    ///
    /// # Errors
    /// Returns an error if the signal handlers cannot be installed.
    pub async fn run(self) -> Result<StopReport> {
        self.run_until(shutdown_signal()).await
    }

    /// Runs until `shutdown` resolves, then stops the engine with a final flush.
    ///
    /// # Errors
    /// Returns an error if the lifecycle signal handlers cannot be installed, or what
    /// `shutdown` itself returned.
    pub async fn run_until(self, shutdown: impl Future<Output = Result<()>>) -> Result<StopReport> {
        let mut lifecycle = LifecycleSignals::install()?;
        tokio::pin!(shutdown);

        let outcome = loop {
            tokio::select! {
                res = &mut shutdown => break res,
                request = lifecycle.next() => match request {
                    Lifecycle::Suspend => {
                        if let Err(e) = self.handle.suspend().await {
                            warn!(error = %e, "Suspend request refused");
                        }
                    },
                    Lifecycle::Resume => {
                        if let Err(e) = self.handle.resume().await {
                            warn!(error = %e, "Resume request refused");
                        }
                    },
                },
            }
        };

        info!("Shutdown requested, flushing profile");
        let report = self.handle.stop().await;
        match &report {
            StopReport::FlushFailed { message } => error!(%message, "Final save failed"),
            other => info!(report = ?other, "Engine stopped"),
        }
        outcome.map(|()| report)
    }
}

async fn log_events<T>(kind: &'static str, mut events: broadcast::Receiver<Arc<T>>)
where
    T: Serialize + Send + Sync + 'static,
{
    while let Some(event) = events.recv_event().await {
        match serde_json::to_string(&*event) {
            Ok(record) => info!(kind, record = %record, "Engine event"),
            Err(e) => warn!(kind, error = %e, "Unrenderable engine event"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Lifecycle {
    Suspend,
    Resume,
}

#[derive(Debug)]
struct LifecycleSignals {
    #[cfg(unix)]
    suspend: signal::unix::Signal,
    #[cfg(unix)]
    resume: signal::unix::Signal,
}

impl LifecycleSignals {
    #[cfg(unix)]
    fn install() -> Result<Self> {
        use signal::unix::{SignalKind, signal};
        Ok(Self {
            suspend: signal(SignalKind::user_defined1()).context("Failed to install SIGUSR1 handler")?,
            resume: signal(SignalKind::user_defined2()).context("Failed to install SIGUSR2 handler")?,
        })
    }

    #[cfg(not(unix))]
    #[allow(clippy::unnecessary_wraps)]
    fn install() -> Result<Self> {
        Ok(Self {})
    }

    /// Waits for the next lifecycle request; never resolves on platforms without them.
    #[cfg(unix)]
    async fn next(&mut self) -> Lifecycle {
        tokio::select! {
            Some(()) = self.suspend.recv() => Lifecycle::Suspend,
            Some(()) = self.resume.recv() => Lifecycle::Resume,
            else => std::future::pending().await,
        }
    }

    #[cfg(not(unix))]
    async fn next(&mut self) -> Lifecycle {
        std::future::pending().await
    }
}

/// Listens for shutdown signals (Ctrl+C, SIGTERM).
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("Failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        res = ctrl_c => res.context("Ctrl+C signal received"),
        res = terminate => res.context("SIGTERM signal received"),
    }
}
