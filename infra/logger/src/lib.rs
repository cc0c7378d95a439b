//! # Logger
//!
//! One place to install the process-wide `tracing` subscriber: a compact console layer,
//! an optional rolling log file written through a non-blocking worker, JSON output, and
//! `RUST_LOG`-style filtering.
//!
//! ```rust
//! # use evo_logger::{Logger, LevelFilter};
//! let _logger = Logger::builder()
//!     .name("evod")
//!     .level(LevelFilter::DEBUG)
//!     .init()
//!     .unwrap();
//! ```
//!
//! The returned [`Logger`] owns the file worker; keep it alive until shutdown or
//! buffered lines are lost.

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use private::Sealed;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const DEFAULT_MAX_FILES: usize = 7;
const LOG_FILE_SUFFIX: &str = "log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug)]
struct LoggerOptions {
    console: bool,
    directory: Option<PathBuf>,
    level: LevelFilter,
    rotation: Rotation,
    max_files: usize,
    json: bool,
    env_filter: Option<String>,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            console: true,
            directory: None,
            level: LevelFilter::INFO,
            rotation: Rotation::DAILY,
            max_files: DEFAULT_MAX_FILES,
            json: false,
            env_filter: None,
        }
    }
}

#[derive(Debug)]
pub struct NoName;
#[derive(Debug)]
pub struct WithName(String);
#[derive(Debug)]
pub struct NoFile;
#[derive(Debug)]
pub struct WithFile;

mod private {
    pub trait Sealed {}
}
impl Sealed for NoName {}
impl Sealed for WithName {}
impl Sealed for NoFile {}
impl Sealed for WithFile {}

/// Typestate builder: `init` needs a name; file-only knobs need a directory.
#[derive(Debug)]
pub struct LoggerBuilder<N: Sealed = NoName, F: Sealed = NoFile> {
    options: LoggerOptions,
    name: N,
    file: PhantomData<F>,
}

impl<F: Sealed> LoggerBuilder<NoName, F> {
    /// Names the process; also the prefix of rolling log files (`evod.2026-01-31.log`).
    pub fn name(self, name: impl Into<String>) -> LoggerBuilder<WithName, F> {
        LoggerBuilder { name: WithName(name.into()), options: self.options, file: PhantomData }
    }
}

impl LoggerBuilder<WithName, WithFile> {
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn max_files(mut self, max: usize) -> Self {
        self.options.max_files = max;
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn rotation(mut self, rotation: Rotation) -> Self {
        self.options.rotation = rotation;
        self
    }
}

impl<F: Sealed> LoggerBuilder<WithName, F> {
    /// Default level for targets not named by the env filter.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn level(mut self, level: LevelFilter) -> Self {
        self.options.level = level;
        self
    }

    /// Programmatic directives such as `evo_scheduler=debug`. An invalid filter makes
    /// [`LoggerBuilder::init`] fail; without one, `RUST_LOG` is honoured.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn env_filter(mut self, filter: impl Into<String>) -> Self {
        self.options.env_filter = Some(filter.into());
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn console(mut self, enabled: bool) -> Self {
        self.options.console = enabled;
        self
    }

    /// Emits newline-delimited JSON instead of the compact text format.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn json(mut self, enabled: bool) -> Self {
        self.options.json = enabled;
        self
    }

    /// Writes a rolling log file into `directory`, creating it if needed.
    pub fn directory(self, directory: impl Into<PathBuf>) -> LoggerBuilder<WithName, WithFile> {
        let mut options = self.options;
        options.directory = Some(directory.into());
        LoggerBuilder { options, name: self.name, file: PhantomData }
    }

    /// Installs the global subscriber.
    ///
    /// # Errors
    /// Returns [`LoggerError::Subscriber`] if a global subscriber is already set,
    /// [`LoggerError::InvalidConfiguration`] for an empty name, zero `max_files`, a bad env
    /// filter or no enabled output, and [`LoggerError::Io`]/[`LoggerError::Appender`] when
    /// the log directory is unusable.
    pub fn init(self) -> Result<Logger, LoggerError> {
        let options = self.options;
        let name = self.name.0;
        validate(&options, &name)?;

        let filter = env_filter(&options)?;
        let mut layers: Vec<BoxedLayer> = Vec::new();

        if options.console {
            layers.push(if options.json {
                layer().json().boxed()
            } else {
                layer().compact().with_ansi(true).boxed()
            });
        }

        let guard = match &options.directory {
            Some(directory) => {
                let (file_layer, guard) = file_layer(&options, &name, directory)?;
                layers.push(file_layer);
                Some(guard)
            },
            None => None,
        };

        if layers.is_empty() {
            return Err(LoggerError::InvalidConfiguration {
                message: "No output enabled; enable the console or set a directory".into(),
                context: None,
            });
        }

        tracing_subscriber::registry().with(layers).with(filter).try_init()?;
        tracing::debug!(name = %name, json = options.json, "Logger initialized");

        Ok(Logger { guard })
    }
}

/// Keeps the non-blocking file worker alive; dropping it flushes pending lines.
#[must_use = "Dropping this handle will stop background logging threads."]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
}

impl Logger {
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder { options: LoggerOptions::default(), name: NoName, file: PhantomData }
    }

    /// Whether a file worker is attached.
    #[must_use]
    pub const fn writes_file(&self) -> bool {
        self.guard.is_some()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::info!("Logging system shutting down, flushing buffers");
        }
    }
}

fn file_layer(
    options: &LoggerOptions,
    name: &str,
    directory: &Path,
) -> Result<(BoxedLayer, WorkerGuard), LoggerError> {
    std::fs::create_dir_all(directory)
        .context(format!("Failed to create log directory: {}", directory.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(options.rotation.clone())
        .filename_prefix(name)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(options.max_files)
        .build(directory)
        .context(format!("Log directory: {}", directory.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(appender);
    let base = layer().with_writer(writer).with_ansi(false);
    let boxed = if options.json { base.json().boxed() } else { base.boxed() };

    Ok((boxed, guard))
}

fn validate(options: &LoggerOptions, name: &str) -> Result<(), LoggerError> {
    if name.trim().is_empty() {
        return Err(LoggerError::InvalidConfiguration {
            message: "Logger name cannot be empty".into(),
            context: None,
        });
    }

    if options.max_files == 0 {
        return Err(LoggerError::InvalidConfiguration {
            message: "max_files must be greater than zero".into(),
            context: None,
        });
    }

    Ok(())
}

fn env_filter(options: &LoggerOptions) -> Result<EnvFilter, LoggerError> {
    let builder = EnvFilter::builder().with_default_directive(options.level.into());
    match &options.env_filter {
        None => Ok(builder.from_env_lossy()),
        Some(filter) => builder.parse(filter).map_err(|e| LoggerError::InvalidConfiguration {
            message: format!("Invalid env filter '{filter}': {e}").into(),
            context: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_builder_defaults() {
        let builder = Logger::builder().name("evod").env_filter("evo_scheduler=debug");
        assert!(builder.options.console);
        assert!(!builder.options.json);
        assert_eq!(builder.options.level, LevelFilter::INFO);
        assert_eq!(builder.options.env_filter.as_deref(), Some("evo_scheduler=debug"));
        assert!(builder.options.directory.is_none());
    }

    #[test]
    fn test_file_options_are_recorded() {
        let builder = Logger::builder()
            .name("evod")
            .json(true)
            .directory("/var/log/evod")
            .rotation(Rotation::HOURLY)
            .max_files(3);
        assert!(builder.options.json);
        assert_eq!(builder.options.max_files, 3);
        assert_eq!(builder.options.directory.as_deref(), Some(Path::new("/var/log/evod")));
    }

    #[test]
    #[serial]
    fn test_empty_name_rejected() {
        let err = Logger::builder().name("  ").init().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    #[serial]
    fn test_zero_max_files_rejected() {
        let err = Logger::builder().name("evod").directory("logs").max_files(0).init().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    #[serial]
    fn test_invalid_env_filter_rejected() {
        let err = Logger::builder().name("evod").env_filter("evo=loud").init().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    #[serial]
    fn test_no_output_rejected() {
        let err = Logger::builder().name("evod").console(false).init().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }
}
