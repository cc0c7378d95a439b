use serde::Deserialize;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Deploy-time settings of the engine host.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfigInner {
    pub storage: StorageConfig,
    pub thresholds: Vec<ThresholdConfig>,
    pub logging: LoggingConfig,
}

/// Arc-wrapped so subsystems can hold a copy for free.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(flatten, default)]
    inner: Arc<EngineConfigInner>,
}

impl Deref for EngineConfig {
    type Target = EngineConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for EngineConfig {
    fn deref_mut(&mut self) -> &mut EngineConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionKind {
    #[default]
    None,
    Lz4,
}

/// Where the snapshot lives.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub compression: CompressionKind,
}

/// A value whose crossing by `domain` emits a threshold milestone.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ThresholdConfig {
    pub domain: String,
    pub value: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level directive (`trace` through `error`).
    pub level: String,
    /// Rolling log files are written here when set.
    pub directory: Option<PathBuf>,
    pub json: bool,
}

// --- Default ---

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: PathBuf::from("data"), compression: CompressionKind::None }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_owned(), directory: None, json: false }
    }
}
