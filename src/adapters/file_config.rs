//! File-backed configuration adapter.
//!
//! Layers, later ones winning:
//!
//! 1. the config file (YAML, JSON or TOML, picked by extension)
//! 2. `ENVMON_*` environment variables, nested keys joined with `__`
//!    (`ENVMON_SENSOR__SCHEDULER__INTERVAL_MINUTES=5`)
//!
//! The merged document is deserialized into [`RawConfig`] and validated by
//! [`MonitorConfig::from_raw`].

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use log::info;

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::{MonitorConfig, RawConfig};

pub const ENV_PREFIX: &str = "ENVMON";

pub struct FileConfig {
    path: PathBuf,
}

impl FileConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Merge the layers without validating.
    pub fn load_raw(&self) -> Result<RawConfig, ConfigError> {
        Config::builder()
            .add_source(File::from(self.path.as_path()))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize::<RawConfig>())
            .map_err(|e| ConfigError::Unreadable(format!("{}: {}", self.path.display(), e)))
    }
}

impl ConfigPort for FileConfig {
    fn load(&self) -> Result<MonitorConfig, ConfigError> {
        let raw = self.load_raw()?;
        let config = MonitorConfig::from_raw(&raw)?;
        info!(
            "Config loaded from {}: {} sensor model(s), poll every {} min",
            self.path.display(),
            config.sensors.len(),
            config.interval_minutes
        );
        Ok(config)
    }
}
