//! Layered settings: built-in defaults, then an optional TOML file, then
//! `SKELETON_JSON__*` environment variables.
//!
//! | Key                        | Env                                     | Default |
//! |----------------------------|-----------------------------------------|---------|
//! | `tracking.mirror`          | `SKELETON_JSON__TRACKING__MIRROR`       | `false` |
//! | `tracking.gate_on_pose`    | `SKELETON_JSON__TRACKING__GATE_ON_POSE` | `true`  |
//! | `tracking.world_space`     | `SKELETON_JSON__TRACKING__WORLD_SPACE`  | `false` |
//! | `session.idle_poll_ms`     | `SKELETON_JSON__SESSION__IDLE_POLL_MS`  | `5`     |
//! | `session.output_capacity`  | `SKELETON_JSON__SESSION__OUTPUT_CAPACITY` | `32768` |

use crate::types::{TrackingConfig, OUTPUT_CAPACITY};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const ENV_PREFIX: &str = "SKELETON_JSON";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("output capacity must be at least {min} bytes, got {got}")]
    CapacityTooSmall { min: usize, got: usize },
}

/// Runtime knobs that are not part of the tracking semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Sleep between polls when the reader has no new frame (milliseconds).
    pub idle_poll_ms: u64,
    /// Output buffer capacity in bytes.
    pub output_capacity: usize,
}

impl SessionOptions {
    pub fn idle_poll_interval(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            idle_poll_ms: 5,
            output_capacity: OUTPUT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub tracking: TrackingConfig,
    pub session: SessionOptions,
}

/// Smallest buffer that still holds a record header and one body.
pub const MIN_OUTPUT_CAPACITY: usize = 4 * 1024;

impl Settings {
    /// Load from defaults, `path` (TOML, required when given) and the
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        Self::load_with_env(path, Environment::with_prefix(ENV_PREFIX).separator("__"))
    }

    /// Same as [`load`](Self::load) with an explicit environment source.
    pub fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self, SettingsError> {
        let defaults = Settings::default();

        let mut builder = Config::builder()
            .set_default("tracking.mirror", defaults.tracking.mirror)?
            .set_default("tracking.gate_on_pose", defaults.tracking.gate_on_pose)?
            .set_default("tracking.world_space", defaults.tracking.world_space)?
            .set_default("session.idle_poll_ms", defaults.session.idle_poll_ms)?
            .set_default("session.output_capacity", defaults.session.output_capacity as u64)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        let settings: Settings = builder
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()?;

        settings.validate()
    }

    /// Parse settings from a TOML string (defaults fill the gaps).
    pub fn from_toml(text: &str) -> Result<Self, SettingsError> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        settings.validate()
    }

    fn validate(self) -> Result<Self, SettingsError> {
        if self.session.output_capacity < MIN_OUTPUT_CAPACITY {
            return Err(SettingsError::CapacityTooSmall {
                min: MIN_OUTPUT_CAPACITY,
                got: self.session.output_capacity,
            });
        }
        Ok(self)
    }
}
