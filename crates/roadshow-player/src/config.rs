//! Player configuration.
//!
//! Everything is optional: the player runs a scenario with sensible
//! defaults when no `roadshow.yaml` is present, and any field may be
//! set individually in the file.

use std::path::{Path, PathBuf};

use roadshow_types::ControlOverride;
use serde::Deserialize;

/// Errors raised while loading the player configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Complete player configuration.
///
/// Mirrors the structure of `roadshow.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlayerConfig {
    /// Fixed simulation step in seconds.
    #[serde(default = "default_step_seconds")]
    pub step_seconds: f64,
    /// Simulation time at which the run stops even if the scenario has
    /// not completed, in seconds.
    #[serde(default = "default_max_sim_time")]
    pub max_sim_time: f64,
    /// Where to write the state recording. No recording when absent.
    #[serde(default)]
    pub record_path: Option<PathBuf>,
    /// Load-time override of the ego entity's external-control flag.
    #[serde(default)]
    pub control: ControlOverride,
    /// Default log filter, used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Geometry of the road the entities drive on.
    #[serde(default)]
    pub road: RoadConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            step_seconds: default_step_seconds(),
            max_sim_time: default_max_sim_time(),
            record_path: None,
            control: ControlOverride::default(),
            log_filter: default_log_filter(),
            road: RoadConfig::default(),
        }
    }
}

impl PlayerConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_yml::from_str(&contents)?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }
}

/// Geometry of the single straight road the player wires in.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RoadConfig {
    /// Road id matched against lane positions in the document.
    #[serde(default = "default_road_id")]
    pub id: i32,
    /// Drivable length in meters.
    #[serde(default = "default_road_length")]
    pub length_m: f64,
    /// Width of each lane in meters.
    #[serde(default = "default_lane_width")]
    pub lane_width_m: f64,
}

impl Default for RoadConfig {
    fn default() -> Self {
        Self {
            id: default_road_id(),
            length_m: default_road_length(),
            lane_width_m: default_lane_width(),
        }
    }
}

const fn default_step_seconds() -> f64 {
    0.05
}

const fn default_max_sim_time() -> f64 {
    60.0
}

fn default_log_filter() -> String {
    "info".to_owned()
}

const fn default_road_id() -> i32 {
    1
}

const fn default_road_length() -> f64 {
    10_000.0
}

const fn default_lane_width() -> f64 {
    3.5
}
