//! Athlete profile and engine configuration.
//!
//! Loaded from TOML; a missing file yields defaults.

use crate::metrics::zones::{HrZones, PowerZones, HR_ZONE_COUNT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Physiological parameters the engine reads but never mutates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AthleteProfile {
    /// Critical Power in watts
    pub critical_power_watts: f64,
    /// Anaerobic work capacity (W' max) in joules
    pub w_prime_joules: f64,
    /// Upper bounds of the five heart rate zones in bpm (ascending)
    pub hr_zone_upper_bounds: [f64; HR_ZONE_COUNT],
}

impl Default for AthleteProfile {
    fn default() -> Self {
        Self {
            critical_power_watts: 280.0,
            w_prime_joules: 20_000.0,
            hr_zone_upper_bounds: [135.0, 150.0, 165.0, 178.0, 200.0],
        }
    }
}

impl AthleteProfile {
    /// Create a profile with default heart rate zones.
    pub fn new(critical_power_watts: f64, w_prime_joules: f64) -> Self {
        Self {
            critical_power_watts,
            w_prime_joules,
            ..Default::default()
        }
    }

    /// Power zones derived from CP.
    pub fn power_zones(&self) -> PowerZones {
        PowerZones::from_critical_power(self.critical_power_watts)
    }

    /// Heart rate zones from the configured bounds.
    pub fn hr_zones(&self) -> HrZones {
        HrZones::from_upper_bounds(self.hr_zone_upper_bounds)
    }

    /// Check CP, W' and the heart rate bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.critical_power_watts.is_finite() && self.critical_power_watts > 0.0) {
            return Err(ConfigError::Invalid(
                "critical power must be a positive number of watts".to_string(),
            ));
        }
        if !(self.w_prime_joules.is_finite() && self.w_prime_joules > 0.0) {
            return Err(ConfigError::Invalid(
                "W' must be a positive number of joules".to_string(),
            ));
        }
        if !self.hr_zones().is_ascending() {
            return Err(ConfigError::Invalid(
                "heart rate zone bounds must be strictly ascending".to_string(),
            ));
        }
        Ok(())
    }
}

/// Course matching settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseSettings {
    /// Live points farther than this from the course are off-course (meters)
    pub max_off_course_m: f64,
    /// Number of course points searched ahead of the last match
    pub search_window: usize,
}

impl Default for CourseSettings {
    fn default() -> Self {
        Self {
            max_off_course_m: 70.0,
            search_window: 500,
        }
    }
}

/// Course elevation enrichment settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevationSettings {
    /// Maximum number of course points looked up remotely
    pub max_samples: usize,
    /// Coordinates per lookup request
    pub chunk_size: usize,
}

impl Default for ElevationSettings {
    fn default() -> Self {
        Self {
            max_samples: 600,
            chunk_size: 100,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Athlete profile
    pub athlete: AthleteProfile,
    /// Course matching settings
    pub course: CourseSettings,
    /// Elevation enrichment settings
    pub elevation: ElevationSettings,
}

impl EngineConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.athlete.validate()?;
        if !(self.course.max_off_course_m.is_finite() && self.course.max_off_course_m > 0.0) {
            return Err(ConfigError::Invalid(
                "off-course threshold must be positive".to_string(),
            ));
        }
        if self.course.search_window == 0 {
            return Err(ConfigError::Invalid(
                "course search window must be at least one point".to_string(),
            ));
        }
        if self.elevation.max_samples < 2 || self.elevation.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "elevation sampling needs at least 2 samples and a non-empty chunk".to_string(),
            ));
        }
        Ok(())
    }
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "ridetrace", "RideTrace")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load configuration from the default location.
pub fn load_config() -> Result<EngineConfig, ConfigError> {
    load_config_from(&get_config_path())
}

/// Load configuration from a file. Returns defaults if it does not exist.
pub fn load_config_from(path: &Path) -> Result<EngineConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(EngineConfig::default());
    }

    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    let config: EngineConfig =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.validate()?;
    Ok(config)
}

/// Save configuration to the default location.
pub fn save_config(config: &EngineConfig) -> Result<(), ConfigError> {
    save_config_to(config, &get_config_path())
}

/// Save configuration to a file.
pub fn save_config_to(config: &EngineConfig, path: &Path) -> Result<(), ConfigError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
