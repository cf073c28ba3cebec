/// Station configuration loader - parses stations.toml
///
/// Separates station metadata and service settings from code, making it
/// easy to update thresholds, add stations, or change the reference
/// timezone without recompiling the service.

use chrono::FixedOffset;
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::Coordinates;

/// Environment variable that overrides the default config path.
pub const CONFIG_PATH_ENV: &str = "MEKONG_STATIONS_CONFIG";

/// Default config path, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "stations.toml";

// ---------------------------------------------------------------------------
// Configuration types
// ---------------------------------------------------------------------------

/// Station metadata loaded from stations.toml configuration file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StationConfig {
    pub station_id: String,
    /// Local (Vietnamese) display name.
    pub name: String,
    /// English display name.
    pub name_en: String,

    // Geographic location
    pub latitude: f64,
    pub longitude: f64,

    // Alert thresholds in meters; flood must not be below warning
    pub warning_threshold: f64,
    pub flood_threshold: f64,
}

impl StationConfig {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.latitude,
            lon: self.longitude,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.flood_threshold < self.warning_threshold {
            return Err(ConfigError::InvalidThresholds {
                station_id: self.station_id.clone(),
                warning: self.warning_threshold,
                flood: self.flood_threshold,
            });
        }
        Ok(())
    }
}

/// Service-wide settings from the `[service]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceSettings {
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    #[serde(default = "default_update_interval_seconds")]
    pub update_interval_seconds: u64,
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,
    #[serde(default = "default_data_source")]
    pub data_source: String,
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
}

fn default_utc_offset_hours() -> i32 {
    7
}

fn default_update_interval_seconds() -> u64 {
    3600
}

fn default_recent_window() -> usize {
    48
}

fn default_data_source() -> String {
    "Mekong River Commission (MRC)".to_string()
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("data/latest_water_levels.json")
}

fn default_history_path() -> PathBuf {
    PathBuf::from("data/historical_data.csv")
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            utc_offset_hours: default_utc_offset_hours(),
            update_interval_seconds: default_update_interval_seconds(),
            recent_window: default_recent_window(),
            data_source: default_data_source(),
            snapshot_path: default_snapshot_path(),
            history_path: default_history_path(),
        }
    }
}

impl ServiceSettings {
    /// The reference timezone all timestamps are converted into.
    pub fn timezone(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .ok_or(ConfigError::InvalidUtcOffset(self.utc_offset_hours))
    }
}

/// Fully loaded configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub service: ServiceSettings,
    pub stations: Vec<StationConfig>,
}

/// Root configuration structure for TOML parsing
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    service: ServiceSettings,
    station: Vec<StationConfig>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("station '{station_id}': flood threshold {flood} is below warning threshold {warning}")]
    InvalidThresholds {
        station_id: String,
        warning: f64,
        flood: f64,
    },
    #[error("utc_offset_hours {0} is out of range")]
    InvalidUtcOffset(i32),
    #[error("duplicate station id '{0}'")]
    DuplicateStation(String),
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Parses and validates configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<ServiceConfig, ConfigError> {
    let file: ConfigFile = toml::from_str(contents)?;

    file.service.timezone()?;

    let mut seen = HashSet::new();
    for station in &file.station {
        station.validate()?;
        if !seen.insert(station.station_id.as_str()) {
            return Err(ConfigError::DuplicateStation(station.station_id.clone()));
        }
    }

    Ok(ServiceConfig {
        service: file.service,
        stations: file.station,
    })
}

/// Loads configuration from an explicit path.
pub fn load_config_from(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&contents)
}

/// Resolves the config path: `MEKONG_STATIONS_CONFIG` if set, otherwise
/// `stations.toml` in the working directory (the project root when
/// running via `cargo run`).
pub fn config_path() -> PathBuf {
    env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Loads configuration from the resolved default path.
pub fn load_config() -> Result<ServiceConfig, ConfigError> {
    load_config_from(&config_path())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [[station]]
        station_id = "tan_chau"
        name = "Tân Châu"
        name_en = "Tan Chau"
        latitude = 10.8
        longitude = 105.25
        warning_threshold = 4.0
        flood_threshold = 4.5
    "#;

    #[test]
    fn test_load_repository_config_succeeds() {
        let config = load_config_from(Path::new(DEFAULT_CONFIG_PATH))
            .expect("stations.toml should load");
        assert_eq!(config.stations.len(), 5, "Should have the five delta stations");
        assert_eq!(config.service.utc_offset_hours, 7);
        assert_eq!(config.service.recent_window, 48);
    }

    #[test]
    fn test_all_stations_have_required_fields() {
        let config = load_config_from(Path::new(DEFAULT_CONFIG_PATH)).unwrap();
        for station in config.stations {
            assert!(!station.station_id.is_empty(), "Station id must not be empty");
            assert!(!station.name.is_empty(), "Name must not be empty");
            assert!(station.latitude >= -90.0 && station.latitude <= 90.0);
            assert!(station.longitude >= -180.0 && station.longitude <= 180.0);
            assert!(station.flood_threshold >= station.warning_threshold);
        }
    }

    #[test]
    fn test_service_table_is_optional() {
        let config = parse_config(MINIMAL).expect("minimal config should parse");
        assert_eq!(config.service, ServiceSettings::default());
        let tz = config.service.timezone().unwrap();
        assert_eq!(tz.local_minus_utc(), 7 * 3600);
    }

    #[test]
    fn test_rejects_flood_below_warning() {
        let bad = MINIMAL.replace("flood_threshold = 4.5", "flood_threshold = 3.5");
        let err = parse_config(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThresholds { .. }));
        assert!(err.to_string().contains("tan_chau"));
    }

    #[test]
    fn test_rejects_duplicate_station_ids() {
        let doubled = format!("{}\n{}", MINIMAL, MINIMAL);
        let err = parse_config(&doubled).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateStation(ref id) if id == "tan_chau"));
    }

    #[test]
    fn test_rejects_out_of_range_offset() {
        let bad = format!("[service]\nutc_offset_hours = 30\n{}", MINIMAL);
        assert!(matches!(parse_config(&bad), Err(ConfigError::InvalidUtcOffset(30))));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_config_from(Path::new("does/not/exist.toml")).unwrap_err();
        assert!(err.to_string().contains("does/not/exist.toml"));
    }
}
