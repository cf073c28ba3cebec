/// Station registry for the Mekong delta gauge service.
///
/// Defines the compiled-in list of monitored stations with their alert
/// thresholds, and `StationRegistry`, the immutable lookup table the
/// pipeline consults. The registry is built once, either from the static
/// table or from a loaded `stations.toml`, and never mutated afterwards.

use std::collections::HashMap;

use crate::config::StationConfig;

// ---------------------------------------------------------------------------
// Station metadata
// ---------------------------------------------------------------------------

/// Metadata for a single gauge station.
pub struct Station {
    /// Short snake_case identifier used as the batch key.
    pub station_id: &'static str,
    /// Local (Vietnamese) name.
    pub name: &'static str,
    /// English name.
    pub name_en: &'static str,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
    /// Early-warning level in meters.
    pub warning_threshold: f64,
    /// Flood (alarm level III) level in meters.
    pub flood_threshold: f64,
}

/// Default stations, from the tidal lower delta up to the Cambodian border.
pub static STATION_REGISTRY: &[Station] = &[
    Station {
        station_id: "can_tho",
        name: "Cần Thơ",
        name_en: "Can Tho",
        latitude: 10.0452,
        longitude: 105.7469,
        warning_threshold: 1.8,
        flood_threshold: 2.0,
    },
    Station {
        station_id: "my_thuan",
        name: "Mỹ Thuận",
        name_en: "My Thuan",
        latitude: 10.2833,
        longitude: 105.9167,
        warning_threshold: 2.0,
        flood_threshold: 2.2,
    },
    Station {
        station_id: "vinh_long",
        name: "Vĩnh Long",
        name_en: "Vinh Long",
        latitude: 10.2396,
        longitude: 105.9572,
        warning_threshold: 1.8,
        flood_threshold: 2.0,
    },
    Station {
        station_id: "tan_chau",
        name: "Tân Châu",
        name_en: "Tan Chau",
        latitude: 10.8000,
        longitude: 105.2500,
        warning_threshold: 4.0,
        flood_threshold: 4.5,
    },
    Station {
        station_id: "chau_doc",
        name: "Châu Đốc",
        name_en: "Chau Doc",
        latitude: 10.7054,
        longitude: 105.1114,
        warning_threshold: 3.5,
        flood_threshold: 4.0,
    },
];

impl From<&Station> for StationConfig {
    fn from(station: &Station) -> Self {
        StationConfig {
            station_id: station.station_id.to_string(),
            name: station.name.to_string(),
            name_en: station.name_en.to_string(),
            latitude: station.latitude,
            longitude: station.longitude,
            warning_threshold: station.warning_threshold,
            flood_threshold: station.flood_threshold,
        }
    }
}

/// Returns the ids of all compiled-in stations.
pub fn all_station_ids() -> Vec<&'static str> {
    STATION_REGISTRY.iter().map(|s| s.station_id).collect()
}

/// Looks up a compiled-in station by id. Returns `None` if not found.
pub fn find_station(station_id: &str) -> Option<&'static Station> {
    STATION_REGISTRY.iter().find(|s| s.station_id == station_id)
}

// ---------------------------------------------------------------------------
// Runtime registry
// ---------------------------------------------------------------------------

/// Immutable station lookup used by the pipeline.
#[derive(Debug, Clone, Default)]
pub struct StationRegistry {
    stations: HashMap<String, StationConfig>,
}

impl StationRegistry {
    pub fn from_configs(configs: Vec<StationConfig>) -> Self {
        let stations = configs
            .into_iter()
            .map(|c| (c.station_id.clone(), c))
            .collect();
        Self { stations }
    }

    /// Registry backed by `STATION_REGISTRY`.
    pub fn builtin() -> Self {
        Self::from_configs(STATION_REGISTRY.iter().map(StationConfig::from).collect())
    }

    pub fn get(&self, station_id: &str) -> Option<&StationConfig> {
        self.stations.get(station_id)
    }

    pub fn contains(&self, station_id: &str) -> bool {
        self.stations.contains_key(station_id)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Stations sorted by id, for stable listings.
    pub fn sorted(&self) -> Vec<&StationConfig> {
        let mut all: Vec<&StationConfig> = self.stations.values().collect();
        all.sort_by(|a, b| a.station_id.cmp(&b.station_id));
        all
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
