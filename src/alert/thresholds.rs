//! Flood threshold checking.
//!
//! Classification is a pure function of the instantaneous level and the
//! station's static thresholds: no hysteresis, no memory of earlier runs.
//! Reaching a threshold exactly counts as crossing it.

use crate::config::StationConfig;
use crate::model::{Alert, AlertLevel};

/// Maps a level to its tier. First match wins:
/// `>= flood` is Critical, `>= warning` is Warning, otherwise Normal.
pub fn classify_level(level: f64, warning_threshold: f64, flood_threshold: f64) -> AlertLevel {
    if level >= flood_threshold {
        AlertLevel::Critical
    } else if level >= warning_threshold {
        AlertLevel::Warning
    } else {
        AlertLevel::Normal
    }
}

/// Classifies the current level of a station and renders the message.
pub fn check_alert(current_level: f64, station: &StationConfig) -> Alert {
    let warning = station.warning_threshold;
    let flood = station.flood_threshold;
    let name = &station.name;

    let level = classify_level(current_level, warning, flood);
    let message = match level {
        AlertLevel::Critical => format!(
            "FLOOD WARNING! Water level at {} has reached {:.2}m, exceeding the flood threshold ({:.2}m). Serious inundation risk!",
            name, current_level, flood
        ),
        AlertLevel::Warning => format!(
            "High water warning at {}: {:.2}m, above the warning threshold ({:.2}m). Monitor closely.",
            name, current_level, warning
        ),
        AlertLevel::Normal => format!(
            "Water level at {} is within safe limits: {:.2}m ({:.2}m below the warning threshold).",
            name,
            current_level,
            warning - current_level
        ),
    };

    Alert {
        level,
        message,
        threshold_warning: warning,
        threshold_flood: flood,
    }
}
