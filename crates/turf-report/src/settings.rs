//! Report settings loaded from environment variables.

use std::path::PathBuf;

/// Default configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "turf-config.yaml";

/// Default events file.
pub const DEFAULT_EVENTS_PATH: &str = "turf-events.json";

/// Where the report reads its inputs from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSettings {
    /// YAML configuration file.
    pub config_path: PathBuf,
    /// JSON array of persisted event records.
    pub events_path: PathBuf,
    /// Reporting scope: empty for everyone, a group, or a member list.
    pub scope: String,
}

impl ReportSettings {
    /// Load settings from the process environment.
    ///
    /// - `TURF_CONFIG` -- configuration file (default `turf-config.yaml`)
    /// - `TURF_EVENTS` -- events file (default `turf-events.json`)
    /// - `TURF_SCOPE` -- reporting scope (default everyone)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            config_path: non_empty("TURF_CONFIG")
                .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from),
            events_path: non_empty("TURF_EVENTS")
                .map_or_else(|| PathBuf::from(DEFAULT_EVENTS_PATH), PathBuf::from),
            scope: lookup("TURF_SCOPE").unwrap_or_default(),
        }
    }
}
