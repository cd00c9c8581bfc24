//! Error types for the report binary.

use std::path::PathBuf;

/// Top-level error for the report binary.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// The engine refused the configuration or the events.
    #[error("engine error: {source}")]
    Engine {
        /// The underlying engine error.
        #[from]
        source: turf_core::EngineError,
    },

    /// The events file could not be read.
    #[error("failed to read events file {path}: {source}")]
    Io {
        /// The events file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The events file is not a JSON array of records.
    #[error("failed to parse events file: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}

impl From<turf_core::ConfigError> for ReportError {
    fn from(source: turf_core::ConfigError) -> Self {
        Self::Engine {
            source: source.into(),
        }
    }
}
