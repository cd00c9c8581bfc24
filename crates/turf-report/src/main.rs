//! Report binary for the turf ledger.
//!
//! Loads the configuration and the persisted events, evaluates the ledger
//! as of the current local time and prints the standings.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Read settings from the environment
//! 3. Load and validate the YAML configuration
//! 4. Read the JSON event records
//! 5. Resolve the reporting scope and evaluate
//! 6. Print the report

mod error;
mod report;
mod settings;

use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;
use turf_core::{LedgerEngine, TurfConfig};
use turf_types::EventRecord;

use crate::error::ReportError;
use crate::settings::ReportSettings;

/// Application entry point for the report.
///
/// # Errors
///
/// Returns an error if the configuration or the events cannot be loaded,
/// or if the scope names unknown members.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let settings = ReportSettings::from_env();
    info!(
        config = %settings.config_path.display(),
        events = %settings.events_path.display(),
        "Turf report starting"
    );

    let text = run(&settings)?;
    println!("{text}");
    Ok(())
}

fn run(settings: &ReportSettings) -> Result<String, ReportError> {
    let config = TurfConfig::from_file(&settings.config_path)?;
    let options = report::ReportOptions::from_config(&config);
    let engine = LedgerEngine::new(config);
    info!(members = engine.members().len(), "Configuration loaded");

    let records = read_records(&settings.events_path)?;
    info!(records = records.len(), "Events loaded");

    let scope = engine
        .resolve_scope(&settings.scope)
        .map_err(turf_core::EngineError::from)?;
    let members = engine.members();
    let now = chrono::Local::now().naive_local();

    let events = records
        .iter()
        .map(EventRecord::to_event)
        .collect::<Result<Vec<_>, _>>()
        .map_err(turf_core::EngineError::from)?;
    let evaluation = engine.evaluate_scoped(events, &members, &scope, now);

    Ok(report::render(&evaluation, &scope, &options))
}

fn read_records(path: &Path) -> Result<Vec<EventRecord>, ReportError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&contents)?)
}
