//! Rose Symptom Checker server
//!
//! Loads settings, opens the database, loads the model artifact (falling back
//! to rules when it is unusable) and serves the HTTP API until interrupted.

use anyhow::{Context, Result};
use tracing::info;

use rose_checker::server::{run_server, AppState};
use rose_checker::utils::init_tracing;
use rose_checker::{PredictionService, Settings, SqliteStore, SymptomVocabulary};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env()?;
    let _telemetry = init_tracing("rose_checker", settings.log_dir.as_deref())?;

    info!("🌹 Starting {} v{}", settings.app_name, settings.app_version);
    if settings.debug {
        info!("Debug mode: internal error details are returned to clients");
    }

    let db_path = settings.database_path()?;
    let store = SqliteStore::new(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let predictor = PredictionService::initialize(SymptomVocabulary::rose(), &settings.model_path);
    info!(
        "Prediction service ready: {} symptoms, model loaded: {}",
        predictor.vocabulary().len(),
        predictor.model_loaded()
    );

    run_server(AppState::new(settings, store, predictor)).await
}
