//! Rose Symptom Checker
//!
//! An HTTP backend that diagnoses rose diseases from observed symptoms:
//! - Binary symptom vectorization over a fixed vocabulary
//! - Random-forest inference from an offline-trained JSON artifact
//! - Rule-based fallback when no model is usable
//! - Treatment recommendations per disease
//! - Per-user diagnosis history (SQLite) behind bearer-token auth

pub mod auth;
pub mod config;
pub mod error;
pub mod predictor;
pub mod seed;
pub mod server;
pub mod storage;
pub mod utils;

// Re-exports for convenience
pub use config::Settings;
pub use error::ApiError;
pub use predictor::{Prediction, PredictionService, SymptomVocabulary};
pub use server::AppState;
pub use storage::SqliteStore;
