//! Persistence Interface
//!
//! Users and their diagnosis history. The traits are the seam the HTTP layer
//! talks to; [`SqliteStore`] is the concrete backend.

mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("stored JSON is invalid: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("stored timestamp is invalid: {0}")]
    Timestamp(#[from] chrono::ParseError),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub hashed_password: String,
}

/// An immutable record of one check-symptoms call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosisRecord {
    pub id: i64,
    pub user_id: i64,
    pub symptoms: Vec<String>,
    pub disease_predicted: String,
    pub confidence_score: f64,
    pub recommendations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDiagnosis {
    pub user_id: i64,
    pub symptoms: Vec<String>,
    pub disease_predicted: String,
    pub confidence_score: f64,
    pub recommendations: Vec<String>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the email or username is taken.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn get_user_by_id(&self, id: i64) -> StoreResult<Option<User>>;
    /// Removes the user and every diagnosis they own. Returns false if absent.
    async fn delete_user(&self, id: i64) -> StoreResult<bool>;
}

#[async_trait]
pub trait DiagnosisStore: Send + Sync {
    async fn insert_diagnosis(&self, diagnosis: NewDiagnosis) -> StoreResult<DiagnosisRecord>;
    async fn count_diagnoses(&self, user_id: i64) -> StoreResult<i64>;
    /// Newest first.
    async fn list_diagnoses(&self, user_id: i64, skip: u32, limit: u32) -> StoreResult<Vec<DiagnosisRecord>>;
    /// Only returns the record if `user_id` owns it.
    async fn get_diagnosis(&self, user_id: i64, id: i64) -> StoreResult<Option<DiagnosisRecord>>;
}
