use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ApiResponse, AppState, CurrentUser, ValidJson, ValidPath, ValidQuery};
use crate::error::ApiError;
use crate::storage::{DiagnosisRecord, NewDiagnosis};

#[derive(Debug, Deserialize)]
pub struct SymptomInput {
    pub symptoms: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DiagnosisResult {
    pub disease: String,
    pub confidence: f64,
    pub symptoms_analyzed: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    10
}

#[derive(Debug, Serialize)]
pub struct DiagnosisResponse {
    pub id: i64,
    pub user_id: i64,
    pub symptoms: Vec<String>,
    pub disease_predicted: String,
    pub confidence_score: f64,
    pub recommendations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DiagnosisRecord> for DiagnosisResponse {
    fn from(record: DiagnosisRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            symptoms: record.symptoms,
            disease_predicted: record.disease_predicted,
            confidence_score: record.confidence_score,
            recommendations: record.recommendations,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub total: i64,
    pub items: Vec<DiagnosisResponse>,
}

pub async fn check_symptoms(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidJson(input): ValidJson<SymptomInput>,
) -> Result<ApiResponse<DiagnosisResult>, ApiError> {
    if input.symptoms.is_empty() {
        return Err(ApiError::BadRequest("At least one symptom is required".to_string()));
    }

    let diagnosis = state.predictor.diagnose(input.symptoms.as_slice());
    let prediction = diagnosis.prediction;

    let record = state
        .diagnoses
        .insert_diagnosis(NewDiagnosis {
            user_id: user.id,
            symptoms: input.symptoms.clone(),
            disease_predicted: prediction.disease.clone(),
            confidence_score: prediction.confidence,
            recommendations: diagnosis.recommendations.clone(),
        })
        .await
        .map_err(ApiError::internal)?;
    info!(
        "🌹 Diagnosis {} for user {}: {} ({:.2}, {:?})",
        record.id, user.id, prediction.disease, prediction.confidence, prediction.source
    );

    Ok(ApiResponse::ok(
        "Diagnosis completed successfully",
        DiagnosisResult {
            disease: prediction.disease,
            confidence: prediction.confidence,
            symptoms_analyzed: input.symptoms,
            recommendations: diagnosis.recommendations,
        },
    ))
}

pub async fn history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidQuery(params): ValidQuery<HistoryParams>,
) -> Result<ApiResponse<HistoryResponse>, ApiError> {
    let total = state.diagnoses.count_diagnoses(user.id).await.map_err(ApiError::internal)?;
    let items = state
        .diagnoses
        .list_diagnoses(user.id, params.skip, params.limit)
        .await
        .map_err(ApiError::internal)?;

    Ok(ApiResponse::ok(
        "History retrieved successfully",
        HistoryResponse {
            total,
            items: items.into_iter().map(DiagnosisResponse::from).collect(),
        },
    ))
}

pub async fn history_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<ApiResponse<DiagnosisResponse>, ApiError> {
    let record = state
        .diagnoses
        .get_diagnosis(user.id, id)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::NotFound("Diagnosis not found".to_string()))?;

    Ok(ApiResponse::ok("Diagnosis retrieved successfully", DiagnosisResponse::from(record)))
}

pub async fn available_symptoms(State(state): State<AppState>) -> ApiResponse<Vec<String>> {
    ApiResponse::ok(
        "Available symptoms retrieved successfully",
        state.predictor.vocabulary().symptoms().to_vec(),
    )
}
