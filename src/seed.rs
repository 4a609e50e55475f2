//! Sample data for development databases.

use anyhow::Result;
use argon2::Params;
use tracing::info;

use crate::auth::password;
use crate::storage::{DiagnosisStore, NewDiagnosis, NewUser, SqliteStore, UserStore};

pub struct SampleUser {
    pub email: &'static str,
    pub username: &'static str,
    pub password: &'static str,
}

pub const SAMPLE_USERS: [SampleUser; 3] = [
    SampleUser { email: "admin@rosecheck.com", username: "admin", password: "admin123456" },
    SampleUser { email: "demo@example.com", username: "demo_user", password: "demo123456" },
    SampleUser { email: "test@test.com", username: "testuser", password: "test123456" },
];

struct SampleDiagnosis {
    user_idx: usize,
    symptoms: &'static [&'static str],
    disease: &'static str,
    confidence: f64,
    recommendations: &'static [&'static str],
}

const SAMPLE_DIAGNOSES: [SampleDiagnosis; 4] = [
    SampleDiagnosis {
        user_idx: 0,
        symptoms: &["dark_spots_on_leaves", "yellowing_leaves", "leaf_drop"],
        disease: "Black Spot",
        confidence: 0.95,
        recommendations: &[
            "Remove and destroy infected leaves immediately",
            "Apply fungicide every 7-14 days",
            "Improve air circulation by pruning",
        ],
    },
    SampleDiagnosis {
        user_idx: 0,
        symptoms: &["white_powdery_coating", "distorted_leaves"],
        disease: "Powdery Mildew",
        confidence: 0.88,
        recommendations: &[
            "Spray with neem oil or sulfur-based fungicide",
            "Increase air circulation",
            "Remove infected plant parts",
        ],
    },
    SampleDiagnosis {
        user_idx: 1,
        symptoms: &["orange_rust_spots", "leaf_underside_pustules"],
        disease: "Rust",
        confidence: 0.92,
        recommendations: &[
            "Remove infected leaves and debris",
            "Apply fungicide containing myclobutanil",
            "Improve air circulation",
        ],
    },
    SampleDiagnosis {
        user_idx: 2,
        symptoms: &[],
        disease: "Healthy",
        confidence: 0.98,
        recommendations: &[
            "Continue regular maintenance",
            "Monitor for early signs of disease",
            "Maintain proper watering schedule",
        ],
    },
];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub users_created: usize,
    pub users_existing: usize,
    pub diagnoses_created: usize,
}

/// Insert the sample users (skipping any whose email exists) and one set of
/// sample diagnoses.
pub async fn seed_sample_data(store: &SqliteStore, hash_params: Params) -> Result<SeedReport> {
    info!("Seeding sample data...");
    let mut report = SeedReport::default();
    let mut user_ids = Vec::with_capacity(SAMPLE_USERS.len());

    for sample in &SAMPLE_USERS {
        let user = match store.get_user_by_email(sample.email).await? {
            Some(existing) => {
                info!("  - User already exists: {}", sample.username);
                report.users_existing += 1;
                existing
            }
            None => {
                let params = hash_params.clone();
                let plain = sample.password;
                let hashed_password =
                    tokio::task::spawn_blocking(move || password::hash_with_params(plain, params)).await??;
                let user = store
                    .create_user(NewUser {
                        email: sample.email.to_string(),
                        username: sample.username.to_string(),
                        hashed_password,
                    })
                    .await?;
                info!("  ✓ Created user: {}", sample.username);
                report.users_created += 1;
                user
            }
        };
        user_ids.push(user.id);
    }

    for sample in &SAMPLE_DIAGNOSES {
        store
            .insert_diagnosis(NewDiagnosis {
                user_id: user_ids[sample.user_idx],
                symptoms: sample.symptoms.iter().map(|s| s.to_string()).collect(),
                disease_predicted: sample.disease.to_string(),
                confidence_score: sample.confidence,
                recommendations: sample.recommendations.iter().map(|s| s.to_string()).collect(),
            })
            .await?;
        report.diagnoses_created += 1;
    }
    info!("✓ Created {} sample diagnoses", report.diagnoses_created);

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_seed_is_idempotent_on_users() {
        let file = NamedTempFile::new().unwrap();
        let store = SqliteStore::new(file.path()).await.unwrap();

        let first = seed_sample_data(&store, password::low_cost_params()).await.unwrap();
        assert_eq!(first, SeedReport { users_created: 3, users_existing: 0, diagnoses_created: 4 });

        let second = seed_sample_data(&store, password::low_cost_params()).await.unwrap();
        assert_eq!(second.users_created, 0);
        assert_eq!(second.users_existing, 3);

        let admin = store.get_user_by_email("admin@rosecheck.com").await.unwrap().unwrap();
        assert!(password::verify_password("admin123456", &admin.hashed_password));
        assert_eq!(store.count_diagnoses(admin.id).await.unwrap(), 4);

        let tester = store.get_user_by_email("test@test.com").await.unwrap().unwrap();
        let items = store.list_diagnoses(tester.id, 0, 10).await.unwrap();
        assert_eq!(items[0].disease_predicted, "Healthy");
        assert!(items[0].symptoms.is_empty());
    }
}
