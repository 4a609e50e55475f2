//! Classifier seam
//!
//! Any multi-class model plugs in through [`Classifier`]. The
//! [`ClassifierAdapter`] turns every way a model can fail (not loaded, an
//! error, a panic, a nonsense confidence) into [`ModelUnavailable`] so the
//! prediction service can fall back instead of failing the request.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::vocabulary::FeatureVector;

/// A disease label with the confidence it was produced with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub disease: String,
    pub confidence: f64,
}

impl Classification {
    pub fn new(disease: impl Into<String>, confidence: f64) -> Self {
        Self { disease: disease.into(), confidence }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelUnavailable {
    #[error("no classifier artifact is loaded")]
    NotLoaded,
    #[error("feature vector has {actual} features, model expects {expected}")]
    FeatureMismatch { expected: usize, actual: usize },
    #[error("confidence {0} is outside [0, 1]")]
    InvalidConfidence(f64),
    #[error("inference failed: {0}")]
    Inference(String),
}

/// A pre-trained classifier. Implementations are read-only after load and
/// shared across request tasks.
pub trait Classifier: Send + Sync {
    fn predict_label(&self, features: &FeatureVector) -> Result<String, ModelUnavailable>;

    /// Posterior probability of the predicted label.
    fn predict_confidence(&self, features: &FeatureVector) -> Result<f64, ModelUnavailable>;

    fn classify(&self, features: &FeatureVector) -> Result<Classification, ModelUnavailable> {
        let label = self.predict_label(features)?;
        let confidence = self.predict_confidence(features)?;
        Ok(Classification::new(label, confidence))
    }
}

/// Wraps an optional classifier. `None` means the artifact was absent or
/// unusable at startup.
#[derive(Clone, Default)]
pub struct ClassifierAdapter {
    model: Option<Arc<dyn Classifier>>,
}

impl ClassifierAdapter {
    pub fn new(model: Option<Arc<dyn Classifier>>) -> Self {
        Self { model }
    }

    pub fn unavailable() -> Self {
        Self { model: None }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Single inference attempt. Never panics and never retries.
    pub fn classify(&self, features: &FeatureVector) -> Result<Classification, ModelUnavailable> {
        let model = self.model.as_ref().ok_or(ModelUnavailable::NotLoaded)?;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| model.classify(features)))
            .map_err(|payload| ModelUnavailable::Inference(panic_message(payload.as_ref())))??;

        if !outcome.confidence.is_finite() || !(0.0..=1.0).contains(&outcome.confidence) {
            return Err(ModelUnavailable::InvalidConfidence(outcome.confidence));
        }
        Ok(outcome)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "classifier panicked".to_string()
    }
}
