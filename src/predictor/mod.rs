//! Prediction Module
//!
//! Symptom list in, disease and advice out. The statistical model is tried
//! once; if it is missing or fails the rule engine answers instead, so a
//! prediction is always produced.

pub mod classifier;
pub mod forest;
pub mod recommendations;
pub mod rules;
pub mod vocabulary;

pub use classifier::{Classification, Classifier, ClassifierAdapter, ModelUnavailable};
pub use forest::{ForestModel, ModelError, Node, Tree};
pub use recommendations::{recommendations, Disease, GENERIC_RECOMMENDATION};
pub use rules::{classify_fallback, FallbackRule, FALLBACK_RULES};
pub use vocabulary::{FeatureVector, SymptomVocabulary, ROSE_SYMPTOMS};

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    Model,
    Rules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub disease: String,
    pub confidence: f64,
    pub source: PredictionSource,
}

/// A prediction together with the advice for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub prediction: Prediction,
    pub recommendations: Vec<String>,
}

/// Immutable after construction; share it behind an `Arc`.
#[derive(Clone)]
pub struct PredictionService {
    vocabulary: Arc<SymptomVocabulary>,
    classifier: ClassifierAdapter,
}

impl PredictionService {
    pub fn new(vocabulary: SymptomVocabulary, classifier: Option<Arc<dyn Classifier>>) -> Self {
        Self {
            vocabulary: Arc::new(vocabulary),
            classifier: ClassifierAdapter::new(classifier),
        }
    }

    /// Rules only. What a deployment without a trained artifact gets.
    pub fn rules_only(vocabulary: SymptomVocabulary) -> Self {
        Self::new(vocabulary, None)
    }

    /// Load the forest artifact at `model_path` against `vocabulary`.
    ///
    /// A missing, unreadable or mismatched artifact never aborts startup: it
    /// is logged and the service runs on rules alone.
    pub fn initialize(vocabulary: SymptomVocabulary, model_path: impl AsRef<Path>) -> Self {
        let path = model_path.as_ref();
        if !path.exists() {
            warn!("⚠️  ML model not found at {}. Train the model first; using rule-based fallback.", path.display());
            return Self::rules_only(vocabulary);
        }

        let model = match ForestModel::load(path) {
            Ok(model) => model,
            Err(e) => {
                error!("Error loading model from {}: {:#}", path.display(), e);
                return Self::rules_only(vocabulary);
            }
        };

        if model.features != vocabulary.symptoms() {
            error!(
                "Model at {} was trained on a different symptom vocabulary ({} features, expected {}); ignoring it",
                path.display(),
                model.features.len(),
                vocabulary.len()
            );
            return Self::rules_only(vocabulary);
        }

        info!(
            "🌹 ML model loaded: {} trees, {} classes, sha256 {}",
            model.trees.len(),
            model.classes.len(),
            model.fingerprint()
        );
        Self::new(vocabulary, Some(Arc::new(model)))
    }

    pub fn vocabulary(&self) -> &SymptomVocabulary {
        &self.vocabulary
    }

    pub fn model_loaded(&self) -> bool {
        self.classifier.is_loaded()
    }

    pub fn predict<S: AsRef<str>>(&self, symptoms: &[S]) -> Prediction {
        let features = self.vocabulary.vectorize(symptoms);

        match self.classifier.classify(&features) {
            Ok(c) => Prediction {
                disease: c.disease,
                confidence: c.confidence,
                source: PredictionSource::Model,
            },
            Err(reason) => {
                match reason {
                    ModelUnavailable::NotLoaded => debug!("No model loaded, using rules"),
                    other => warn!("Prediction error: {}. Falling back to rules", other),
                }
                let c = classify_fallback(symptoms);
                Prediction {
                    disease: c.disease,
                    confidence: c.confidence,
                    source: PredictionSource::Rules,
                }
            }
        }
    }

    pub fn get_recommendations(&self, disease: &str) -> Vec<String> {
        recommendations(disease)
    }

    pub fn diagnose<S: AsRef<str>>(&self, symptoms: &[S]) -> Diagnosis {
        let prediction = self.predict(symptoms);
        let recommendations = self.get_recommendations(&prediction.disease);
        Diagnosis { prediction, recommendations }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::NamedTempFile;

    /// Fails every call and counts how often it was asked.
    struct Broken(AtomicUsize);

    impl Classifier for Broken {
        fn predict_label(&self, _: &FeatureVector) -> Result<String, ModelUnavailable> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(ModelUnavailable::Inference("resource exhausted".to_string()))
        }
        fn predict_confidence(&self, _: &FeatureVector) -> Result<f64, ModelUnavailable> {
            Ok(0.0)
        }
    }

    #[test]
    fn test_absent_model_falls_back_to_rules() {
        let service = PredictionService::rules_only(SymptomVocabulary::rose());
        let p = service.predict(&["orange_rust_spots", "leaf_underside_pustules"]);
        assert_eq!(p.disease, "Rust");
        assert_eq!(p.confidence, 0.82);
        assert_eq!(p.source, PredictionSource::Rules);
    }

    #[test]
    fn test_failing_model_is_tried_once_then_rules() {
        let broken = Arc::new(Broken(AtomicUsize::new(0)));
        let service = PredictionService::new(SymptomVocabulary::rose(), Some(broken.clone()));
        let p = service.predict(&["white_powdery_coating"]);
        assert_eq!(p.disease, "Powdery Mildew");
        assert_eq!(p.source, PredictionSource::Rules);
        assert_eq!(broken.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_model_path_is_used_when_it_succeeds() {
        let model = forest::tests::stump_forest();
        let vocab = SymptomVocabulary::new(model.features.clone());
        let service = PredictionService::new(vocab, Some(Arc::new(model)));
        let p = service.predict(&["dark_spots_on_leaves", "leaf_drop"]);
        assert_eq!(p.source, PredictionSource::Model);
        assert_eq!(p.disease, "Black Spot");
        assert!((p.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_initialize_without_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let service = PredictionService::initialize(SymptomVocabulary::rose(), dir.path().join("model.json"));
        assert!(!service.model_loaded());
        assert_eq!(service.predict::<&str>(&[]).disease, "Healthy");
    }

    #[test]
    fn test_initialize_rejects_vocabulary_mismatch() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&serde_json::to_vec(&forest::tests::stump_forest()).unwrap()).unwrap();

        let service = PredictionService::initialize(SymptomVocabulary::rose(), file.path());
        assert!(!service.model_loaded());

        let model = forest::tests::stump_forest();
        let service = PredictionService::initialize(SymptomVocabulary::new(model.features), file.path());
        assert!(service.model_loaded());
    }

    #[test]
    fn test_initialize_with_corrupt_artifact() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        let service = PredictionService::initialize(SymptomVocabulary::rose(), file.path());
        assert!(!service.model_loaded());
    }

    #[test]
    fn test_diagnose_attaches_recommendations() {
        let service = PredictionService::rules_only(SymptomVocabulary::rose());
        let d = service.diagnose(&["dark_spots_on_leaves"]);
        assert_eq!(d.prediction.disease, "Black Spot");
        assert_eq!(d.recommendations[0], "Remove and destroy infected leaves immediately");
    }
}
