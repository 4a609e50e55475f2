//! Symptom Vocabulary
//!
//! The canonical, ordered list of recognised symptoms. Position in the list is
//! the feature index a trained model sees, so the order is frozen once a model
//! has been trained against it.

use std::collections::HashMap;
use tracing::debug;

/// Reference vocabulary the shipped models are trained on.
pub const ROSE_SYMPTOMS: [&str; 20] = [
    "dark_spots_on_leaves",
    "yellowing_leaves",
    "leaf_drop",
    "white_powdery_coating",
    "distorted_leaves",
    "stunted_growth",
    "orange_rust_spots",
    "leaf_underside_pustules",
    "premature_leaf_fall",
    "gray_mold_on_flowers",
    "brown_spots_on_petals",
    "flower_rot",
    "yellow_mosaic_pattern",
    "vein_clearing",
    "reduced_flowering",
    "tumor_like_growths",
    "swollen_stems",
    "wilting",
    "holes_in_leaves",
    "webbing_on_leaves",
];

/// Binary encoding of an observation. Every value is 0 or 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureVector(Vec<u8>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of positions set to 1.
    pub fn active_count(&self) -> usize {
        self.0.iter().filter(|&&v| v == 1).count()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for FeatureVector {
    fn from(values: Vec<u8>) -> Self {
        Self(values)
    }
}

#[derive(Debug, Clone)]
pub struct SymptomVocabulary {
    symptoms: Vec<String>,
    positions: HashMap<String, usize>,
}

impl SymptomVocabulary {
    /// Build a vocabulary from an ordered list. A repeated identifier keeps
    /// its first position.
    pub fn new<I, S>(symptoms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ordered = Vec::new();
        let mut positions = HashMap::new();
        for symptom in symptoms {
            let symptom = symptom.into();
            if positions.contains_key(&symptom) {
                continue;
            }
            positions.insert(symptom.clone(), ordered.len());
            ordered.push(symptom);
        }
        Self { symptoms: ordered, positions }
    }

    pub fn rose() -> Self {
        Self::new(ROSE_SYMPTOMS)
    }

    pub fn len(&self) -> usize {
        self.symptoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symptoms.is_empty()
    }

    pub fn symptoms(&self) -> &[String] {
        &self.symptoms
    }

    pub fn contains(&self, symptom: &str) -> bool {
        self.positions.contains_key(symptom)
    }

    pub fn position(&self, symptom: &str) -> Option<usize> {
        self.positions.get(symptom).copied()
    }

    /// Encode an observation. Identifiers outside the vocabulary are skipped,
    /// and duplicates collapse to a single 1.
    pub fn vectorize<S: AsRef<str>>(&self, observation: &[S]) -> FeatureVector {
        let mut values = vec![0u8; self.symptoms.len()];
        for symptom in observation {
            let symptom = symptom.as_ref();
            match self.positions.get(symptom) {
                Some(&idx) => values[idx] = 1,
                None => debug!("Ignoring unknown symptom '{}'", symptom),
            }
        }
        FeatureVector(values)
    }
}

impl Default for SymptomVocabulary {
    fn default() -> Self {
        Self::rose()
    }
}
