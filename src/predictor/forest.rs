//! Random-forest model artifact
//!
//! The offline training job exports its forest as JSON:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "classes": ["Black Spot", "Healthy"],
//!   "features": ["dark_spots_on_leaves", "leaf_drop"],
//!   "trees": [
//!     { "nodes": [
//!         {"kind": "split", "feature": 0, "threshold": 0.5, "left": 1, "right": 2},
//!         {"kind": "leaf", "value": [2.0, 38.0]},
//!         {"kind": "leaf", "value": [41.0, 1.0]}
//!     ] }
//!   ]
//! }
//! ```
//!
//! A sample goes left when `x[feature] <= threshold`. Each tree votes with its
//! leaf distribution normalised to 1; the forest posterior is the mean vote.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::classifier::{Classification, Classifier, ModelUnavailable};
use super::vocabulary::FeatureVector;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Class distribution of the leaf this sample lands in, normalised.
    fn vote(&self, x: &[u8]) -> Result<Vec<f64>, ModelUnavailable> {
        let mut idx = 0;
        // A valid tree never visits more nodes than it has.
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(idx) {
                Some(Node::Split { feature, threshold, left, right }) => {
                    let value = *x.get(*feature).ok_or_else(|| {
                        ModelUnavailable::Inference(format!("split on missing feature {}", feature))
                    })?;
                    idx = if f64::from(value) <= *threshold { *left } else { *right };
                }
                Some(Node::Leaf { value }) => {
                    let total: f64 = value.iter().sum();
                    if total <= 0.0 || !total.is_finite() {
                        return Err(ModelUnavailable::Inference("leaf with empty distribution".to_string()));
                    }
                    return Ok(value.iter().map(|v| v / total).collect());
                }
                None => {
                    return Err(ModelUnavailable::Inference(format!("node {} out of range", idx)));
                }
            }
        }
        Err(ModelUnavailable::Inference("cycle in tree".to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u32),
    #[error("model has no classes")]
    NoClasses,
    #[error("model has no trees")]
    NoTrees,
    #[error("tree {tree} is empty")]
    EmptyTree { tree: usize },
    #[error("tree {tree} node {node}: leaf has {actual} values for {expected} classes")]
    LeafWidth { tree: usize, node: usize, expected: usize, actual: usize },
    #[error("tree {tree} node {node}: child index {child} out of range")]
    ChildOutOfRange { tree: usize, node: usize, child: usize },
    #[error("tree {tree} node {node}: feature index {feature} out of range")]
    FeatureOutOfRange { tree: usize, node: usize, feature: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestModel {
    pub format_version: u32,
    pub classes: Vec<String>,
    pub features: Vec<String>,
    pub trees: Vec<Tree>,
    #[serde(skip)]
    fingerprint: String,
}

impl ForestModel {
    pub fn new(classes: Vec<String>, features: Vec<String>, trees: Vec<Tree>) -> Result<Self, ModelError> {
        let model = Self {
            format_version: FORMAT_VERSION,
            classes,
            features,
            trees,
            fingerprint: String::new(),
        };
        model.validate()?;
        Ok(model)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let mut model: ForestModel = serde_json::from_slice(bytes).context("Malformed model artifact")?;
        model.validate()?;
        model.fingerprint = hex::encode(Sha256::digest(bytes));
        Ok(model)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read model artifact {}", path.display()))?;
        Self::from_json(&bytes)
    }

    /// SHA-256 of the artifact bytes; empty for models built in memory.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.format_version != FORMAT_VERSION {
            return Err(ModelError::UnsupportedVersion(self.format_version));
        }
        if self.classes.is_empty() {
            return Err(ModelError::NoClasses);
        }
        if self.trees.is_empty() {
            return Err(ModelError::NoTrees);
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(ModelError::EmptyTree { tree: t });
            }
            for (n, node) in tree.nodes.iter().enumerate() {
                match node {
                    Node::Split { feature, left, right, .. } => {
                        if *feature >= self.features.len() {
                            return Err(ModelError::FeatureOutOfRange { tree: t, node: n, feature: *feature });
                        }
                        for child in [*left, *right] {
                            if child >= tree.nodes.len() {
                                return Err(ModelError::ChildOutOfRange { tree: t, node: n, child });
                            }
                        }
                    }
                    Node::Leaf { value } => {
                        if value.len() != self.classes.len() {
                            return Err(ModelError::LeafWidth {
                                tree: t,
                                node: n,
                                expected: self.classes.len(),
                                actual: value.len(),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Mean class distribution over all trees.
    pub fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>, ModelUnavailable> {
        if features.len() != self.features.len() {
            return Err(ModelUnavailable::FeatureMismatch {
                expected: self.features.len(),
                actual: features.len(),
            });
        }

        let mut sum = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (acc, p) in sum.iter_mut().zip(tree.vote(features.as_slice())?) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        Ok(sum.into_iter().map(|s| s / n).collect())
    }
}

/// Index of the largest value; the first one wins ties.
fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

impl Classifier for ForestModel {
    fn predict_label(&self, features: &FeatureVector) -> Result<String, ModelUnavailable> {
        self.classify(features).map(|c| c.disease)
    }

    fn predict_confidence(&self, features: &FeatureVector) -> Result<f64, ModelUnavailable> {
        self.classify(features).map(|c| c.confidence)
    }

    fn classify(&self, features: &FeatureVector) -> Result<Classification, ModelUnavailable> {
        let proba = self.predict_proba(features)?;
        let best = argmax(&proba).ok_or_else(|| ModelUnavailable::Inference("empty posterior".to_string()))?;
        Ok(Classification::new(self.classes[best].clone(), proba[best]))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Two-class stump forest over three features, used across the crate's tests.
    pub(crate) fn stump_forest() -> ForestModel {
        let classes = vec!["Black Spot".to_string(), "Healthy".to_string()];
        let features = vec!["dark_spots_on_leaves".to_string(), "leaf_drop".to_string(), "wilting".to_string()];
        let stump = |feature| Tree {
            nodes: vec![
                Node::Split { feature, threshold: 0.5, left: 1, right: 2 },
                Node::Leaf { value: vec![1.0, 9.0] },
                Node::Leaf { value: vec![9.0, 1.0] },
            ],
        };
        ForestModel::new(classes, features, vec![stump(0), stump(1)]).unwrap()
    }

    #[test]
    fn test_mean_vote_over_trees() {
        let model = stump_forest();
        let proba = model.predict_proba(&FeatureVector::from(vec![1, 0, 0])).unwrap();
        assert!((proba[0] - 0.5).abs() < 1e-9);
        assert!((proba[1] - 0.5).abs() < 1e-9);

        let c = model.classify(&FeatureVector::from(vec![1, 1, 0])).unwrap();
        assert_eq!(c.disease, "Black Spot");
        assert!((c.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_tie_goes_to_first_class() {
        let model = stump_forest();
        let c = model.classify(&FeatureVector::from(vec![0, 1, 0])).unwrap();
        assert_eq!(c.disease, "Black Spot");
        assert!((c.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_wrong_vector_length_is_unavailable() {
        let model = stump_forest();
        let err = model.classify(&FeatureVector::from(vec![1, 0])).unwrap_err();
        assert_eq!(err, ModelUnavailable::FeatureMismatch { expected: 3, actual: 2 });
    }

    #[test]
    fn test_json_artifact_loads_and_fingerprints() {
        let json = serde_json::to_vec(&stump_forest()).unwrap();
        let model = ForestModel::from_json(&json).unwrap();
        assert_eq!(model.trees.len(), 2);
        assert_eq!(model.fingerprint().len(), 64);
    }

    #[test]
    fn test_validation_rejects_bad_leaves_and_children() {
        let bad_leaf = ForestModel::new(
            vec!["A".into(), "B".into()],
            vec!["x".into()],
            vec![Tree { nodes: vec![Node::Leaf { value: vec![1.0] }] }],
        );
        assert!(matches!(bad_leaf, Err(ModelError::LeafWidth { .. })));

        let bad_child = ForestModel::new(
            vec!["A".into()],
            vec!["x".into()],
            vec![Tree {
                nodes: vec![Node::Split { feature: 0, threshold: 0.5, left: 1, right: 7 }, Node::Leaf { value: vec![1.0] }],
            }],
        );
        assert!(matches!(bad_child, Err(ModelError::ChildOutOfRange { child: 7, .. })));

        let version = br#"{"format_version": 9, "classes": ["A"], "features": [], "trees": []}"#;
        assert!(ForestModel::from_json(version).is_err());
    }

    #[test]
    fn test_cycle_is_reported_not_looped() {
        let model = ForestModel::new(
            vec!["A".into()],
            vec!["x".into()],
            vec![Tree { nodes: vec![Node::Split { feature: 0, threshold: 0.5, left: 0, right: 0 }] }],
        )
        .unwrap();
        let err = model.classify(&FeatureVector::from(vec![0])).unwrap_err();
        assert!(matches!(err, ModelUnavailable::Inference(_)));
    }
}
