//! Fallback Rule Engine
//!
//! Deterministic substitute for the statistical model. Rules are checked in
//! priority order and the first whose trigger set shares at least one symptom
//! with the observation wins, however many of its triggers actually matched.

use std::collections::HashSet;

use super::classifier::Classification;
use super::recommendations::Disease;

#[derive(Debug, Clone, Copy)]
pub struct FallbackRule {
    pub disease: Disease,
    pub triggers: &'static [&'static str],
    pub confidence: f64,
}

impl FallbackRule {
    fn matches(&self, observation: &HashSet<&str>) -> bool {
        self.triggers.iter().any(|t| observation.contains(t))
    }
}

/// Priority order matters: overlapping observations resolve to the earlier rule.
pub const FALLBACK_RULES: [FallbackRule; 6] = [
    FallbackRule {
        disease: Disease::BlackSpot,
        triggers: &["dark_spots_on_leaves", "yellowing_leaves", "leaf_drop"],
        confidence: 0.85,
    },
    FallbackRule {
        disease: Disease::PowderyMildew,
        triggers: &["white_powdery_coating", "distorted_leaves"],
        confidence: 0.80,
    },
    FallbackRule {
        disease: Disease::Rust,
        triggers: &["orange_rust_spots", "leaf_underside_pustules"],
        confidence: 0.82,
    },
    FallbackRule {
        disease: Disease::BotrytisBlight,
        triggers: &["gray_mold_on_flowers", "brown_spots_on_petals"],
        confidence: 0.78,
    },
    FallbackRule {
        disease: Disease::RoseMosaicVirus,
        triggers: &["yellow_mosaic_pattern", "vein_clearing"],
        confidence: 0.75,
    },
    FallbackRule {
        disease: Disease::CrownGall,
        triggers: &["tumor_like_growths", "swollen_stems"],
        confidence: 0.80,
    },
];

/// Returned when no rule fires, including for an empty observation.
pub const DEFAULT_DIAGNOSIS: (Disease, f64) = (Disease::Healthy, 0.90);

pub fn classify_fallback<S: AsRef<str>>(observation: &[S]) -> Classification {
    let observed: HashSet<&str> = observation.iter().map(|s| s.as_ref()).collect();

    let (disease, confidence) = FALLBACK_RULES
        .iter()
        .find(|rule| rule.matches(&observed))
        .map(|rule| (rule.disease, rule.confidence))
        .unwrap_or(DEFAULT_DIAGNOSIS);

    Classification::new(disease.label(), confidence)
}
