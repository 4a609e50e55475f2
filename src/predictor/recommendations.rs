//! Disease labels and treatment recommendations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Returned for any label without a dedicated entry.
pub const GENERIC_RECOMMENDATION: &str = "Consult with a local horticulturist";

/// The closed set of labels a rose model is trained to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Disease {
    #[serde(rename = "Black Spot")]
    BlackSpot,
    #[serde(rename = "Powdery Mildew")]
    PowderyMildew,
    #[serde(rename = "Rust")]
    Rust,
    #[serde(rename = "Botrytis Blight")]
    BotrytisBlight,
    #[serde(rename = "Rose Mosaic Virus")]
    RoseMosaicVirus,
    #[serde(rename = "Crown Gall")]
    CrownGall,
    #[serde(rename = "Healthy")]
    Healthy,
}

impl Disease {
    pub const ALL: [Disease; 7] = [
        Disease::BlackSpot,
        Disease::PowderyMildew,
        Disease::Rust,
        Disease::BotrytisBlight,
        Disease::RoseMosaicVirus,
        Disease::CrownGall,
        Disease::Healthy,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Disease::BlackSpot => "Black Spot",
            Disease::PowderyMildew => "Powdery Mildew",
            Disease::Rust => "Rust",
            Disease::BotrytisBlight => "Botrytis Blight",
            Disease::RoseMosaicVirus => "Rose Mosaic Virus",
            Disease::CrownGall => "Crown Gall",
            Disease::Healthy => "Healthy",
        }
    }

    /// Ordered by priority, most urgent first.
    pub fn recommendations(&self) -> &'static [&'static str] {
        match self {
            Disease::BlackSpot => &[
                "Remove and destroy infected leaves immediately",
                "Apply fungicide every 7-14 days during wet weather",
                "Improve air circulation by pruning",
                "Water at the base of the plant, avoid wetting foliage",
                "Apply mulch to prevent soil splash",
            ],
            Disease::PowderyMildew => &[
                "Spray with neem oil or sulfur-based fungicide",
                "Increase air circulation and reduce humidity",
                "Remove infected plant parts",
                "Avoid overhead watering",
                "Apply fungicide at first sign of disease",
            ],
            Disease::Rust => &[
                "Remove infected leaves and debris",
                "Apply fungicide containing myclobutanil",
                "Improve air circulation",
                "Avoid overhead watering",
                "Plant rust-resistant varieties",
            ],
            Disease::BotrytisBlight => &[
                "Remove dead flowers and infected tissue",
                "Improve air circulation",
                "Reduce humidity around plants",
                "Apply appropriate fungicide",
                "Avoid overcrowding plants",
            ],
            Disease::RoseMosaicVirus => &[
                "No cure available - manage symptoms",
                "Maintain plant vigor with proper care",
                "Use virus-free planting material",
                "Control aphid populations",
                "Remove severely infected plants",
            ],
            Disease::CrownGall => &[
                "Remove and destroy infected plants",
                "Disinfect pruning tools between cuts",
                "Avoid wounding plants",
                "Improve soil drainage",
                "Use disease-free planting stock",
            ],
            Disease::Healthy => &[
                "Continue regular maintenance",
                "Monitor for early signs of disease",
                "Maintain proper watering schedule",
                "Fertilize according to plant needs",
                "Practice good garden hygiene",
            ],
        }
    }
}

impl fmt::Display for Disease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown disease label '{0}'")]
pub struct UnknownDisease(pub String);

impl FromStr for Disease {
    type Err = UnknownDisease;

    /// Labels match exactly; "black spot" is not "Black Spot".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Disease::ALL
            .iter()
            .find(|d| d.label() == s)
            .copied()
            .ok_or_else(|| UnknownDisease(s.to_string()))
    }
}

/// Recommendations for any label. Unknown labels get the generic advice.
pub fn recommendations(label: &str) -> Vec<String> {
    match label.parse::<Disease>() {
        Ok(disease) => disease.recommendations().iter().map(|s| s.to_string()).collect(),
        Err(_) => vec![GENERIC_RECOMMENDATION.to_string()],
    }
}
