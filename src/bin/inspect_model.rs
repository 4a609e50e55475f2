use anyhow::{Context, Result};

use rose_checker::predictor::{ForestModel, SymptomVocabulary};

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("MODEL_PATH").ok())
        .unwrap_or_else(|| "ml/model.json".to_string());
    let model = ForestModel::load(&path).with_context(|| format!("Failed to load model {}", path))?;

    println!("Model: {}", path);
    println!("  Format version: {}", model.format_version);
    println!("  SHA-256: {}", model.fingerprint());
    println!("  Trees: {}", model.trees.len());

    println!("Classes:");
    for class in &model.classes {
        println!("  - {}", class);
    }

    let vocabulary = SymptomVocabulary::new(model.features.iter().cloned());
    let matches_rose = vocabulary.symptoms() == SymptomVocabulary::rose().symptoms();
    println!("Features ({}, matches rose vocabulary: {}):", model.features.len(), matches_rose);
    for feature in &model.features {
        println!("  - {}", feature);
    }

    let sample: Vec<String> = std::env::args().skip(2).collect();
    if !sample.is_empty() {
        let features = vocabulary.vectorize(sample.as_slice());
        let proba = model.predict_proba(&features)?;
        println!("Sample prediction for {:?}:", sample);
        for (class, p) in model.classes.iter().zip(proba) {
            println!("  {:<20} {:.3}", class, p);
        }
    }

    Ok(())
}
