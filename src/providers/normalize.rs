//! Vendor wire formats → [`ClassificationOutcome`].
//!
//! Pure functions; no I/O. Each returns `InvalidResponse` when the body holds
//! nothing usable.

use super::local::Prediction;
use super::{ProviderError, ProviderKind};
use crate::labels;
use crate::types::{ClassificationOutcome, Taxonomy};
use serde::Deserialize;
use serde_json::{json, Value};

/// Labels that describe a category or a scene rather than a species.
const GENERIC_LABELS: &[&str] = &[
    "animal",
    "wildlife",
    "mammal",
    "vertebrate",
    "terrestrial animal",
    "organism",
    "fauna",
    "nature",
    "natural environment",
    "wilderness",
    "carnivore",
    "herbivore",
    "snout",
    "whiskers",
    "fur",
    "grass",
    "tree",
    "plant",
    "sky",
    "zoo",
    "adaptation",
];

/// Terms that confirm a local prediction is about wildlife.
const WILDLIFE_TERMS: &[&str] = &[
    "tiger", "lion", "leopard", "cheetah", "jaguar", "elephant", "giraffe", "zebra", "bear",
    "wolf", "fox", "deer", "moose", "elk", "bison", "antelope", "gazelle", "eagle", "owl",
    "hawk", "heron", "crane", "pelican", "flamingo", "parrot", "penguin", "monkey", "gorilla",
    "chimpanzee", "orangutan", "panda", "kangaroo", "koala", "dolphin", "whale", "shark",
    "turtle", "tortoise", "snake", "lizard", "crocodile", "alligator", "frog", "otter",
    "beaver", "rabbit", "hare", "squirrel", "raccoon", "hippopotamus", "rhinoceros",
];

/// Multiplier for local predictions that name a confirmed wildlife term.
pub const LOCAL_WILDLIFE_BOOST: f64 = 1.2;

fn is_generic(label: &str) -> bool {
    let n = labels::normalize(label);
    GENERIC_LABELS.contains(&n.trim())
}

fn best<'a>(items: impl Iterator<Item = &'a (String, f64)>) -> Option<&'a (String, f64)> {
    items.fold(None, |acc: Option<&'a (String, f64)>, e| match acc {
        Some(a) if e.1 <= a.1 => Some(a),
        _ => Some(e),
    })
}

/// Highest-scoring specific label, or the overall best when all are generic.
fn pick_specific(scored: &[(String, f64)]) -> Option<&(String, f64)> {
    best(scored.iter().filter(|e| !is_generic(&e.0))).or_else(|| best(scored.iter()))
}

// ---- vision -------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct VisionResponse {
    #[serde(default)]
    responses: Vec<VisionAnnotateResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VisionAnnotateResult {
    #[serde(default)]
    label_annotations: Vec<VisionLabel>,
    error: Option<VisionError>,
}

#[derive(Debug, Deserialize)]
struct VisionLabel {
    description: String,
    #[serde(default)]
    score: f64,
}

#[derive(Debug, Deserialize)]
struct VisionError {
    #[serde(default)]
    message: String,
}

pub fn normalize_vision(provider: &str, body: &Value) -> Result<ClassificationOutcome, ProviderError> {
    let parsed: VisionResponse = serde_json::from_value(body.clone())
        .map_err(|e| ProviderError::invalid_response(provider, e.to_string()))?;
    let first = parsed
        .responses
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::invalid_response(provider, "no annotate results"))?;
    if let Some(err) = first.error {
        return Err(ProviderError::new(
            provider,
            super::ProviderErrorKind::Unknown,
            err.message,
        ));
    }
    let scored: Vec<(String, f64)> = first
        .label_annotations
        .into_iter()
        .map(|l| (l.description, l.score))
        .collect();
    let (label, score) = pick_specific(&scored)
        .ok_or_else(|| ProviderError::invalid_response(provider, "no label annotations"))?;
    let top: Vec<&str> = scored.iter().take(5).map(|(l, _)| l.as_str()).collect();
    Ok(ClassificationOutcome::new(label.clone(), *score, provider)
        .with_metadata(json!({ "labels": top })))
}

// ---- rekognition --------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RekognitionResponse {
    #[serde(default)]
    labels: Vec<RekognitionLabel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RekognitionLabel {
    name: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    parents: Vec<RekognitionParent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RekognitionParent {
    name: String,
}

pub fn normalize_rekognition(
    provider: &str,
    body: &Value,
) -> Result<ClassificationOutcome, ProviderError> {
    let parsed: RekognitionResponse = serde_json::from_value(body.clone())
        .map_err(|e| ProviderError::invalid_response(provider, e.to_string()))?;
    let scored: Vec<(String, f64)> = parsed
        .labels
        .iter()
        .map(|l| (l.name.clone(), l.confidence / 100.0))
        .collect();
    let (label, score) = pick_specific(&scored)
        .ok_or_else(|| ProviderError::invalid_response(provider, "no labels"))?;
    let parents: Vec<&str> = parsed
        .labels
        .iter()
        .find(|l| &l.name == label)
        .map(|l| l.parents.iter().map(|p| p.name.as_str()).collect())
        .unwrap_or_default();
    Ok(ClassificationOutcome::new(label.clone(), *score, provider)
        .with_metadata(json!({ "parents": parents })))
}

// ---- taxonomy -----------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TaxonResponse {
    #[serde(default)]
    results: Vec<TaxonResult>,
}

#[derive(Debug, Deserialize)]
struct TaxonResult {
    combined_score: Option<f64>,
    vision_score: Option<f64>,
    taxon: Taxon,
}

impl TaxonResult {
    /// Scores are reported on a 0..100 scale.
    fn score(&self) -> f64 {
        self.combined_score.or(self.vision_score).unwrap_or(0.0) / 100.0
    }
}

#[derive(Debug, Deserialize)]
struct Taxon {
    name: String,
    preferred_common_name: Option<String>,
    rank: Option<String>,
    #[serde(default)]
    ancestors: Vec<Ancestor>,
}

#[derive(Debug, Deserialize)]
struct Ancestor {
    rank: String,
    name: String,
}

pub fn normalize_taxonomy(
    provider: &str,
    body: &Value,
) -> Result<ClassificationOutcome, ProviderError> {
    let parsed: TaxonResponse = serde_json::from_value(body.clone())
        .map_err(|e| ProviderError::invalid_response(provider, e.to_string()))?;
    let best = parsed
        .results
        .iter()
        .fold(None::<&TaxonResult>, |acc, r| match acc {
            Some(a) if r.score() <= a.score() => Some(a),
            _ => Some(r),
        })
        .ok_or_else(|| ProviderError::invalid_response(provider, "no taxon suggestions"))?;

    let taxon = &best.taxon;
    let mut taxonomy = Taxonomy::default();
    for a in &taxon.ancestors {
        taxonomy.set_rank(&a.rank, a.name.clone());
    }
    if let Some(rank) = taxon.rank.as_deref() {
        taxonomy.set_rank(rank, taxon.name.clone());
    }

    let label = taxon
        .preferred_common_name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(taxon.name.as_str());

    let mut outcome = ClassificationOutcome::new(label, best.score(), provider)
        .with_scientific_name(taxon.name.clone());
    if !taxonomy.is_empty() {
        outcome = outcome.with_taxonomy(&taxonomy);
    }
    Ok(outcome)
}

// ---- local inference ----------------------------------------------------

/// `min(p × 1.2, 1.0)` when the label names a known wildlife term.
pub fn boosted_local_confidence(label: &str, probability: f64) -> (f64, bool) {
    let n = labels::normalize(label);
    if WILDLIFE_TERMS.iter().any(|t| n.contains(t)) {
        ((probability * LOCAL_WILDLIFE_BOOST).min(1.0), true)
    } else {
        (probability, false)
    }
}

pub fn normalize_local(
    provider: &str,
    predictions: &[Prediction],
) -> Result<ClassificationOutcome, ProviderError> {
    let top = predictions
        .iter()
        .fold(None::<&Prediction>, |acc, p| match acc {
            Some(a) if p.probability <= a.probability => Some(a),
            _ => Some(p),
        })
        .ok_or_else(|| ProviderError::invalid_response(provider, "model returned no predictions"))?;

    // ImageNet-style class names list synonyms: "tiger, Panthera tigris"
    let label = top
        .class_name
        .split(',')
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or("")
        .to_string();
    let (confidence, boosted) = boosted_local_confidence(&label, top.probability);

    Ok(ClassificationOutcome::new(label, confidence, provider).with_metadata(json!({
        "rawClass": top.class_name,
        "boosted": boosted,
    })))
}

/// Dispatch a JSON body to the normalizer for `kind`.
pub fn normalize_body(
    kind: ProviderKind,
    provider: &str,
    body: &Value,
) -> Result<ClassificationOutcome, ProviderError> {
    match kind {
        ProviderKind::Vision => normalize_vision(provider, body),
        ProviderKind::Rekognition => normalize_rekognition(provider, body),
        ProviderKind::Taxonomy => normalize_taxonomy(provider, body),
        ProviderKind::Local => {
            let predictions: Vec<Prediction> = serde_json::from_value(body.clone())
                .map_err(|e| ProviderError::invalid_response(provider, e.to_string()))?;
            normalize_local(provider, &predictions)
        }
    }
}
