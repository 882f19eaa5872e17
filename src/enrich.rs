//! Turns the chosen outcome into the caller-facing [`FinalClassification`].

use crate::types::{
    outcome::sanitize_confidence, ClassificationOutcome, FinalClassification, ResultSource,
    Taxonomy, UNIDENTIFIED_LABEL, UNKNOWN_RANK,
};

/// Appended to a label when no provider supplied a scientific name.
pub const INFERRED_NAME_SUFFIX: &str = "(unverified)";

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn scientific_name_from(outcome: &ClassificationOutcome, taxonomy: Option<&Taxonomy>) -> Option<String> {
    if let Some(name) = outcome.scientific_name.as_deref().and_then(non_empty) {
        return Some(name);
    }
    if let Some(meta) = outcome.metadata.as_ref() {
        for key in ["scientificName", "scientific_name"] {
            if let Some(name) = meta.get(key).and_then(|v| v.as_str()).and_then(non_empty) {
                return Some(name);
            }
        }
    }
    // a binomial species rank doubles as the scientific name
    taxonomy
        .map(|t| t.species.trim())
        .filter(|s| *s != UNKNOWN_RANK && s.contains(' '))
        .map(str::to_string)
}

/// Build the final answer. Never produces an empty label or an out-of-range
/// confidence, and marks synthesized scientific names as inferred.
pub fn enrich(outcome: ClassificationOutcome, source: ResultSource) -> FinalClassification {
    let label = non_empty(&outcome.label).unwrap_or_else(|| UNIDENTIFIED_LABEL.to_string());
    let taxonomy = outcome.taxonomy();

    let (scientific_name, inferred) = match scientific_name_from(&outcome, taxonomy.as_ref()) {
        Some(name) => (name, false),
        None => (format!("{} {}", label, INFERRED_NAME_SUFFIX), true),
    };

    FinalClassification {
        label,
        confidence: sanitize_confidence(outcome.confidence),
        scientific_name: Some(scientific_name),
        taxonomy,
        source,
        scientific_name_inferred: inferred,
    }
}
