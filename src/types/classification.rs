use super::outcome::Taxonomy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label used whenever nothing better than an empty guess exists.
pub const UNIDENTIFIED_LABEL: &str = "unidentified";

/// Results below this confidence should be presented as uncertain.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Where a final answer came from.
///
/// Serialized as a plain string: the provider name, `"ensemble"` or `"fallback"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResultSource {
    Provider(String),
    Ensemble,
    Fallback,
}

impl ResultSource {
    pub const ENSEMBLE_TAG: &'static str = "ensemble";
    pub const FALLBACK_TAG: &'static str = "fallback";

    pub fn as_str(&self) -> &str {
        match self {
            Self::Provider(name) => name.as_str(),
            Self::Ensemble => Self::ENSEMBLE_TAG,
            Self::Fallback => Self::FALLBACK_TAG,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback)
    }
}

impl fmt::Display for ResultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ResultSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResultSource {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            Self::ENSEMBLE_TAG => Self::Ensemble,
            Self::FALLBACK_TAG => Self::Fallback,
            _ => Self::Provider(raw),
        })
    }
}

/// The single answer produced for every classification request.
///
/// Invariants: `confidence` is within [0, 1] and `label` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalClassification {
    pub label: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scientific_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxonomy: Option<Taxonomy>,
    pub source: ResultSource,
    /// True when `scientific_name` is a placeholder rather than provider data.
    #[serde(default)]
    pub scientific_name_inferred: bool,
}

impl FinalClassification {
    pub fn is_low_confidence(&self) -> bool {
        self.confidence < LOW_CONFIDENCE_THRESHOLD
    }

    pub fn is_fallback(&self) -> bool {
        self.source.is_fallback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialized_shape() {
        let result = FinalClassification {
            label: "Tiger".into(),
            confidence: 0.91,
            scientific_name: Some("Panthera tigris".into()),
            taxonomy: None,
            source: ResultSource::Provider("inaturalist".into()),
            scientific_name_inferred: false,
        };
        let v = serde_json::to_value(&result).unwrap();
        assert_eq!(
            v,
            json!({
                "label": "Tiger",
                "confidence": 0.91,
                "scientificName": "Panthera tigris",
                "source": "inaturalist",
                "scientificNameInferred": false
            })
        );
    }

    #[test]
    fn test_source_roundtrip_tags() {
        let parsed: ResultSource = serde_json::from_value(json!("ensemble")).unwrap();
        assert_eq!(parsed, ResultSource::Ensemble);
        let parsed: ResultSource = serde_json::from_value(json!("fallback")).unwrap();
        assert!(parsed.is_fallback());
        let parsed: ResultSource = serde_json::from_value(json!("local-model")).unwrap();
        assert_eq!(parsed.as_str(), "local-model");
    }

    #[test]
    fn test_low_confidence_flag() {
        let mut r = FinalClassification {
            label: "Fox".into(),
            confidence: 0.59,
            scientific_name: None,
            taxonomy: None,
            source: ResultSource::Ensemble,
            scientific_name_inferred: false,
        };
        assert!(r.is_low_confidence());
        r.confidence = 0.6;
        assert!(!r.is_low_confidence());
    }
}
