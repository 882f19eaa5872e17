use serde::{Deserialize, Serialize};

/// Placeholder used for taxonomic ranks a provider did not report.
pub const UNKNOWN_RANK: &str = "Unknown";

/// Linnaean classification attached to a result.
///
/// Ranks a provider does not report are filled with [`UNKNOWN_RANK`] so the
/// serialized shape is always complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    #[serde(default = "unknown_rank")]
    pub kingdom: String,
    #[serde(default = "unknown_rank")]
    pub phylum: String,
    #[serde(default = "unknown_rank")]
    pub class: String,
    #[serde(default = "unknown_rank")]
    pub order: String,
    #[serde(default = "unknown_rank")]
    pub family: String,
    #[serde(default = "unknown_rank")]
    pub genus: String,
    #[serde(default = "unknown_rank")]
    pub species: String,
}

fn unknown_rank() -> String {
    UNKNOWN_RANK.to_string()
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self {
            kingdom: unknown_rank(),
            phylum: unknown_rank(),
            class: unknown_rank(),
            order: unknown_rank(),
            family: unknown_rank(),
            genus: unknown_rank(),
            species: unknown_rank(),
        }
    }
}

impl Taxonomy {
    /// Set a rank by its lowercase name. Unrecognised ranks are ignored.
    pub fn set_rank(&mut self, rank: &str, name: impl Into<String>) -> bool {
        let slot = match rank {
            "kingdom" => &mut self.kingdom,
            "phylum" => &mut self.phylum,
            "class" => &mut self.class,
            "order" => &mut self.order,
            "family" => &mut self.family,
            "genus" => &mut self.genus,
            "species" => &mut self.species,
            _ => return false,
        };
        *slot = name.into();
        true
    }

    /// True when no rank carries real information.
    pub fn is_empty(&self) -> bool {
        [
            &self.kingdom,
            &self.phylum,
            &self.class,
            &self.order,
            &self.family,
            &self.genus,
            &self.species,
        ]
        .iter()
        .all(|r| r.is_empty() || r.as_str() == UNKNOWN_RANK)
    }
}

/// Normalized result of a single provider call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationOutcome {
    /// Free-text species guess, as the provider spelled it.
    pub label: String,
    /// Provider confidence in [0, 1].
    pub confidence: f64,
    pub source_provider_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scientific_name: Option<String>,
    /// Opaque provider data. A `taxonomy` key, when present, is read during enrichment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ClassificationOutcome {
    pub fn new(label: impl Into<String>, confidence: f64, source: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            confidence,
            source_provider_name: source.into(),
            scientific_name: None,
            metadata: None,
        }
    }

    pub fn with_scientific_name(mut self, name: impl Into<String>) -> Self {
        self.scientific_name = Some(name.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_taxonomy(mut self, taxonomy: &Taxonomy) -> Self {
        let value = serde_json::to_value(taxonomy).unwrap_or(serde_json::Value::Null);
        match self.metadata {
            Some(serde_json::Value::Object(ref mut map)) => {
                map.insert("taxonomy".to_string(), value);
            }
            _ => {
                self.metadata = Some(serde_json::json!({ "taxonomy": value }));
            }
        }
        self
    }

    /// Clamp confidence into [0, 1]; NaN becomes 0.
    pub(crate) fn sanitized(mut self, source: &str) -> Self {
        self.confidence = sanitize_confidence(self.confidence);
        if self.source_provider_name != source {
            self.source_provider_name = source.to_string();
        }
        self
    }

    /// Taxonomy carried in `metadata.taxonomy`, if any.
    pub fn taxonomy(&self) -> Option<Taxonomy> {
        let raw = self.metadata.as_ref()?.get("taxonomy")?;
        let taxonomy: Taxonomy = serde_json::from_value(raw.clone()).ok()?;
        (!taxonomy.is_empty()).then_some(taxonomy)
    }
}

pub(crate) fn sanitize_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitized_clamps_and_retags() {
        let o = ClassificationOutcome::new("Tiger", 1.7, "whatever").sanitized("google-vision");
        assert_eq!(o.confidence, 1.0);
        assert_eq!(o.source_provider_name, "google-vision");

        let nan = ClassificationOutcome::new("Tiger", f64::NAN, "x").sanitized("x");
        assert_eq!(nan.confidence, 0.0);
    }

    #[test]
    fn test_taxonomy_from_metadata() {
        let o = ClassificationOutcome::new("Tiger", 0.9, "inat").with_metadata(json!({
            "taxonomy": {"kingdom": "Animalia", "genus": "Panthera", "species": "Panthera tigris"}
        }));
        let t = o.taxonomy().unwrap();
        assert_eq!(t.kingdom, "Animalia");
        assert_eq!(t.phylum, UNKNOWN_RANK);
        assert_eq!(t.species, "Panthera tigris");
    }

    #[test]
    fn test_with_taxonomy_merges_into_existing_metadata() {
        let mut t = Taxonomy::default();
        t.set_rank("family", "Felidae");
        let o = ClassificationOutcome::new("Lion", 0.8, "p")
            .with_metadata(json!({"labels": ["Lion", "Big cat"]}))
            .with_taxonomy(&t);
        let meta = o.metadata.as_ref().unwrap();
        assert!(meta.get("labels").is_some());
        assert_eq!(o.taxonomy().unwrap().family, "Felidae");
    }

    #[test]
    fn test_empty_taxonomy_is_ignored() {
        let o = ClassificationOutcome::new("Lion", 0.8, "p").with_metadata(json!({"taxonomy": {}}));
        assert!(o.taxonomy().is_none());
    }
}
