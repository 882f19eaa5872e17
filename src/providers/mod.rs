//! 分类提供者：统一的能力接口、静态描述与各厂商适配器。
//!
//! # Classification Providers
//!
//! A provider is anything that can look at an image and guess a species. The
//! engine only sees the [`ClassificationProvider`] capability; each adapter
//! owns the translation from its vendor's wire format into a
//! [`ClassificationOutcome`].
//!
//! | Kind | Adapter | Wire format |
//! |------|---------|-------------|
//! | `vision` | [`HttpProvider`] | label annotations with 0..1 scores |
//! | `rekognition` | [`HttpProvider`] | `Labels` with 0..100 confidence |
//! | `taxonomy` | [`HttpProvider`] | citizen-science taxon suggestions |
//! | `local` | [`LocalInferenceProvider`] | in-process `{className, probability}` predictions |
//!
//! [`ScriptedProvider`] is a deterministic stand-in for tests and demos.

pub mod error;
pub mod http;
pub mod local;
pub mod normalize;
pub mod scripted;

pub use error::{ProviderError, ProviderErrorKind};
pub use http::{HttpProvider, HttpProviderConfig};
pub use local::{LocalInferenceProvider, LocalModel, Prediction};
pub use scripted::ScriptedProvider;

use crate::types::{ClassificationOutcome, ImagePayload};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The one capability the engine needs from a provider.
///
/// Implementations must not have side effects beyond the call itself.
#[async_trait]
pub trait ClassificationProvider: Send + Sync {
    async fn classify(
        &self,
        image: &ImagePayload,
    ) -> std::result::Result<ClassificationOutcome, ProviderError>;
}

/// The closed set of adapter families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Vision,
    Rekognition,
    Taxonomy,
    #[serde(alias = "local_inference")]
    Local,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vision => "vision",
            Self::Rekognition => "rekognition",
            Self::Taxonomy => "taxonomy",
            Self::Local => "local",
        }
    }

    pub fn is_remote(&self) -> bool {
        !matches!(self, Self::Local)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static per-provider configuration, immutable for the life of a classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Unique identifier.
    pub name: String,
    /// Lower is tried first.
    pub priority: i32,
    /// Confidence at or above which this provider's answer ends the search.
    pub min_confidence: f64,
    /// Relative trust during ensemble voting.
    pub weight: f64,
}

impl ProviderDescriptor {
    pub fn new(name: impl Into<String>, priority: i32, min_confidence: f64, weight: f64) -> Self {
        Self {
            name: name.into(),
            priority,
            min_confidence,
            weight,
        }
    }

    /// Validate one descriptor. `index` is used for the error's field path.
    pub fn validate(&self, index: usize) -> Result<()> {
        let field = |f: &str| format!("providers[{}].{}", index, f);
        if self.name.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "provider name must be non-empty",
                ErrorContext::new()
                    .with_field_path(field("name"))
                    .with_source("descriptor_validator"),
            ));
        }
        if !self.min_confidence.is_finite() || !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(Error::configuration_with_context(
                format!("min_confidence must be within [0, 1] for '{}'", self.name),
                ErrorContext::new()
                    .with_field_path(field("min_confidence"))
                    .with_details(format!("got {}", self.min_confidence))
                    .with_source("descriptor_validator"),
            ));
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(Error::configuration_with_context(
                format!("weight must be a non-negative number for '{}'", self.name),
                ErrorContext::new()
                    .with_field_path(field("weight"))
                    .with_details(format!("got {}", self.weight))
                    .with_source("descriptor_validator"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_validation() {
        assert!(ProviderDescriptor::new("google-vision", 1, 0.75, 0.3).validate(0).is_ok());
        assert!(ProviderDescriptor::new("edge", 1, 0.0, 0.0).validate(0).is_ok());
        assert!(ProviderDescriptor::new("edge", 1, 1.0, 2.0).validate(0).is_ok());

        let err = ProviderDescriptor::new(" ", 1, 0.5, 0.3).validate(2).unwrap_err();
        assert_eq!(err.context().unwrap().field_path.as_deref(), Some("providers[2].name"));

        assert!(ProviderDescriptor::new("p", 1, 1.5, 0.3).validate(0).is_err());
        assert!(ProviderDescriptor::new("p", 1, f64::NAN, 0.3).validate(0).is_err());
        assert!(ProviderDescriptor::new("p", 1, 0.5, -0.1).validate(0).is_err());
        assert!(ProviderDescriptor::new("p", 1, 0.5, f64::INFINITY).validate(0).is_err());
    }

    #[test]
    fn test_kind_serde() {
        let k: ProviderKind = serde_json::from_str("\"rekognition\"").unwrap();
        assert_eq!(k, ProviderKind::Rekognition);
        let k: ProviderKind = serde_json::from_str("\"local_inference\"").unwrap();
        assert_eq!(k, ProviderKind::Local);
        assert!(!k.is_remote());
    }
}
