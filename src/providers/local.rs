//! In-process inference (e.g. a MobileNet-class model running on the device).
//!
//! The engine does not load models itself; callers plug one in through
//! [`LocalModel`] and the adapter takes care of picking the top prediction,
//! trimming ImageNet-style synonym lists and boosting confirmed wildlife.

use super::normalize::normalize_local;
use super::{ClassificationProvider, ProviderError, ProviderErrorKind};
use crate::types::{ClassificationOutcome, ImagePayload};
use crate::Error;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One class probability from a local model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub class_name: String,
    pub probability: f64,
}

impl Prediction {
    pub fn new(class_name: impl Into<String>, probability: f64) -> Self {
        Self {
            class_name: class_name.into(),
            probability,
        }
    }
}

#[async_trait]
pub trait LocalModel: Send + Sync {
    async fn predict(&self, image: &ImagePayload) -> crate::Result<Vec<Prediction>>;
}

pub struct LocalInferenceProvider<M> {
    name: String,
    model: M,
}

impl<M: LocalModel> LocalInferenceProvider<M> {
    pub fn new(name: impl Into<String>, model: M) -> Self {
        Self {
            name: name.into(),
            model,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl<M: LocalModel> ClassificationProvider for LocalInferenceProvider<M> {
    async fn classify(
        &self,
        image: &ImagePayload,
    ) -> std::result::Result<ClassificationOutcome, ProviderError> {
        let predictions = self.model.predict(image).await.map_err(|e| match e {
            Error::Provider(mut pe) => {
                pe.provider = self.name.clone();
                pe
            }
            other => ProviderError::new(&self.name, ProviderErrorKind::Unknown, other.to_string()),
        })?;
        normalize_local(&self.name, &predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedModel(Vec<Prediction>);

    #[async_trait]
    impl LocalModel for FixedModel {
        async fn predict(&self, _image: &ImagePayload) -> crate::Result<Vec<Prediction>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenModel;

    #[async_trait]
    impl LocalModel for BrokenModel {
        async fn predict(&self, _image: &ImagePayload) -> crate::Result<Vec<Prediction>> {
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "model weights missing",
            )))
        }
    }

    fn jpeg() -> ImagePayload {
        ImagePayload::new(vec![0xFF, 0xD8, 0xFF, 0xE0])
    }

    #[tokio::test]
    async fn test_top_prediction_is_boosted() {
        let provider = LocalInferenceProvider::new(
            "mobilenet",
            FixedModel(vec![
                Prediction::new("timber wolf, grey wolf, gray wolf, Canis lupus", 0.6),
                Prediction::new("Eskimo dog, husky", 0.3),
            ]),
        );
        let o = provider.classify(&jpeg()).await.unwrap();
        assert_eq!(o.label, "timber wolf");
        assert!((o.confidence - 0.72).abs() < 1e-12);
        assert_eq!(o.source_provider_name, "mobilenet");
    }

    #[tokio::test]
    async fn test_model_failure_becomes_provider_error() {
        let provider = LocalInferenceProvider::new("mobilenet", BrokenModel);
        let err = provider.classify(&jpeg()).await.unwrap_err();
        assert_eq!(err.provider, "mobilenet");
        assert_eq!(err.kind, ProviderErrorKind::Unknown);

        let empty = LocalInferenceProvider::new("mobilenet", FixedModel(vec![]));
        let err = empty.classify(&jpeg()).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::InvalidResponse);
    }
}
