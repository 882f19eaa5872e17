//! YAML engine configuration.
//!
//! ```yaml
//! cooldown_secs: 300
//! provider_timeout_ms: 15000
//! providers:
//!   - name: google-vision
//!     kind: vision
//!     priority: 1
//!     min_confidence: 0.75
//!     weight: 0.3
//!     endpoint: https://vision.googleapis.com/v1/images:annotate
//!     api_key_env: GOOGLE_VISION_API_KEY
//! ```
//!
//! Credentials never live in the file; `api_key_env` names the environment
//! variable read when the classifier is built.

use crate::orchestrator::{env_u64, resolve_provider_timeout, ClassifierBuilder, PROVIDER_TIMEOUT_ENV};
use crate::providers::{HttpProvider, HttpProviderConfig, ProviderDescriptor, ProviderKind};
use crate::resilience::MAX_COOLDOWN;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use url::Url;

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    pub name: String,
    pub kind: ProviderKind,
    pub priority: i32,
    pub min_confidence: f64,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl ProviderConfig {
    pub fn descriptor(&self) -> ProviderDescriptor {
        ProviderDescriptor::new(&self.name, self.priority, self.min_confidence, self.weight)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_image_bytes: Option<usize>,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl EngineConfig {
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::configuration_with_context(
                format!("failed to read config: {}", e),
                ErrorContext::new()
                    .with_details(path.to_string_lossy().to_string())
                    .with_source("config_loader"),
            )
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            return Err(Error::configuration_with_context(
                "config lists no providers",
                ErrorContext::new()
                    .with_field_path("providers")
                    .with_source("config_loader"),
            ));
        }
        if self.provider_timeout_ms == Some(0) {
            return Err(Error::configuration_with_context(
                "provider_timeout_ms must be greater than zero",
                ErrorContext::new()
                    .with_field_path("provider_timeout_ms")
                    .with_source("config_loader"),
            ));
        }

        if let Some(secs) = self.cooldown_secs {
            if secs > MAX_COOLDOWN.as_secs() {
                return Err(Error::configuration_with_context(
                    format!(
                        "cooldown_secs {} exceeds the maximum of {}",
                        secs,
                        MAX_COOLDOWN.as_secs()
                    ),
                    ErrorContext::new()
                        .with_field_path("cooldown_secs")
                        .with_source("config_loader"),
                ));
            }
        }

        let mut names = HashSet::new();
        for (i, p) in self.providers.iter().enumerate() {
            p.descriptor().validate(i)?;
            if !names.insert(p.name.as_str()) {
                return Err(Error::configuration_with_context(
                    format!("duplicate provider name '{}'", p.name),
                    ErrorContext::new()
                        .with_field_path(format!("providers[{}].name", i))
                        .with_source("config_loader"),
                ));
            }
            if p.kind.is_remote() {
                endpoint_url(p, i)?;
            }
        }
        Ok(())
    }

    /// Descriptors of `local` entries. Their models are attached with
    /// [`ClassifierBuilder::local_model`].
    pub fn local_descriptors(&self) -> Vec<ProviderDescriptor> {
        self.providers
            .iter()
            .filter(|p| !p.kind.is_remote())
            .map(ProviderConfig::descriptor)
            .collect()
    }

    /// Timeout shared by the classifier and every HTTP client, with
    /// `WILDID_PROVIDER_TIMEOUT_MS` applied when the file sets none.
    pub fn provider_timeout(&self) -> Duration {
        self.provider_timeout_with_env(env_u64(PROVIDER_TIMEOUT_ENV))
    }

    fn provider_timeout_with_env(&self, env_ms: Option<u64>) -> Duration {
        resolve_provider_timeout(self.provider_timeout_ms.map(Duration::from_millis), env_ms)
    }

    fn http_provider(&self, p: &ProviderConfig, index: usize, timeout: Duration) -> Result<HttpProvider> {
        let mut http = HttpProviderConfig::new(&p.name, p.kind, endpoint_url(p, index)?)
            .with_timeout(timeout);
        if let Some(var) = p.api_key_env.as_deref() {
            match std::env::var(var) {
                Ok(key) if !key.trim().is_empty() => http = http.with_api_key(key),
                _ => tracing::warn!(
                    provider = %p.name,
                    env = var,
                    "API key variable is not set; provider will likely fail authentication"
                ),
            }
        }
        HttpProvider::new(http)
    }

    /// A builder preloaded with every remote provider and the engine knobs.
    pub fn into_builder(self) -> Result<ClassifierBuilder> {
        self.validate()?;
        let timeout = self.provider_timeout();

        let mut builder = ClassifierBuilder::new().provider_timeout(timeout);
        if let Some(secs) = self.cooldown_secs {
            builder = builder.cooldown(Duration::from_secs(secs));
        }
        if let Some(max) = self.max_image_bytes {
            builder = builder.max_image_bytes(max);
        }

        for (i, p) in self.providers.iter().enumerate() {
            if !p.kind.is_remote() {
                tracing::debug!(provider = %p.name, "local provider awaits a model");
                continue;
            }
            let http = self.http_provider(p, i, timeout)?;
            builder = builder.provider(p.descriptor(), http);
        }
        Ok(builder)
    }
}

fn endpoint_url(p: &ProviderConfig, index: usize) -> Result<Url> {
    let field = format!("providers[{}].endpoint", index);
    let raw = p.endpoint.as_deref().ok_or_else(|| {
        Error::configuration_with_context(
            format!("remote provider '{}' needs an endpoint", p.name),
            ErrorContext::new()
                .with_field_path(field.clone())
                .with_source("config_loader"),
        )
    })?;
    let url = Url::parse(raw).map_err(|e| {
        Error::configuration_with_context(
            format!("invalid endpoint for '{}': {}", p.name, e),
            ErrorContext::new()
                .with_field_path(field.clone())
                .with_details(raw.to_string())
                .with_source("config_loader"),
        )
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::configuration_with_context(
            format!("endpoint for '{}' must use http or https", p.name),
            ErrorContext::new()
                .with_field_path(field)
                .with_details(raw.to_string())
                .with_source("config_loader"),
        ));
    }
    Ok(url)
}
