use super::normalize::normalize_body;
use super::{ClassificationProvider, ProviderError, ProviderKind};
use crate::types::{ClassificationOutcome, ImagePayload};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use base64::Engine as _;
use reqwest::{multipart, Proxy};
use serde_json::json;
use std::env;
use std::time::Duration;
use url::Url;

/// Maximum labels requested from vendors that support a cap.
const MAX_LABELS: u32 = 10;

/// Connection settings for one remote provider.
#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    pub name: String,
    pub kind: ProviderKind,
    pub endpoint: Url,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl HttpProviderConfig {
    pub fn new(name: impl Into<String>, kind: ProviderKind, endpoint: Url) -> Self {
        Self {
            name: name.into(),
            kind,
            endpoint,
            api_key: None,
            timeout: Duration::from_secs(15),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A provider reached over HTTPS. The request shape and the normalizer are
/// chosen from [`ProviderKind`].
pub struct HttpProvider {
    name: String,
    kind: ProviderKind,
    endpoint: Url,
    api_key: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvider")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl HttpProvider {
    pub fn new(config: HttpProviderConfig) -> Result<Self> {
        if !config.kind.is_remote() {
            return Err(Error::configuration_with_context(
                format!("provider '{}' of kind '{}' is not an HTTP provider", config.name, config.kind),
                ErrorContext::new()
                    .with_field_path("kind")
                    .with_source("http_provider"),
            ));
        }

        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(
                env::var("WILDID_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(8),
            )
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Ok(proxy_url) = env::var("WILDID_PROXY_URL") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        let client = builder.build().map_err(|e| {
            Error::configuration_with_context(
                format!("failed to build HTTP client for '{}': {}", config.name, e),
                ErrorContext::new().with_source("http_provider"),
            )
        })?;

        Ok(Self {
            name: config.name,
            kind: config.kind,
            endpoint: config.endpoint,
            api_key: config.api_key,
            timeout: config.timeout,
            client,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn request(
        &self,
        image: &ImagePayload,
    ) -> std::result::Result<reqwest::RequestBuilder, ProviderError> {
        let req = self.client.post(self.endpoint.clone());
        let req = match self.kind {
            ProviderKind::Vision => {
                let content = base64::engine::general_purpose::STANDARD.encode(&image.bytes);
                req.json(&json!({
                    "requests": [{
                        "image": { "content": content },
                        "features": [{ "type": "LABEL_DETECTION", "maxResults": MAX_LABELS }]
                    }]
                }))
            }
            ProviderKind::Rekognition => {
                let content = base64::engine::general_purpose::STANDARD.encode(&image.bytes);
                req.json(&json!({
                    "Image": { "Bytes": content },
                    "MaxLabels": MAX_LABELS,
                    "MinConfidence": 50
                }))
            }
            ProviderKind::Taxonomy => {
                let mime = image
                    .format()
                    .map(|f| f.mime_type())
                    .unwrap_or("application/octet-stream");
                let file_name = image
                    .file_name
                    .clone()
                    .unwrap_or_else(|| "upload".to_string());
                let part = multipart::Part::bytes(image.bytes.to_vec())
                    .file_name(file_name)
                    .mime_str(mime)
                    .map_err(|e| ProviderError::from_transport(&self.name, &e))?;
                req.multipart(multipart::Form::new().part("image", part))
            }
            ProviderKind::Local => {
                return Err(ProviderError::new(
                    &self.name,
                    super::ProviderErrorKind::Unknown,
                    "local providers are not reachable over HTTP",
                ))
            }
        };
        Ok(match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        })
    }
}

#[async_trait]
impl ClassificationProvider for HttpProvider {
    async fn classify(
        &self,
        image: &ImagePayload,
    ) -> std::result::Result<ClassificationOutcome, ProviderError> {
        let resp = self
            .request(image)?
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&self.name, &e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(&self.name, status.as_u16(), body));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(&self.name, e.to_string()))?;
        normalize_body(self.kind, &self.name, &body)
    }
}
