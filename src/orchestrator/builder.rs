use super::{Classifier, RegisteredProvider};
use crate::fallback::EmergencyFallback;
use crate::providers::{ClassificationProvider, LocalInferenceProvider, LocalModel, ProviderDescriptor};
use crate::resilience::{
    system_clock, Clock, HealthConfig, HealthRegistry, DEFAULT_COOLDOWN, MAX_COOLDOWN,
};
use crate::telemetry::{noop_sink, EventSink, MetricsRecorder};
use crate::types::DEFAULT_MAX_IMAGE_BYTES;
use crate::{Error, ErrorContext, Result};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(15);

pub(crate) const PROVIDER_TIMEOUT_ENV: &str = "WILDID_PROVIDER_TIMEOUT_MS";

pub(crate) fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|s| s.trim().parse::<u64>().ok())
}

/// Explicit value, then `env_ms`, then [`DEFAULT_PROVIDER_TIMEOUT`].
pub(crate) fn resolve_provider_timeout(explicit: Option<Duration>, env_ms: Option<u64>) -> Duration {
    explicit
        .or_else(|| env_ms.map(Duration::from_millis))
        .unwrap_or(DEFAULT_PROVIDER_TIMEOUT)
}

/// Builder for [`Classifier`].
///
/// Unset knobs fall back to `WILDID_COOLDOWN_SECS`,
/// `WILDID_PROVIDER_TIMEOUT_MS` and `WILDID_MAX_IMAGE_BYTES`, then to the
/// built-in defaults.
pub struct ClassifierBuilder {
    providers: Vec<(ProviderDescriptor, Arc<dyn ClassificationProvider>)>,
    cooldown: Option<Duration>,
    provider_timeout: Option<Duration>,
    max_image_bytes: Option<usize>,
    clock: Option<Arc<dyn Clock>>,
    events: Arc<dyn EventSink>,
    fallback: EmergencyFallback,
}

impl ClassifierBuilder {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            cooldown: None,
            provider_timeout: None,
            max_image_bytes: None,
            clock: None,
            events: noop_sink(),
            fallback: EmergencyFallback::new(),
        }
    }

    /// Register a provider together with its descriptor.
    pub fn provider<P>(self, descriptor: ProviderDescriptor, adapter: P) -> Self
    where
        P: ClassificationProvider + 'static,
    {
        self.shared_provider(descriptor, Arc::new(adapter))
    }

    pub fn shared_provider(
        mut self,
        descriptor: ProviderDescriptor,
        adapter: Arc<dyn ClassificationProvider>,
    ) -> Self {
        self.providers.push((descriptor, adapter));
        self
    }

    /// Register an in-process model under the descriptor's name.
    pub fn local_model<M>(self, descriptor: ProviderDescriptor, model: M) -> Self
    where
        M: LocalModel + 'static,
    {
        let adapter = LocalInferenceProvider::new(descriptor.name.clone(), model);
        self.provider(descriptor, adapter)
    }

    /// How long a failed provider stays excluded.
    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    /// Upper bound for a single provider call.
    pub fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = Some(timeout);
        self
    }

    pub fn max_image_bytes(mut self, max: usize) -> Self {
        self.max_image_bytes = Some(max);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    pub fn fallback(mut self, fallback: EmergencyFallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn build(self) -> Result<Classifier> {
        if self.providers.is_empty() {
            return Err(Error::configuration_with_context(
                "at least one provider must be configured",
                ErrorContext::new()
                    .with_field_path("providers")
                    .with_source("classifier_builder"),
            ));
        }

        let mut seen = HashSet::new();
        for (i, (descriptor, _)) in self.providers.iter().enumerate() {
            descriptor.validate(i)?;
            if !seen.insert(descriptor.name.as_str()) {
                return Err(Error::configuration_with_context(
                    format!("duplicate provider name '{}'", descriptor.name),
                    ErrorContext::new()
                        .with_field_path(format!("providers[{}].name", i))
                        .with_source("classifier_builder"),
                ));
            }
        }

        let cooldown = self
            .cooldown
            .or_else(|| env_u64("WILDID_COOLDOWN_SECS").map(Duration::from_secs))
            .unwrap_or(DEFAULT_COOLDOWN);
        if cooldown > MAX_COOLDOWN {
            return Err(Error::configuration_with_context(
                format!(
                    "cooldown of {}s exceeds the maximum of {}s",
                    cooldown.as_secs(),
                    MAX_COOLDOWN.as_secs()
                ),
                ErrorContext::new()
                    .with_field_path("cooldown")
                    .with_source("classifier_builder"),
            ));
        }
        let provider_timeout =
            resolve_provider_timeout(self.provider_timeout, env_u64(PROVIDER_TIMEOUT_ENV));
        if provider_timeout.is_zero() {
            return Err(Error::configuration_with_context(
                "provider timeout must be greater than zero",
                ErrorContext::new()
                    .with_field_path("provider_timeout")
                    .with_source("classifier_builder"),
            ));
        }
        let max_image_bytes = self
            .max_image_bytes
            .or_else(|| env_u64("WILDID_MAX_IMAGE_BYTES").map(|n| n as usize))
            .unwrap_or(DEFAULT_MAX_IMAGE_BYTES);
        if max_image_bytes == 0 {
            return Err(Error::configuration_with_context(
                "max_image_bytes must be greater than zero",
                ErrorContext::new()
                    .with_field_path("max_image_bytes")
                    .with_source("classifier_builder"),
            ));
        }

        let clock = self.clock.unwrap_or_else(system_clock);
        let health = Arc::new(HealthRegistry::with_clock(
            HealthConfig::new().with_cooldown(cooldown),
            clock.clone(),
        ));
        let metrics = Arc::new(MetricsRecorder::with_clock(clock.clone()));

        let mut providers: Vec<RegisteredProvider> = self
            .providers
            .into_iter()
            .map(|(descriptor, adapter)| {
                metrics.register(&descriptor.name);
                RegisteredProvider { descriptor, adapter }
            })
            .collect();
        // stable: equal priorities keep registration order
        providers.sort_by_key(|p| p.descriptor.priority);

        tracing::debug!(
            providers = providers.len(),
            cooldown_secs = cooldown.as_secs(),
            timeout_ms = provider_timeout.as_millis() as u64,
            "classifier built"
        );

        Ok(Classifier {
            providers,
            health,
            metrics,
            fallback: self.fallback,
            events: self.events,
            clock,
            provider_timeout,
            max_image_bytes,
        })
    }
}

impl Default for ClassifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}
