//! 故障转移编排器：按优先级依次调用提供者，短路、集成投票或应急兜底。
//!
//! # Failover Orchestrator
//!
//! One request walks the provider lineup strictly in priority order, one call
//! at a time:
//!
//! ```text
//! Idle → TryingProvider(i) ─┬─ confident ───────────────► ShortCircuit
//!                           └─ exhausted ─┬─ ≥2 outcomes ► Ensemble ─┬─ group ► Ready
//!                                         │                          └─ none ──► EmergencyFallback
//!                                         ├─ 1 outcome ──► SingleOutcome
//!                                         └─ 0 outcomes ─► EmergencyFallback
//! ```
//!
//! Provider failures (including timeouts) are recorded, exclude the provider
//! for the cooldown, and are never returned to the caller. The only errors a
//! well-configured [`Classifier`] returns are `InvalidInput` (rejected before
//! any provider is contacted) and `Cancelled`.

mod batch;
mod builder;
mod policy;
mod report;

pub use batch::DEFAULT_BATCH_CONCURRENCY;
pub use builder::{ClassifierBuilder, DEFAULT_PROVIDER_TIMEOUT};
pub(crate) use builder::{env_u64, resolve_provider_timeout, PROVIDER_TIMEOUT_ENV};
pub use policy::FallbackReason;
pub use report::{AttemptRecord, AttemptStatus, ClassificationPath, ClassificationReport};

use crate::enrich::enrich;
use crate::ensemble::WeightedOutcome;
use crate::fallback::EmergencyFallback;
use crate::providers::{ClassificationProvider, ProviderDescriptor, ProviderError};
use crate::resilience::{Clock, HealthRegistry};
use crate::telemetry::{ClassificationEvent, EventSink, MetricsRecorder, ProviderMetricsSummary};
use crate::types::{ClassificationOutcome, FinalClassification, ImagePayload, ResultSource};
use crate::{Error, Result};
use policy::{Decision, Resolution};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

pub(crate) struct RegisteredProvider {
    pub descriptor: ProviderDescriptor,
    pub adapter: Arc<dyn ClassificationProvider>,
}

/// Multi-provider species classifier.
///
/// Cheap to share behind an `Arc`; concurrent requests only contend on the
/// health and metrics locks.
pub struct Classifier {
    /// Sorted by ascending priority; ties keep registration order.
    providers: Vec<RegisteredProvider>,
    health: Arc<HealthRegistry>,
    metrics: Arc<MetricsRecorder>,
    fallback: EmergencyFallback,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    provider_timeout: Duration,
    max_image_bytes: usize,
}

struct Settled {
    outcome: ClassificationOutcome,
    source: ResultSource,
    path: ClassificationPath,
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

impl Classifier {
    pub fn builder() -> ClassifierBuilder {
        ClassifierBuilder::new()
    }

    /// Classify one image. Always yields a result for a valid image.
    pub async fn classify(&self, image: &ImagePayload) -> Result<FinalClassification> {
        self.run(image, None).await.map(|r| r.result)
    }

    /// Like [`classify`](Self::classify), but stops as soon as `token` is cancelled.
    ///
    /// The in-flight provider call is dropped and the provider is not charged
    /// with a failure.
    pub async fn classify_with_cancel(
        &self,
        image: &ImagePayload,
        token: CancellationToken,
    ) -> Result<FinalClassification> {
        self.run(image, Some(&token)).await.map(|r| r.result)
    }

    /// Classify and return the full trace of what happened.
    pub async fn classify_detailed(&self, image: &ImagePayload) -> Result<ClassificationReport> {
        self.run(image, None).await
    }

    /// Clear every exclusion (the user-triggered "retry failed providers").
    pub fn reset_failed_providers(&self) {
        self.health.reset();
        info!("provider exclusions cleared");
    }

    /// Providers that would be tried right now, in priority order.
    pub fn available_providers(&self) -> Vec<String> {
        self.providers
            .iter()
            .filter(|p| self.health.is_available(&p.descriptor.name))
            .map(|p| p.descriptor.name.clone())
            .collect()
    }

    /// Providers currently excluded, in priority order.
    pub fn failed_providers(&self) -> Vec<String> {
        self.providers
            .iter()
            .filter(|p| !self.health.is_available(&p.descriptor.name))
            .map(|p| p.descriptor.name.clone())
            .collect()
    }

    pub fn metrics_summary(&self) -> BTreeMap<String, ProviderMetricsSummary> {
        self.metrics.summary(&self.health)
    }

    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.providers.iter().map(|p| p.descriptor.clone()).collect()
    }

    pub fn health(&self) -> &Arc<HealthRegistry> {
        &self.health
    }

    pub fn metrics(&self) -> &Arc<MetricsRecorder> {
        &self.metrics
    }

    pub fn provider_timeout(&self) -> Duration {
        self.provider_timeout
    }

    pub fn max_image_bytes(&self) -> usize {
        self.max_image_bytes
    }

    async fn run(
        &self,
        image: &ImagePayload,
        cancel: Option<&CancellationToken>,
    ) -> Result<ClassificationReport> {
        let format = image.validate(self.max_image_bytes)?;
        let request_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("classify", request_id = %request_id);

        async move {
            debug!(
                format = format.as_str(),
                bytes = image.len(),
                fingerprint = %image.fingerprint(),
                "classification started"
            );
            let started = Instant::now();
            let mut attempts: Vec<AttemptRecord> = Vec::new();
            let mut skipped: Vec<String> = Vec::new();
            let mut collected: Vec<WeightedOutcome> = Vec::new();
            let mut short_circuit: Option<ClassificationOutcome> = None;

            for p in &self.providers {
                let name = p.descriptor.name.as_str();
                if cancel.map_or(false, |t| t.is_cancelled()) {
                    info!("classification cancelled");
                    return Err(Error::Cancelled);
                }
                if !self.health.is_available(name) {
                    debug!(provider = name, "skipping excluded provider");
                    skipped.push(name.to_string());
                    continue;
                }

                debug!(provider = name, priority = p.descriptor.priority, "trying provider");
                let attempt_started = Instant::now();
                let call = tokio::time::timeout(self.provider_timeout, p.adapter.classify(image));
                let result = match cancel {
                    Some(token) => tokio::select! {
                        biased;
                        _ = token.cancelled() => {
                            info!(provider = name, "classification cancelled mid-call");
                            return Err(Error::Cancelled);
                        }
                        r = call => r,
                    },
                    None => call.await,
                };
                let result = result
                    .unwrap_or_else(|_elapsed| Err(ProviderError::timeout(name, self.provider_timeout)));

                match result {
                    Ok(outcome) => {
                        let outcome = outcome.sanitized(name);
                        self.metrics.record(name, true, outcome.confidence);
                        let decision = policy::after_success(&outcome, &p.descriptor);
                        attempts.push(AttemptRecord {
                            provider: name.to_string(),
                            priority: p.descriptor.priority,
                            status: AttemptStatus::Succeeded {
                                confidence: outcome.confidence,
                                threshold_met: decision == Decision::ShortCircuit,
                            },
                            duration_ms: elapsed_ms(attempt_started),
                        });
                        debug!(
                            provider = name,
                            label = %outcome.label,
                            confidence = outcome.confidence,
                            min_confidence = p.descriptor.min_confidence,
                            "provider answered"
                        );
                        match decision {
                            Decision::ShortCircuit => {
                                short_circuit = Some(outcome);
                                break;
                            }
                            Decision::Continue => {
                                collected.push(WeightedOutcome::new(outcome, p.descriptor.weight))
                            }
                        }
                    }
                    Err(err) => {
                        warn!(
                            provider = name,
                            kind = %err.kind,
                            error = %err.message,
                            cooldown_secs = self.health.cooldown().as_secs(),
                            "provider failed; excluding"
                        );
                        self.metrics.record(name, false, 0.0);
                        self.health.mark_failed(name);
                        attempts.push(AttemptRecord {
                            provider: name.to_string(),
                            priority: p.descriptor.priority,
                            status: AttemptStatus::Failed {
                                kind: err.kind,
                                message: err.message,
                            },
                            duration_ms: elapsed_ms(attempt_started),
                        });
                    }
                }
            }

            let settled = match short_circuit {
                Some(outcome) => Settled {
                    source: ResultSource::Provider(outcome.source_provider_name.clone()),
                    path: ClassificationPath::ShortCircuit {
                        provider: outcome.source_provider_name.clone(),
                    },
                    outcome,
                },
                None => self.settle(image, collected, !attempts.is_empty()),
            };

            let result = enrich(settled.outcome, settled.source);
            let duration_ms = elapsed_ms(started);
            info!(
                path = settled.path.as_str(),
                source = %result.source,
                label = %result.label,
                confidence = result.confidence,
                attempts = attempts.len(),
                duration_ms,
                "classification finished"
            );

            let report = ClassificationReport {
                request_id,
                result,
                path: settled.path,
                attempts,
                skipped,
                duration_ms,
            };
            self.emit(&report).await;
            Ok(report)
        }
        .instrument(span)
        .await
    }

    fn settle(&self, image: &ImagePayload, collected: Vec<WeightedOutcome>, attempted_any: bool) -> Settled {
        match policy::resolve(collected, attempted_any) {
            Resolution::Ensemble(decision) => Settled {
                path: ClassificationPath::Ensemble {
                    group_size: decision.group_size,
                    weighted_score: decision.weighted_score,
                },
                source: ResultSource::Ensemble,
                outcome: decision.outcome,
            },
            Resolution::Single(outcome) => Settled {
                source: ResultSource::Provider(outcome.source_provider_name.clone()),
                path: ClassificationPath::SingleOutcome {
                    provider: outcome.source_provider_name.clone(),
                },
                outcome,
            },
            Resolution::Fallback(reason) => {
                warn!(%reason, "no usable provider result; using emergency fallback");
                Settled {
                    outcome: self.fallback.classify(image),
                    source: ResultSource::Fallback,
                    path: ClassificationPath::EmergencyFallback { reason },
                }
            }
        }
    }

    async fn emit(&self, report: &ClassificationReport) {
        let event = ClassificationEvent {
            request_id: report.request_id.clone(),
            path: report.path.as_str().to_string(),
            source: report.result.source.to_string(),
            label: report.result.label.clone(),
            confidence: report.result.confidence,
            providers_attempted: report.attempts.len(),
            providers_failed: report.failed_attempts(),
            duration_ms: report.duration_ms,
            timestamp: self.clock.unix_millis(),
        };
        if let Err(e) = self.events.report(event).await {
            warn!(error = %e, "event sink rejected classification event");
        }
    }
}
