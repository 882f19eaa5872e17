//! Per-provider call accounting.

use crate::resilience::{system_clock, Clock, HealthRegistry};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

/// Raw counters for one provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetrics {
    pub calls: u64,
    pub successes: u64,
    /// Smoothed as `(previous + confidence) / 2` on each success, starting from 0.
    pub running_average_confidence: f64,
    /// Unix ms of the most recent call attempt.
    pub last_used_at: Option<u64>,
}

impl ProviderMetrics {
    /// Success percentage in [0, 100]; 0 when there were no calls.
    pub fn success_rate(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.successes as f64 / self.calls as f64 * 100.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Active,
    Excluded,
}

/// Row of the observability panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetricsSummary {
    pub success_rate: f64,
    pub calls: u64,
    pub avg_confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<u64>,
    pub status: ProviderStatus,
}

/// Shared, lock-protected metrics for every provider.
///
/// Concurrent requests may update the same provider; each update is a single
/// read-modify-write under the lock.
pub struct MetricsRecorder {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, ProviderMetrics>>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, ProviderMetrics>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make a provider visible in summaries before its first call.
    pub fn register(&self, provider: &str) {
        self.entries().entry(provider.to_string()).or_default();
    }

    pub fn record(&self, provider: &str, success: bool, confidence: f64) {
        let now = self.clock.unix_millis();
        let mut entries = self.entries();
        let m = entries.entry(provider.to_string()).or_default();
        m.calls = m.calls.saturating_add(1);
        if success {
            m.successes = m.successes.saturating_add(1);
            m.running_average_confidence = (m.running_average_confidence + confidence) / 2.0;
        }
        m.last_used_at = Some(now);
    }

    pub fn get(&self, provider: &str) -> Option<ProviderMetrics> {
        self.entries().get(provider).cloned()
    }

    pub fn summary(&self, health: &HealthRegistry) -> BTreeMap<String, ProviderMetricsSummary> {
        let snapshot: Vec<(String, ProviderMetrics)> = self
            .entries()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        // health lock is taken after the metrics lock is released
        snapshot
            .into_iter()
            .map(|(name, m)| {
                let status = if health.is_available(&name) {
                    ProviderStatus::Active
                } else {
                    ProviderStatus::Excluded
                };
                let row = ProviderMetricsSummary {
                    success_rate: m.success_rate(),
                    calls: m.calls,
                    avg_confidence: m.running_average_confidence,
                    last_used: m.last_used_at,
                    status,
                };
                (name, row)
            })
            .collect()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::{HealthConfig, ManualClock};
    use std::time::Duration;

    #[test]
    fn test_success_rate_without_calls_is_zero() {
        let m = ProviderMetrics::default();
        assert_eq!(m.success_rate(), 0.0);
    }

    #[test]
    fn test_running_average_smoothing() {
        let rec = MetricsRecorder::new();
        rec.record("p", true, 0.8);
        assert!((rec.get("p").unwrap().running_average_confidence - 0.4).abs() < 1e-12);
        rec.record("p", true, 0.6);
        assert!((rec.get("p").unwrap().running_average_confidence - 0.5).abs() < 1e-12);
        // failures leave the average alone
        rec.record("p", false, 0.0);
        let m = rec.get("p").unwrap();
        assert!((m.running_average_confidence - 0.5).abs() < 1e-12);
        assert_eq!(m.calls, 3);
        assert_eq!(m.successes, 2);
    }

    #[test]
    fn test_last_used_tracks_every_attempt() {
        let clock = Arc::new(ManualClock::new());
        let rec = MetricsRecorder::with_clock(clock.clone());
        rec.record("p", true, 0.9);
        let first = rec.get("p").unwrap().last_used_at.unwrap();
        clock.advance(Duration::from_millis(250));
        rec.record("p", false, 0.0);
        assert_eq!(rec.get("p").unwrap().last_used_at.unwrap(), first + 250);
    }

    #[test]
    fn test_summary_status_follows_health() {
        let rec = MetricsRecorder::new();
        let health = HealthRegistry::new(HealthConfig::default());
        rec.register("a");
        rec.register("b");
        rec.record("b", false, 0.0);
        health.mark_failed("b");

        let summary = rec.summary(&health);
        assert_eq!(summary["a"].status, ProviderStatus::Active);
        assert_eq!(summary["a"].calls, 0);
        assert!(summary["a"].last_used.is_none());
        assert_eq!(summary["b"].status, ProviderStatus::Excluded);
        assert_eq!(summary["b"].success_rate, 0.0);

        let json = serde_json::to_value(&summary["b"]).unwrap();
        assert_eq!(json["status"], "excluded");
        assert!(json.get("successRate").is_some());
        assert!(json.get("avgConfidence").is_some());
    }
}
