use super::clock::{system_clock, Clock};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Default exclusion window after a provider failure.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(300);

/// Longest accepted exclusion window (30 days).
pub const MAX_COOLDOWN: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct HealthConfig {
    pub cooldown: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

impl HealthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionSnapshot {
    pub provider: String,
    /// Remaining exclusion time in ms.
    pub remaining_ms: u64,
}

/// Per-provider circuit breaker with a single failure threshold.
///
/// - One failure excludes the provider for the full cooldown
/// - Expiry is checked lazily on read; there is no timer
/// - No half-open state: the first call after expiry is a normal call
pub struct HealthRegistry {
    cfg: HealthConfig,
    clock: Arc<dyn Clock>,
    excluded_until: Mutex<HashMap<String, Instant>>,
}

impl HealthRegistry {
    pub fn new(cfg: HealthConfig) -> Self {
        Self::with_clock(cfg, system_clock())
    }

    pub fn with_clock(cfg: HealthConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            cfg,
            clock,
            excluded_until: Mutex::new(HashMap::new()),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cfg.cooldown
    }

    fn state(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
        self.excluded_until
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_available(&self, name: &str) -> bool {
        let now = self.clock.now();
        let mut st = self.state();
        match st.get(name) {
            Some(until) if now < *until => false,
            Some(_) => {
                // cooldown expired
                st.remove(name);
                true
            }
            None => true,
        }
    }

    /// Exclude `name` for a full cooldown starting now. Re-marking restarts the window.
    pub fn mark_failed(&self, name: &str) {
        let now = self.clock.now();
        let until = now
            .checked_add(self.cfg.cooldown)
            .or_else(|| now.checked_add(MAX_COOLDOWN))
            .unwrap_or(now);
        self.state().insert(name.to_string(), until);
    }

    /// Clear every exclusion regardless of remaining time.
    pub fn reset(&self) {
        self.state().clear();
    }

    /// Names currently excluded, sorted.
    pub fn list_excluded(&self) -> BTreeSet<String> {
        let now = self.clock.now();
        let mut st = self.state();
        st.retain(|_, until| now < *until);
        st.keys().cloned().collect()
    }

    pub fn snapshot(&self) -> Vec<ExclusionSnapshot> {
        let now = self.clock.now();
        let mut st = self.state();
        st.retain(|_, until| now < *until);
        let mut out: Vec<ExclusionSnapshot> = st
            .iter()
            .map(|(name, until)| ExclusionSnapshot {
                provider: name.clone(),
                remaining_ms: (*until - now).as_millis() as u64,
            })
            .collect();
        out.sort_by(|a, b| a.provider.cmp(&b.provider));
        out
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new(HealthConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::clock::ManualClock;
    use std::thread;

    fn registry(cooldown: Duration) -> (Arc<ManualClock>, HealthRegistry) {
        let clock = Arc::new(ManualClock::new());
        let reg = HealthRegistry::with_clock(
            HealthConfig::new().with_cooldown(cooldown),
            clock.clone(),
        );
        (clock, reg)
    }

    #[test]
    fn test_health_config_defaults() {
        let config = HealthConfig::default();
        assert_eq!(config.cooldown, Duration::from_secs(300));
    }

    #[test]
    fn test_initially_available() {
        let (_, reg) = registry(Duration::from_secs(10));
        assert!(reg.is_available("google-vision"));
        assert!(reg.list_excluded().is_empty());
    }

    #[test]
    fn test_excluded_until_cooldown_elapses() {
        let (clock, reg) = registry(Duration::from_secs(10));
        reg.mark_failed("google-vision");
        assert!(!reg.is_available("google-vision"));

        clock.advance(Duration::from_millis(9_999));
        assert!(!reg.is_available("google-vision"));

        clock.advance(Duration::from_millis(1));
        assert!(reg.is_available("google-vision"));
        assert!(reg.list_excluded().is_empty());
    }

    #[test]
    fn test_refailure_restarts_window() {
        let (clock, reg) = registry(Duration::from_secs(10));
        reg.mark_failed("aws");
        clock.advance(Duration::from_secs(8));
        reg.mark_failed("aws");
        clock.advance(Duration::from_secs(8));
        assert!(!reg.is_available("aws"));
        clock.advance(Duration::from_secs(2));
        assert!(reg.is_available("aws"));
    }

    #[test]
    fn test_reset_clears_everything() {
        let (_, reg) = registry(Duration::from_secs(300));
        reg.mark_failed("a");
        reg.mark_failed("b");
        assert_eq!(reg.list_excluded().len(), 2);
        reg.reset();
        assert!(reg.is_available("a"));
        assert!(reg.is_available("b"));
    }

    #[test]
    fn test_snapshot_reports_remaining() {
        let (clock, reg) = registry(Duration::from_secs(30));
        reg.mark_failed("b");
        clock.advance(Duration::from_secs(10));
        reg.mark_failed("a");
        let snap = reg.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].provider, "a");
        assert_eq!(snap[0].remaining_ms, 30_000);
        assert_eq!(snap[1].remaining_ms, 20_000);
    }

    #[test]
    fn test_oversized_cooldown_saturates() {
        let (clock, reg) = registry(Duration::MAX);
        reg.mark_failed("vision");
        assert!(!reg.is_available("vision"));
        clock.advance(MAX_COOLDOWN);
        assert!(reg.is_available("vision"));
    }

    #[test]
    fn test_thread_safe_marking() {
        let reg = Arc::new(HealthRegistry::default());
        let mut handles = vec![];
        for i in 0..8 {
            let reg = Arc::clone(&reg);
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    reg.mark_failed(&format!("p{}", i % 4));
                    let _ = reg.is_available("p0");
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(reg.list_excluded().len(), 4);
    }
}
