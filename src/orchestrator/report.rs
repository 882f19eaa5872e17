use super::policy::FallbackReason;
use crate::providers::ProviderErrorKind;
use crate::types::FinalClassification;
use serde::Serialize;

/// Which branch of the failover state machine produced the answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClassificationPath {
    ShortCircuit { provider: String },
    Ensemble { group_size: usize, weighted_score: f64 },
    SingleOutcome { provider: String },
    EmergencyFallback { reason: FallbackReason },
}

impl ClassificationPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShortCircuit { .. } => "short_circuit",
            Self::Ensemble { .. } => "ensemble",
            Self::SingleOutcome { .. } => "single_outcome",
            Self::EmergencyFallback { .. } => "emergency_fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptStatus {
    Succeeded { confidence: f64, threshold_met: bool },
    Failed { kind: ProviderErrorKind, message: String },
}

/// One provider call made while serving a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptRecord {
    pub provider: String,
    pub priority: i32,
    #[serde(flatten)]
    pub status: AttemptStatus,
    pub duration_ms: u64,
}

impl AttemptRecord {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, AttemptStatus::Succeeded { .. })
    }
}

/// Everything that happened while classifying one image.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub request_id: String,
    pub result: FinalClassification,
    pub path: ClassificationPath,
    /// Calls in the order they were made.
    pub attempts: Vec<AttemptRecord>,
    /// Providers passed over because they were excluded.
    pub skipped: Vec<String>,
    pub duration_ms: u64,
}

impl ClassificationReport {
    pub fn failed_attempts(&self) -> usize {
        self.attempts.iter().filter(|a| !a.succeeded()).count()
    }

    pub fn was_called(&self, provider: &str) -> bool {
        self.attempts.iter().any(|a| a.provider == provider)
    }
}
