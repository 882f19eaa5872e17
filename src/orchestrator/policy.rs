use crate::ensemble::{self, EnsembleDecision, WeightedOutcome};
use crate::providers::ProviderDescriptor;
use crate::types::ClassificationOutcome;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What to do after a provider answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    /// The provider met its own threshold; stop trying.
    ShortCircuit,
    /// Keep the outcome for voting and try the next provider.
    Continue,
}

pub(crate) fn after_success(outcome: &ClassificationOutcome, descriptor: &ProviderDescriptor) -> Decision {
    if outcome.confidence >= descriptor.min_confidence {
        Decision::ShortCircuit
    } else {
        Decision::Continue
    }
}

/// Why the emergency fallback answered instead of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Every provider was excluded before the request started.
    NoProvidersAvailable,
    /// Every attempted provider failed.
    AllProvidersFailed,
    /// Outcomes were collected but no group earned a positive score.
    NoQualifyingGroup,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoProvidersAvailable => "no_providers_available",
            Self::AllProvidersFailed => "all_providers_failed",
            Self::NoQualifyingGroup => "no_qualifying_group",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a request without a short-circuit is settled.
#[derive(Debug, Clone)]
pub(crate) enum Resolution {
    Ensemble(EnsembleDecision),
    Single(ClassificationOutcome),
    Fallback(FallbackReason),
}

pub(crate) fn resolve(mut collected: Vec<WeightedOutcome>, attempted_any: bool) -> Resolution {
    match collected.len() {
        0 if attempted_any => Resolution::Fallback(FallbackReason::AllProvidersFailed),
        0 => Resolution::Fallback(FallbackReason::NoProvidersAvailable),
        1 => match collected.pop() {
            Some(only) => Resolution::Single(only.outcome),
            None => Resolution::Fallback(FallbackReason::AllProvidersFailed),
        },
        _ => match ensemble::score(&collected) {
            Some(decision) => Resolution::Ensemble(decision),
            None => Resolution::Fallback(FallbackReason::NoQualifyingGroup),
        },
    }
}
