//! 集成投票：把多个提供者的相近结果分组并加权打分。
//!
//! Weighted ensemble voting across providers that disagree.
//!
//! 1. Outcomes are grouped by tolerant label similarity ([`crate::labels`]),
//!    each new group keyed by the normalized label of its first member.
//! 2. A group scores `Σ confidence × provider weight`.
//! 3. The highest score wins; ties keep the group seen first.
//! 4. The winner's most confident member supplies label and metadata.
//! 5. Confidence is `min(mean(member confidence) × 1.1, 0.95)`.

use crate::labels;
use crate::types::{ClassificationOutcome, ResultSource};

/// Multiplier applied to the winning group's mean confidence.
pub const CONSENSUS_BONUS: f64 = 1.1;
/// Ensemble answers never claim more than this.
pub const ENSEMBLE_CONFIDENCE_CAP: f64 = 0.95;

/// A provider outcome paired with that provider's ensemble weight.
#[derive(Debug, Clone)]
pub struct WeightedOutcome {
    pub outcome: ClassificationOutcome,
    pub weight: f64,
}

impl WeightedOutcome {
    pub fn new(outcome: ClassificationOutcome, weight: f64) -> Self {
        Self { outcome, weight }
    }
}

/// Outcomes judged to name the same species.
#[derive(Debug, Clone)]
pub struct LabelGroup {
    pub key: String,
    pub members: Vec<WeightedOutcome>,
    pub weighted_score: f64,
}

impl LabelGroup {
    fn new(key: String, first: WeightedOutcome) -> Self {
        let mut group = Self {
            key,
            members: Vec::new(),
            weighted_score: 0.0,
        };
        group.push(first);
        group
    }

    fn push(&mut self, member: WeightedOutcome) {
        self.weighted_score += member.outcome.confidence * member.weight;
        self.members.push(member);
    }

    /// Member with the highest raw confidence; the earliest wins a tie.
    pub fn representative(&self) -> Option<&ClassificationOutcome> {
        let mut best: Option<&ClassificationOutcome> = None;
        for m in &self.members {
            match best {
                Some(b) if m.outcome.confidence <= b.confidence => {}
                _ => best = Some(&m.outcome),
            }
        }
        best
    }

    pub fn average_confidence(&self) -> f64 {
        if self.members.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.members.iter().map(|m| m.outcome.confidence).sum();
        sum / self.members.len() as f64
    }

    pub fn providers(&self) -> Vec<String> {
        self.members
            .iter()
            .map(|m| m.outcome.source_provider_name.clone())
            .collect()
    }
}

/// Result of a successful ensemble vote.
#[derive(Debug, Clone)]
pub struct EnsembleDecision {
    /// Winning outcome, re-tagged with the `"ensemble"` source.
    pub outcome: ClassificationOutcome,
    pub group_size: usize,
    pub weighted_score: f64,
    pub contributing_providers: Vec<String>,
}

/// Group outcomes in first-seen order.
pub fn group_outcomes(outcomes: &[WeightedOutcome]) -> Vec<LabelGroup> {
    let mut groups: Vec<LabelGroup> = Vec::new();
    for wo in outcomes {
        let key = labels::normalize(&wo.outcome.label);
        match groups.iter_mut().find(|g| labels::are_similar(&g.key, &key)) {
            Some(group) => group.push(wo.clone()),
            None => groups.push(LabelGroup::new(key, wo.clone())),
        }
    }
    groups
}

/// `min(mean × 1.1, 0.95)`.
pub fn ensemble_confidence(average: f64) -> f64 {
    (average * CONSENSUS_BONUS).min(ENSEMBLE_CONFIDENCE_CAP)
}

/// Pick the winning group. `None` when there is nothing to vote on or no
/// group has a positive weighted score.
pub fn score(outcomes: &[WeightedOutcome]) -> Option<EnsembleDecision> {
    let groups = group_outcomes(outcomes);

    let mut winner: Option<&LabelGroup> = None;
    for g in &groups {
        match winner {
            Some(w) if g.weighted_score <= w.weighted_score => {}
            _ => winner = Some(g),
        }
    }
    let winner = winner.filter(|g| g.weighted_score > 0.0)?;
    let representative = winner.representative()?;

    let mut outcome = representative.clone();
    outcome.confidence = ensemble_confidence(winner.average_confidence());
    outcome.source_provider_name = ResultSource::ENSEMBLE_TAG.to_string();

    Some(EnsembleDecision {
        outcome,
        group_size: winner.members.len(),
        weighted_score: winner.weighted_score,
        contributing_providers: winner.providers(),
    })
}
