//! Confidence tiers for scored candidates.
//!
//! Tier boundaries are fixed constants: at or above [`HIGH_THRESHOLD`] a match is
//! merged automatically, between [`MEDIUM_THRESHOLD`] and [`HIGH_THRESHOLD`] it is
//! queued for review, and below [`MEDIUM_THRESHOLD`] it is rejected.

use serde::Serialize;

use crate::matching::Candidate;

/// Lowest score classified as [`Tier::High`].
pub const HIGH_THRESHOLD: f64 = 0.90;
/// Lowest score classified as [`Tier::Medium`].
pub const MEDIUM_THRESHOLD: f64 = 0.70;

/// Confidence bucket of a candidate.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Low,
    Medium,
    High,
}

impl Tier {
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_THRESHOLD {
            Tier::High
        } else if score >= MEDIUM_THRESHOLD {
            Tier::Medium
        } else {
            Tier::Low
        }
    }

    pub fn action(self) -> SuggestedAction {
        match self {
            Tier::High => SuggestedAction::Merge,
            Tier::Medium => SuggestedAction::Review,
            Tier::Low => SuggestedAction::Reject,
        }
    }

    /// Label used in the response payload.
    pub fn label(self) -> &'static str {
        match self {
            Tier::High => "alto",
            Tier::Medium => "medio",
            Tier::Low => "bajo",
        }
    }
}

/// What downstream logic should do with a classified match.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SuggestedAction {
    Merge,
    Review,
    Reject,
}

impl SuggestedAction {
    pub fn label(self) -> &'static str {
        match self {
            SuggestedAction::Merge => "merge",
            SuggestedAction::Review => "review",
            SuggestedAction::Reject => "reject",
        }
    }
}

/// A candidate annotated with its tier and suggested action.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ClassifiedMatch {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub tier: Tier,
    pub action: SuggestedAction,
}

impl ClassifiedMatch {
    pub fn score(&self) -> f64 {
        self.candidate.score
    }
}

/// Classify one candidate by its score.
pub fn classify(candidate: Candidate) -> ClassifiedMatch {
    let tier = Tier::from_score(candidate.score);
    ClassifiedMatch {
        candidate,
        tier,
        action: tier.action(),
    }
}

/// Match counts per tier.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl TierCounts {
    pub fn tally<'a>(matches: impl IntoIterator<Item = &'a ClassifiedMatch>) -> Self {
        let mut counts = TierCounts::default();
        for m in matches {
            match m.tier {
                Tier::High => counts.high += 1,
                Tier::Medium => counts.medium += 1,
                Tier::Low => counts.low += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}
