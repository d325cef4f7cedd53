//! # Status Snapshot
//!
//! The immutable record behind a pipeline status report.
//!
//! A snapshot holds values that were already computed upstream and baked in
//! at generation time: summary counts, the per-platform and per-label
//! distributions, per-model average confidences, and the ordered workflow
//! validation checklist. Nothing here re-derives pipeline results; checks
//! arrive as data (per AGENTS.md Section 4).
//!
//! Construction is deliberately permissive about arithmetic: a snapshot
//! whose counts do not add up is still a representable artifact. The
//! [`crate::audit`] module is where inconsistencies are surfaced.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::confidence::Confidence;
use crate::{FieldError, MAX_DESCRIPTION_LEN, ModelName, Platform};

// =============================================================================
// SENTIMENT LABELS
// =============================================================================

/// Sentiment label assigned to a post.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Negative,
    Neutral,
    Positive,
}

impl SentimentLabel {
    /// All labels in report order.
    pub const ALL: [Self; 3] = [Self::Negative, Self::Neutral, Self::Positive];

    /// The lowercase text form used by the report.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Positive => "positive",
        }
    }

    /// Parse the lowercase text form.
    #[must_use]
    pub fn from_str_opt(text: &str) -> Option<Self> {
        match text {
            "negative" => Some(Self::Negative),
            "neutral" => Some(Self::Neutral),
            "positive" => Some(Self::Positive),
            _ => None,
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// SENTIMENT BREAKDOWN
// =============================================================================

/// Post counts for the three sentiment labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentBreakdown {
    pub negative: u64,
    pub neutral: u64,
    pub positive: u64,
}

impl SentimentBreakdown {
    /// Create an empty breakdown.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The count for one label.
    #[must_use]
    pub fn count(&self, label: SentimentLabel) -> u64 {
        match label {
            SentimentLabel::Negative => self.negative,
            SentimentLabel::Neutral => self.neutral,
            SentimentLabel::Positive => self.positive,
        }
    }

    /// Set the count for one label.
    pub fn set_count(&mut self, label: SentimentLabel, count: u64) {
        match label {
            SentimentLabel::Negative => self.negative = count,
            SentimentLabel::Neutral => self.neutral = count,
            SentimentLabel::Positive => self.positive = count,
        }
    }

    /// Add one observation of `label`.
    pub fn record(&mut self, label: SentimentLabel) {
        let slot = match label {
            SentimentLabel::Negative => &mut self.negative,
            SentimentLabel::Neutral => &mut self.neutral,
            SentimentLabel::Positive => &mut self.positive,
        };
        *slot = slot.saturating_add(1);
    }

    /// Total posts across all three labels.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.negative
            .saturating_add(self.neutral)
            .saturating_add(self.positive)
    }
}

// =============================================================================
// VALIDATION CHECKS
// =============================================================================

/// One entry of the workflow validation checklist.
///
/// Checks are asserted by the producing pipeline at generation time. The
/// report renders them; it never computes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ValidationCheckRepr")]
pub struct ValidationCheck {
    /// What was verified (e.g. "CSV upload processed").
    pub description: String,
    /// Whether the capability was verified.
    pub passed: bool,
}

impl ValidationCheck {
    /// Create a validated check entry.
    ///
    /// The description must be non-empty, single-line, and at most
    /// [`MAX_DESCRIPTION_LEN`] bytes, so it survives the bullet syntax.
    pub fn try_new(description: impl Into<String>, passed: bool) -> Result<Self, FieldError> {
        let description = description.into();
        crate::validate_text("check description", &description, MAX_DESCRIPTION_LEN, false)?;
        Ok(Self {
            description,
            passed,
        })
    }
}

/// Serde surrogate so deserialized checks pass through `try_new`.
#[derive(Deserialize)]
struct ValidationCheckRepr {
    description: String,
    passed: bool,
}

impl TryFrom<ValidationCheckRepr> for ValidationCheck {
    type Error = FieldError;

    fn try_from(value: ValidationCheckRepr) -> Result<Self, Self::Error> {
        Self::try_new(value.description, value.passed)
    }
}

// =============================================================================
// STATUS SNAPSHOT
// =============================================================================

/// A pipeline status snapshot: the values a status report is rendered from.
///
/// All fields are already-computed results; a snapshot is immutable once
/// assembled. Map fields use `BTreeMap`, so platforms and models render in
/// a deterministic lexicographic order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Report generation time (UTC, second precision).
    pub generated_at: DateTime<Utc>,

    /// Total rows in the upstream post store.
    pub total_posts: u64,

    /// Subset of posts that already carry a sentiment score.
    pub posts_with_sentiment: u64,

    /// Subset of posts awaiting scoring.
    pub posts_pending: u64,

    /// Posts per originating platform.
    pub platform_counts: BTreeMap<Platform, u64>,

    /// Posts per sentiment label.
    pub sentiment_counts: SentimentBreakdown,

    /// Average confidence per model.
    pub model_confidences: BTreeMap<ModelName, Confidence>,

    /// Ordered workflow validation checklist.
    pub validation_checks: Vec<ValidationCheck>,
}

impl StatusSnapshot {
    /// Create an empty snapshot for the given generation time.
    #[must_use]
    pub fn empty(generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at,
            total_posts: 0,
            posts_with_sentiment: 0,
            posts_pending: 0,
            platform_counts: BTreeMap::new(),
            sentiment_counts: SentimentBreakdown::new(),
            model_confidences: BTreeMap::new(),
            validation_checks: Vec::new(),
        }
    }

    /// Sum of all per-platform counts.
    ///
    /// The artifact does not force this to match [`Self::total_posts`];
    /// see [`crate::audit`].
    #[must_use]
    pub fn platform_total(&self) -> u64 {
        self.platform_counts
            .values()
            .fold(0u64, |acc, n| acc.saturating_add(*n))
    }

    /// Whether every validation check passed.
    #[must_use]
    pub fn all_checks_passed(&self) -> bool {
        self.validation_checks.iter().all(|c| c.passed)
    }
}

// =============================================================================
// TESTS
// =============================================================================
