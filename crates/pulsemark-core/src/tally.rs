//! # Post Tallying
//!
//! Assembles a [`StatusSnapshot`] from scored post records.
//!
//! The upstream pipeline owns ingestion and scoring; this module only folds
//! already-scored records into the numbers a report carries: totals, the
//! scored/pending split, per-platform and per-label counts, and integer
//! averages of per-model confidence. It also answers the two dashboard
//! questions that fall out of the same records: sentiment per day and the
//! most recent posts.
//!
//! Everything is a pure `BTreeMap` fold over the input slice.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::confidence::Confidence;
use crate::snapshot::{SentimentBreakdown, SentimentLabel, StatusSnapshot, ValidationCheck};
use crate::{ModelName, Platform, PostId};

// =============================================================================
// POST RECORDS
// =============================================================================

/// The sentiment score attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub label: SentimentLabel,
    pub model: ModelName,
    pub confidence: Confidence,
}

/// One post as seen by the reporting layer.
///
/// A post with `score: None` is pending analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: PostId,
    pub platform: Platform,
    pub posted_at: DateTime<Utc>,
    #[serde(default)]
    pub score: Option<Score>,
}

impl PostRecord {
    /// Whether this post still awaits scoring.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.score.is_none()
    }
}

// =============================================================================
// SNAPSHOT TALLY
// =============================================================================

/// Fold post records into a status snapshot.
///
/// `checks` pass through untouched: validation outcomes are asserted by the
/// pipeline, not derived here. `generated_at` is supplied by the caller
/// (the core reads no clock).
#[must_use]
pub fn tally_snapshot(
    posts: &[PostRecord],
    checks: Vec<ValidationCheck>,
    generated_at: DateTime<Utc>,
) -> StatusSnapshot {
    let mut snapshot = StatusSnapshot::empty(generated_at);
    snapshot.validation_checks = checks;
    snapshot.total_posts = posts.len() as u64;

    let mut per_model: BTreeMap<ModelName, Vec<Confidence>> = BTreeMap::new();

    for post in posts {
        let platform_slot = snapshot
            .platform_counts
            .entry(post.platform.clone())
            .or_insert(0);
        *platform_slot = platform_slot.saturating_add(1);

        match &post.score {
            None => {
                snapshot.posts_pending = snapshot.posts_pending.saturating_add(1);
            }
            Some(score) => {
                snapshot.posts_with_sentiment = snapshot.posts_with_sentiment.saturating_add(1);
                snapshot.sentiment_counts.record(score.label);
                per_model
                    .entry(score.model.clone())
                    .or_default()
                    .push(score.confidence);
            }
        }
    }

    for (model, confidences) in per_model {
        if let Some(mean) = Confidence::average(confidences) {
            snapshot.model_confidences.insert(model, mean);
        }
    }

    snapshot
}

// =============================================================================
// DAILY TREND
// =============================================================================

/// Per-day sentiment counts, with pending posts kept visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTally {
    pub sentiment: SentimentBreakdown,
    /// Posts from that day still awaiting scoring.
    pub pending: u64,
}

/// Group posts by their UTC calendar date.
///
/// Days with no posts are absent; the map is ordered oldest first.
#[must_use]
pub fn daily_trend(posts: &[PostRecord]) -> BTreeMap<NaiveDate, DayTally> {
    let mut days: BTreeMap<NaiveDate, DayTally> = BTreeMap::new();
    for post in posts {
        let tally = days.entry(post.posted_at.date_naive()).or_default();
        match &post.score {
            None => tally.pending = tally.pending.saturating_add(1),
            Some(score) => tally.sentiment.record(score.label),
        }
    }
    days
}

// =============================================================================
// RECENT POSTS
// =============================================================================

/// The `limit` most recent posts, newest first.
///
/// Ties on `posted_at` break by descending id so the order is stable.
#[must_use]
pub fn recent_posts(posts: &[PostRecord], limit: usize) -> Vec<PostRecord> {
    let mut sorted: Vec<PostRecord> = posts.to_vec();
    sorted.sort_by(|a, b| {
        b.posted_at
            .cmp(&a.posted_at)
            .then_with(|| b.id.cmp(&a.id))
    });
    sorted.truncate(limit);
    sorted
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn post(id: u64, platform: &str, secs: i64, score: Option<(SentimentLabel, &str, u16)>) -> PostRecord {
        PostRecord {
            id: PostId(id),
            platform: Platform::try_new(platform).expect("valid platform"),
            posted_at: Utc.timestamp_opt(secs, 0).single().expect("valid timestamp"),
            score: score.map(|(label, model, bp)| Score {
                label,
                model: ModelName::try_new(model).expect("valid model"),
                confidence: Confidence::from_basis_points(bp).expect("in range"),
            }),
        }
    }

    const DAY: i64 = 86_400;

    fn sample_posts() -> Vec<PostRecord> {
        vec![
            post(1, "twitter", DAY, Some((SentimentLabel::Positive, "synthetic", 9000))),
            post(2, "twitter", DAY + 60, Some((SentimentLabel::Negative, "synthetic", 8000))),
            post(3, "facebook", 2 * DAY, Some((SentimentLabel::Neutral, "hybrid", 7000))),
            post(4, "linkedin", 2 * DAY + 60, None),
            post(5, "facebook", 3 * DAY, None),
        ]
    }

    #[test]
    fn tally_splits_scored_and_pending() {
        let generated_at = Utc.timestamp_opt(10 * DAY, 0).single().expect("valid");
        let snapshot = tally_snapshot(&sample_posts(), Vec::new(), generated_at);

        assert_eq!(snapshot.generated_at, generated_at);
        assert_eq!(snapshot.total_posts, 5);
        assert_eq!(snapshot.posts_with_sentiment, 3);
        assert_eq!(snapshot.posts_pending, 2);
        assert_eq!(
            snapshot.posts_with_sentiment + snapshot.posts_pending,
            snapshot.total_posts
        );
    }

    #[test]
    fn tally_counts_platforms() {
        let snapshot = tally_snapshot(
            &sample_posts(),
            Vec::new(),
            Utc.timestamp_opt(0, 0).single().expect("valid"),
        );
        let counts: Vec<(&str, u64)> = snapshot
            .platform_counts
            .iter()
            .map(|(p, n)| (p.as_str(), *n))
            .collect();
        assert_eq!(
            counts,
            vec![("facebook", 2), ("linkedin", 1), ("twitter", 2)]
        );
    }

    #[test]
    fn tally_counts_labels() {
        let snapshot = tally_snapshot(
            &sample_posts(),
            Vec::new(),
            Utc.timestamp_opt(0, 0).single().expect("valid"),
        );
        assert_eq!(snapshot.sentiment_counts.negative, 1);
        assert_eq!(snapshot.sentiment_counts.neutral, 1);
        assert_eq!(snapshot.sentiment_counts.positive, 1);
    }

    #[test]
    fn tally_averages_per_model() {
        let snapshot = tally_snapshot(
            &sample_posts(),
            Vec::new(),
            Utc.timestamp_opt(0, 0).single().expect("valid"),
        );
        let synthetic = ModelName::try_new("synthetic").expect("valid");
        let hybrid = ModelName::try_new("hybrid").expect("valid");
        // (9000 + 8000) / 2
        assert_eq!(
            snapshot.model_confidences.get(&synthetic).copied(),
            Some(Confidence::from_basis_points(8500).expect("in range"))
        );
        assert_eq!(
            snapshot.model_confidences.get(&hybrid).copied(),
            Some(Confidence::from_basis_points(7000).expect("in range"))
        );
    }

    #[test]
    fn tally_passes_checks_through() {
        let checks = vec![ValidationCheck::try_new("CSV upload processed", true).expect("valid")];
        let snapshot = tally_snapshot(
            &[],
            checks.clone(),
            Utc.timestamp_opt(0, 0).single().expect("valid"),
        );
        assert_eq!(snapshot.validation_checks, checks);
    }

    #[test]
    fn trend_groups_by_day() {
        let trend = daily_trend(&sample_posts());
        assert_eq!(trend.len(), 3);

        let days: Vec<DayTally> = trend.values().copied().collect();
        assert_eq!(days[0].sentiment.total(), 2);
        assert_eq!(days[0].pending, 0);
        assert_eq!(days[1].sentiment.total(), 1);
        assert_eq!(days[1].pending, 1);
        assert_eq!(days[2].sentiment.total(), 0);
        assert_eq!(days[2].pending, 1);
    }

    #[test]
    fn recent_posts_sorts_newest_first() {
        let recent = recent_posts(&sample_posts(), 3);
        let ids: Vec<u64> = recent.iter().map(|p| p.id.0).collect();
        assert_eq!(ids, vec![5, 4, 3]);
    }

    #[test]
    fn recent_posts_breaks_timestamp_ties_by_id() {
        let posts = vec![
            post(1, "twitter", DAY, None),
            post(2, "twitter", DAY, None),
        ];
        let recent = recent_posts(&posts, 2);
        let ids: Vec<u64> = recent.iter().map(|p| p.id.0).collect();
        assert_eq!(ids, vec![2, 1]);
    }
}
