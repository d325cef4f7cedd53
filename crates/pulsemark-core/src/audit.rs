//! # Consistency Audit
//!
//! Structural verification of a snapshot's own arithmetic.
//!
//! The audit checks only relations the report itself exposes; it never
//! second-guesses the upstream pipeline (per AGENTS.md Section 4). Two
//! relations are binding, one is informational:
//!
//! - scored + pending must equal the total post count
//! - the sentiment label counts must fit within the scored subset
//! - the per-platform counts may sum to anything; a mismatch with the
//!   total is worth a note, nothing more
//!
//! Confidence range needs no check here: `Confidence` cannot hold a value
//! outside `[0, 1]`.

use serde::{Deserialize, Serialize};

use crate::snapshot::StatusSnapshot;

/// Outcome of a single audit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    /// The relation holds.
    Pass,
    /// The relation is not enforced by the artifact; recorded for context.
    Note,
    /// The snapshot contradicts itself.
    Violation,
}

/// One audited relation with its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditFinding {
    /// Stable identifier of the relation (e.g. `post_counts_partition`).
    pub check: &'static str,
    pub outcome: AuditOutcome,
    /// Human-readable account of what was compared.
    pub detail: String,
}

/// Result of auditing one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub findings: Vec<AuditFinding>,
}

impl AuditReport {
    /// Whether the snapshot is free of violations (notes are fine).
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.findings
            .iter()
            .all(|f| f.outcome != AuditOutcome::Violation)
    }

    /// The findings that are violations.
    pub fn violations(&self) -> impl Iterator<Item = &AuditFinding> {
        self.findings
            .iter()
            .filter(|f| f.outcome == AuditOutcome::Violation)
    }
}

/// Audit a snapshot's arithmetic. Total: auditing never fails.
#[must_use]
pub fn audit_snapshot(snapshot: &StatusSnapshot) -> AuditReport {
    let mut findings = Vec::new();

    let scored_plus_pending = snapshot
        .posts_with_sentiment
        .saturating_add(snapshot.posts_pending);
    findings.push(AuditFinding {
        check: "post_counts_partition",
        outcome: if scored_plus_pending == snapshot.total_posts {
            AuditOutcome::Pass
        } else {
            AuditOutcome::Violation
        },
        detail: format!(
            "posts_with_sentiment ({}) + posts_pending ({}) vs total_posts ({})",
            snapshot.posts_with_sentiment, snapshot.posts_pending, snapshot.total_posts
        ),
    });

    let sentiment_total = snapshot.sentiment_counts.total();
    findings.push(AuditFinding {
        check: "sentiment_within_scored",
        outcome: if sentiment_total <= snapshot.posts_with_sentiment {
            AuditOutcome::Pass
        } else {
            AuditOutcome::Violation
        },
        detail: format!(
            "sentiment label counts sum to {} with {} posts scored",
            sentiment_total, snapshot.posts_with_sentiment
        ),
    });

    let platform_total = snapshot.platform_total();
    findings.push(AuditFinding {
        check: "platform_total_matches",
        outcome: if platform_total == snapshot.total_posts {
            AuditOutcome::Pass
        } else {
            AuditOutcome::Note
        },
        detail: format!(
            "platform counts sum to {} with {} posts total",
            platform_total, snapshot.total_posts
        ),
    });

    AuditReport { findings }
}

// =============================================================================
// TESTS
// =============================================================================
