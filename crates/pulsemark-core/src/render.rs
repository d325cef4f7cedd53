//! # Report Renderer
//!
//! Renders a [`StatusSnapshot`] into the pipeline's Markdown status report.
//!
//! The report shape is a public contract (per AGENTS.md Section 4): a title
//! and generation line, then six fixed sections in a fixed order, each with
//! a fixed bullet grammar. [`crate::parse`] inverts this renderer exactly,
//! so any change here is a format version change.
//!
//! Rendering is total: every representable snapshot renders, including ones
//! whose arithmetic the audit would flag.

use crate::snapshot::{SentimentLabel, StatusSnapshot};

/// Title line of every status report.
pub const REPORT_TITLE: &str = "# Social Media Sentiment Pipeline Status Report";

/// Prefix of the generation line.
pub const GENERATED_PREFIX: &str = "Generated on: ";

/// Section headers, in report order.
pub const SECTION_DATA_SUMMARY: &str = "## Data Summary";
pub const SECTION_PLATFORMS: &str = "## Platform Distribution";
pub const SECTION_SENTIMENT: &str = "## Sentiment Analysis Results";
pub const SECTION_MODELS: &str = "## Model Performance";
pub const SECTION_VALIDATION: &str = "## Workflow Validation";

/// Timestamp format of the generation line (UTC, second precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Checkmark glyph for a passed validation check.
pub const CHECK_PASSED: &str = "✅";

/// Checkmark glyph for a failed validation check.
pub const CHECK_FAILED: &str = "❌";

/// Render the Markdown status report for a snapshot.
#[must_use]
pub fn render_report(snapshot: &StatusSnapshot) -> String {
    let mut out = String::new();

    out.push_str(REPORT_TITLE);
    out.push_str("\n\n");
    out.push_str(GENERATED_PREFIX);
    out.push_str(
        &snapshot
            .generated_at
            .format(TIMESTAMP_FORMAT)
            .to_string(),
    );
    out.push('\n');

    out.push('\n');
    out.push_str(SECTION_DATA_SUMMARY);
    out.push_str("\n\n");
    out.push_str(&format!("- Total posts: {}\n", snapshot.total_posts));
    out.push_str(&format!(
        "- Posts with sentiment: {}\n",
        snapshot.posts_with_sentiment
    ));
    out.push_str(&format!(
        "- Posts pending analysis: {}\n",
        snapshot.posts_pending
    ));

    out.push('\n');
    out.push_str(SECTION_PLATFORMS);
    out.push_str("\n\n");
    for (platform, count) in &snapshot.platform_counts {
        out.push_str(&format!("- {platform}: {count} posts\n"));
    }

    out.push('\n');
    out.push_str(SECTION_SENTIMENT);
    out.push_str("\n\n");
    for label in SentimentLabel::ALL {
        let count = snapshot.sentiment_counts.count(label);
        out.push_str(&format!("- {label}: {count} posts\n"));
    }

    out.push('\n');
    out.push_str(SECTION_MODELS);
    out.push_str("\n\n");
    for (model, confidence) in &snapshot.model_confidences {
        out.push_str(&format!("- {model}: Average confidence {confidence}\n"));
    }

    out.push('\n');
    out.push_str(SECTION_VALIDATION);
    out.push_str("\n\n");
    for check in &snapshot.validation_checks {
        let glyph = if check.passed {
            CHECK_PASSED
        } else {
            CHECK_FAILED
        };
        out.push_str(&format!("- {glyph} {}\n", check.description));
    }

    out
}

// =============================================================================
// TESTS
// =============================================================================
