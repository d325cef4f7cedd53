//! # Report Parser
//!
//! Parses a Markdown status report back into a [`StatusSnapshot`].
//!
//! This is the exact inverse of [`crate::render`]: for every representable
//! snapshot `s`, `parse_report(&render_report(&s)) == s`. The parser is a
//! line-oriented walk through the report's fixed section order; blank lines
//! between elements are tolerated, everything else is enforced.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::confidence::{Confidence, ConfidenceError};
use crate::render::{
    CHECK_FAILED, CHECK_PASSED, GENERATED_PREFIX, REPORT_TITLE, SECTION_DATA_SUMMARY,
    SECTION_MODELS, SECTION_PLATFORMS, SECTION_SENTIMENT, SECTION_VALIDATION, TIMESTAMP_FORMAT,
};
use crate::snapshot::{SentimentLabel, StatusSnapshot, ValidationCheck};
use crate::{FieldError, ModelName, Platform};

// =============================================================================
// ERRORS
// =============================================================================

/// Failures parsing a status report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The report ended before a required element.
    #[error("report ended before {expected}")]
    UnexpectedEnd { expected: &'static str },

    /// A line did not match the element required at its position.
    #[error("line {line}: expected {expected}, found {found:?}")]
    UnexpectedLine {
        line: usize,
        expected: &'static str,
        found: String,
    },

    /// A bullet did not match its section's grammar.
    #[error("line {line}: malformed bullet {content:?}")]
    MalformedBullet { line: usize, content: String },

    /// A bullet count was not a non-negative integer.
    #[error("line {line}: invalid count {value:?}")]
    InvalidCount { line: usize, value: String },

    /// The generation line's timestamp was unreadable.
    #[error("line {line}: invalid timestamp {value:?}")]
    InvalidTimestamp { line: usize, value: String },

    /// A model bullet carried an out-of-range or malformed confidence.
    #[error("line {line}: invalid confidence")]
    InvalidConfidence {
        line: usize,
        #[source]
        source: ConfidenceError,
    },

    /// A platform or model name failed validation.
    #[error("line {line}: invalid name")]
    InvalidName {
        line: usize,
        #[source]
        source: FieldError,
    },

    /// A validation check description failed validation.
    #[error("line {line}: invalid check description")]
    InvalidDescription {
        line: usize,
        #[source]
        source: FieldError,
    },

    /// The same platform or model appeared twice.
    #[error("line {line}: duplicate entry {entry:?}")]
    DuplicateEntry { line: usize, entry: String },

    /// A sentiment bullet was out of the fixed label order.
    #[error("line {line}: expected sentiment label {expected:?}, found {found:?}")]
    UnexpectedLabel {
        line: usize,
        expected: &'static str,
        found: String,
    },
}

// =============================================================================
// LINE CURSOR
// =============================================================================

/// Cursor over the report's non-blank lines, tracking 1-based line numbers.
struct Cursor<'a> {
    lines: Vec<(usize, &'a str)>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        let lines = text
            .lines()
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .map(|(i, l)| (i + 1, l))
            .collect();
        Self { lines, pos: 0 }
    }

    fn peek(&self) -> Option<(usize, &'a str)> {
        self.lines.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<(usize, &'a str)> {
        let item = self.peek();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    /// Consume one line that must match `expected` exactly.
    fn expect_exact(&mut self, expected: &'static str) -> Result<(), ParseError> {
        match self.next() {
            None => Err(ParseError::UnexpectedEnd { expected }),
            Some((_, l)) if l == expected => Ok(()),
            Some((line, l)) => Err(ParseError::UnexpectedLine {
                line,
                expected,
                found: l.to_string(),
            }),
        }
    }

    /// Consume one line that must carry `prefix`; returns the remainder.
    fn expect_prefixed(
        &mut self,
        prefix: &str,
        expected: &'static str,
    ) -> Result<(usize, &'a str), ParseError> {
        match self.next() {
            None => Err(ParseError::UnexpectedEnd { expected }),
            Some((line, l)) => l
                .strip_prefix(prefix)
                .map(|rest| (line, rest))
                .ok_or_else(|| ParseError::UnexpectedLine {
                    line,
                    expected,
                    found: l.to_string(),
                }),
        }
    }
}

// =============================================================================
// PARSER
// =============================================================================

/// Parse a Markdown status report into a snapshot.
pub fn parse_report(text: &str) -> Result<StatusSnapshot, ParseError> {
    let mut cursor = Cursor::new(text);

    cursor.expect_exact(REPORT_TITLE)?;

    let (line, stamp) = cursor.expect_prefixed(GENERATED_PREFIX, "generation line")?;
    let generated_at = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
        .map_err(|_| ParseError::InvalidTimestamp {
            line,
            value: stamp.to_string(),
        })?
        .and_utc();

    let mut snapshot = StatusSnapshot::empty(generated_at);

    // -- Data Summary ---------------------------------------------------------
    cursor.expect_exact(SECTION_DATA_SUMMARY)?;
    snapshot.total_posts = parse_count_line(&mut cursor, "- Total posts: ")?;
    snapshot.posts_with_sentiment = parse_count_line(&mut cursor, "- Posts with sentiment: ")?;
    snapshot.posts_pending = parse_count_line(&mut cursor, "- Posts pending analysis: ")?;

    // -- Platform Distribution ------------------------------------------------
    cursor.expect_exact(SECTION_PLATFORMS)?;
    snapshot.platform_counts = parse_platform_bullets(&mut cursor)?;

    // -- Sentiment Analysis Results -------------------------------------------
    cursor.expect_exact(SECTION_SENTIMENT)?;
    for label in SentimentLabel::ALL {
        let (line, content) = match cursor.next() {
            None => return Err(ParseError::UnexpectedEnd { expected: "sentiment bullet" }),
            Some(item) => item,
        };
        let rest = content
            .strip_prefix("- ")
            .ok_or_else(|| ParseError::MalformedBullet {
                line,
                content: content.to_string(),
            })?;
        let (found, count_text) =
            rest.split_once(": ").ok_or_else(|| ParseError::MalformedBullet {
                line,
                content: content.to_string(),
            })?;
        if found != label.as_str() {
            return Err(ParseError::UnexpectedLabel {
                line,
                expected: label.as_str(),
                found: found.to_string(),
            });
        }
        let count = parse_posts_count(line, count_text)?;
        snapshot.sentiment_counts.set_count(label, count);
    }

    // -- Model Performance ----------------------------------------------------
    cursor.expect_exact(SECTION_MODELS)?;
    snapshot.model_confidences = parse_model_bullets(&mut cursor)?;

    // -- Workflow Validation --------------------------------------------------
    cursor.expect_exact(SECTION_VALIDATION)?;
    while let Some((line, content)) = cursor.next() {
        let rest = content
            .strip_prefix("- ")
            .ok_or_else(|| ParseError::UnexpectedLine {
                line,
                expected: "validation check bullet",
                found: content.to_string(),
            })?;
        let (passed, description) = if let Some(desc) = rest.strip_prefix(CHECK_PASSED) {
            (true, desc)
        } else if let Some(desc) = rest.strip_prefix(CHECK_FAILED) {
            (false, desc)
        } else {
            return Err(ParseError::MalformedBullet {
                line,
                content: content.to_string(),
            });
        };
        let description = description
            .strip_prefix(' ')
            .ok_or_else(|| ParseError::MalformedBullet {
                line,
                content: content.to_string(),
            })?;
        let check = ValidationCheck::try_new(description, passed)
            .map_err(|source| ParseError::InvalidDescription { line, source })?;
        snapshot.validation_checks.push(check);
    }

    Ok(snapshot)
}

/// Parse one Data Summary bullet with a fixed prefix.
fn parse_count_line(cursor: &mut Cursor<'_>, prefix: &'static str) -> Result<u64, ParseError> {
    let (line, rest) = cursor.expect_prefixed(prefix, prefix)?;
    rest.parse().map_err(|_| ParseError::InvalidCount {
        line,
        value: rest.to_string(),
    })
}

/// Parse a `<n> posts` bullet tail.
fn parse_posts_count(line: usize, text: &str) -> Result<u64, ParseError> {
    let value = text
        .strip_suffix(" posts")
        .ok_or_else(|| ParseError::InvalidCount {
            line,
            value: text.to_string(),
        })?;
    value.parse().map_err(|_| ParseError::InvalidCount {
        line,
        value: value.to_string(),
    })
}

/// Parse Platform Distribution bullets until the next section header.
fn parse_platform_bullets(
    cursor: &mut Cursor<'_>,
) -> Result<BTreeMap<Platform, u64>, ParseError> {
    let mut counts = BTreeMap::new();
    while let Some((line, content)) = cursor.peek() {
        if content.starts_with("## ") {
            break;
        }
        cursor.next();
        let rest = content
            .strip_prefix("- ")
            .ok_or_else(|| ParseError::MalformedBullet {
                line,
                content: content.to_string(),
            })?;
        let (name, count_text) =
            rest.split_once(": ").ok_or_else(|| ParseError::MalformedBullet {
                line,
                content: content.to_string(),
            })?;
        let platform = Platform::try_new(name)
            .map_err(|source| ParseError::InvalidName { line, source })?;
        let count = parse_posts_count(line, count_text)?;
        if counts.insert(platform, count).is_some() {
            return Err(ParseError::DuplicateEntry {
                line,
                entry: name.to_string(),
            });
        }
    }
    Ok(counts)
}

/// Parse Model Performance bullets until the next section header.
fn parse_model_bullets(
    cursor: &mut Cursor<'_>,
) -> Result<BTreeMap<ModelName, Confidence>, ParseError> {
    let mut confidences = BTreeMap::new();
    while let Some((line, content)) = cursor.peek() {
        if content.starts_with("## ") {
            break;
        }
        cursor.next();
        let rest = content
            .strip_prefix("- ")
            .ok_or_else(|| ParseError::MalformedBullet {
                line,
                content: content.to_string(),
            })?;
        let (name, tail) =
            rest.split_once(": ").ok_or_else(|| ParseError::MalformedBullet {
                line,
                content: content.to_string(),
            })?;
        let value = tail
            .strip_prefix("Average confidence ")
            .ok_or_else(|| ParseError::MalformedBullet {
                line,
                content: content.to_string(),
            })?;
        let model = ModelName::try_new(name)
            .map_err(|source| ParseError::InvalidName { line, source })?;
        let confidence = Confidence::parse_decimal(value)
            .map_err(|source| ParseError::InvalidConfidence { line, source })?;
        if confidences.insert(model, confidence).is_some() {
            return Err(ParseError::DuplicateEntry {
                line,
                entry: name.to_string(),
            });
        }
    }
    Ok(confidences)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render_report;
    use chrono::{TimeZone, Utc};

    const SAMPLE_REPORT: &str = "\
# Social Media Sentiment Pipeline Status Report

Generated on: 2025-05-05 14:30:00

## Data Summary

- Total posts: 60
- Posts with sentiment: 50
- Posts pending analysis: 10

## Platform Distribution

- facebook: 21 posts
- linkedin: 17 posts
- twitter: 22 posts

## Sentiment Analysis Results

- negative: 12 posts
- neutral: 28 posts
- positive: 10 posts

## Model Performance

- hybrid: Average confidence 0.85
- synthetic: Average confidence 0.85
- twitter: Average confidence 0.85

## Workflow Validation

- ✅ CSV upload processed
- ✅ Sentiment scores stored
- ✅ Dashboard queries answered
";

    #[test]
    fn parses_the_observed_report() {
        let snapshot = parse_report(SAMPLE_REPORT).expect("report parses");

        assert_eq!(
            snapshot.generated_at,
            Utc.with_ymd_and_hms(2025, 5, 5, 14, 30, 0)
                .single()
                .expect("valid timestamp")
        );
        assert_eq!(snapshot.total_posts, 60);
        assert_eq!(snapshot.posts_with_sentiment, 50);
        assert_eq!(snapshot.posts_pending, 10);
        assert_eq!(snapshot.platform_counts.len(), 3);
        assert_eq!(snapshot.sentiment_counts.total(), 50);
        assert_eq!(snapshot.model_confidences.len(), 3);
        assert_eq!(snapshot.validation_checks.len(), 3);
        assert!(snapshot.all_checks_passed());
    }

    #[test]
    fn round_trips_the_observed_report() {
        let snapshot = parse_report(SAMPLE_REPORT).expect("report parses");
        assert_eq!(render_report(&snapshot), SAMPLE_REPORT);
    }

    #[test]
    fn rejects_missing_title() {
        let text = SAMPLE_REPORT.replacen("# Social", "## Social", 1);
        assert!(matches!(
            parse_report(&text),
            Err(ParseError::UnexpectedLine { .. })
        ));
    }

    #[test]
    fn rejects_missing_section() {
        let text = SAMPLE_REPORT.replacen("## Platform Distribution\n", "", 1);
        let err = parse_report(&text).expect_err("section required");
        assert!(matches!(err, ParseError::UnexpectedLine { .. }), "{err:?}");
    }

    #[test]
    fn rejects_bad_count() {
        let text = SAMPLE_REPORT.replacen("- Total posts: 60", "- Total posts: many", 1);
        assert!(matches!(
            parse_report(&text),
            Err(ParseError::InvalidCount { .. })
        ));
    }

    #[test]
    fn rejects_bad_timestamp() {
        let text = SAMPLE_REPORT.replacen("2025-05-05 14:30:00", "sometime in May", 1);
        assert!(matches!(
            parse_report(&text),
            Err(ParseError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn rejects_label_out_of_order() {
        let text = SAMPLE_REPORT
            .replacen("- negative: 12 posts", "- positive: 12 posts", 1);
        assert!(matches!(
            parse_report(&text),
            Err(ParseError::UnexpectedLabel { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_platform() {
        let text = SAMPLE_REPORT.replacen(
            "- linkedin: 17 posts",
            "- facebook: 17 posts",
            1,
        );
        assert!(matches!(
            parse_report(&text),
            Err(ParseError::DuplicateEntry { .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        let text = SAMPLE_REPORT.replacen("Average confidence 0.85", "Average confidence 1.2", 1);
        assert!(matches!(
            parse_report(&text),
            Err(ParseError::InvalidConfidence { .. })
        ));
    }

    #[test]
    fn rejects_unknown_check_glyph() {
        let text = SAMPLE_REPORT.replacen("- ✅ CSV upload processed", "- [x] CSV upload processed", 1);
        assert!(matches!(
            parse_report(&text),
            Err(ParseError::MalformedBullet { .. })
        ));
    }

    #[test]
    fn rejects_trailing_garbage() {
        let text = format!("{SAMPLE_REPORT}\nstray footer\n");
        assert!(matches!(
            parse_report(&text),
            Err(ParseError::UnexpectedLine { .. })
        ));
    }

    #[test]
    fn tolerates_windows_line_endings() {
        let text = SAMPLE_REPORT.replace('\n', "\r\n");
        let snapshot = parse_report(&text).expect("CRLF report parses");
        assert_eq!(snapshot.total_posts, 60);
    }

    #[test]
    fn failed_check_round_trips() {
        let text = SAMPLE_REPORT.replacen(
            "- ✅ Sentiment scores stored",
            "- ❌ Sentiment scores stored",
            1,
        );
        let snapshot = parse_report(&text).expect("report parses");
        assert!(!snapshot.all_checks_passed());
        assert_eq!(render_report(&snapshot), text);
    }
}
