//! # Pulsemark Core
//!
//! The deterministic status report engine for Pulsemark.
//!
//! A social-media sentiment pipeline produces, at some generation instant, a
//! snapshot of already-computed numbers: how many posts were ingested, how
//! many have a sentiment score, how the posts split across platforms and
//! sentiment labels, how confident each model was on average, and which
//! workflow capabilities were verified. This crate owns that snapshot and
//! everything derivable from it:
//!
//! - [`snapshot`]: the status snapshot record and its field types
//! - [`confidence`]: fixed-point confidence scores (no floats)
//! - [`render`]: the Markdown status report renderer
//! - [`parse`]: the exact inverse of the renderer
//! - [`audit`]: consistency audit of a snapshot's own arithmetic
//! - [`tally`]: snapshot assembly from scored post records
//! - [`formats`]: canonical binary encoding (postcard + header)
//! - [`storage`]: redb-backed snapshot history store
//!
//! Per AGENTS.md Section 2, everything here is a pure function of its
//! inputs: `BTreeMap` only, integer arithmetic only, timestamps passed in
//! by the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod audit;
pub mod confidence;
pub mod formats;
pub mod parse;
pub mod render;
pub mod snapshot;
pub mod storage;
pub mod tally;

pub use audit::{AuditFinding, AuditOutcome, AuditReport, audit_snapshot};
pub use confidence::{Confidence, ConfidenceError};
pub use formats::{FORMAT_VERSION, FormatError, decode_canonical, encode_canonical};
pub use parse::{ParseError, parse_report};
pub use render::{REPORT_TITLE, render_report};
pub use snapshot::{SentimentBreakdown, SentimentLabel, StatusSnapshot, ValidationCheck};
pub use storage::{HistoryStore, StoreError};
pub use tally::{DayTally, PostRecord, Score, daily_trend, recent_posts, tally_snapshot};

// =============================================================================
// FIELD VALIDATION
// =============================================================================

/// Maximum byte length for platform and model names.
pub const MAX_NAME_LEN: usize = 64;

/// Maximum byte length for a validation check description.
pub const MAX_DESCRIPTION_LEN: usize = 200;

/// Rejections from the validated string newtypes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// The field was empty.
    #[error("{what} must not be empty")]
    Empty { what: &'static str },

    /// The field exceeded its byte-length bound.
    #[error("{what} length {len} exceeds {max} bytes")]
    TooLong {
        what: &'static str,
        len: usize,
        max: usize,
    },

    /// The field contained a line break.
    #[error("{what} must be a single line")]
    MultiLine { what: &'static str },

    /// The field contained `:`, which the report bullet syntax reserves.
    #[error("{what} must not contain ':'")]
    ReservedColon { what: &'static str },
}

/// Shared validation for single-line text fields.
fn validate_text(
    what: &'static str,
    value: &str,
    max: usize,
    forbid_colon: bool,
) -> Result<(), FieldError> {
    if value.is_empty() {
        return Err(FieldError::Empty { what });
    }
    if value.len() > max {
        return Err(FieldError::TooLong {
            what,
            len: value.len(),
            max,
        });
    }
    if value.contains('\n') || value.contains('\r') {
        return Err(FieldError::MultiLine { what });
    }
    if forbid_colon && value.contains(':') {
        return Err(FieldError::ReservedColon { what });
    }
    Ok(())
}

// =============================================================================
// IDENTIFIER NEWTYPES
// =============================================================================

/// Identifier of a post in the upstream store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct PostId(pub u64);

/// The originating social network of a post (e.g. `facebook`, `twitter`).
///
/// Validated on construction: non-empty, at most [`MAX_NAME_LEN`] bytes,
/// single line, and free of `:` (reserved by the report bullet syntax).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Platform(String);

impl Platform {
    /// Create a validated platform name.
    pub fn try_new(name: impl Into<String>) -> Result<Self, FieldError> {
        let name = name.into();
        validate_text("platform", &name, MAX_NAME_LEN, true)?;
        Ok(Self(name))
    }

    /// The platform name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Platform {
    type Error = FieldError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<Platform> for String {
    fn from(value: Platform) -> Self {
        value.0
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a sentiment model (e.g. `synthetic`, `hybrid`, `domain_aware`).
///
/// Same validation rules as [`Platform`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelName(String);

impl ModelName {
    /// Create a validated model name.
    pub fn try_new(name: impl Into<String>) -> Result<Self, FieldError> {
        let name = name.into();
        validate_text("model", &name, MAX_NAME_LEN, true)?;
        Ok(Self(name))
    }

    /// The model name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ModelName {
    type Error = FieldError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<ModelName> for String {
    fn from(value: ModelName) -> Self {
        value.0
    }
}

impl std::fmt::Display for ModelName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_accepts_plain_names() {
        let p = Platform::try_new("facebook").expect("valid platform");
        assert_eq!(p.as_str(), "facebook");
        assert_eq!(p.to_string(), "facebook");
    }

    #[test]
    fn platform_rejects_empty() {
        assert_eq!(
            Platform::try_new(""),
            Err(FieldError::Empty { what: "platform" })
        );
    }

    #[test]
    fn platform_rejects_colon() {
        assert_eq!(
            Platform::try_new("bad:name"),
            Err(FieldError::ReservedColon { what: "platform" })
        );
    }

    #[test]
    fn platform_rejects_line_breaks() {
        assert_eq!(
            Platform::try_new("two\nlines"),
            Err(FieldError::MultiLine { what: "platform" })
        );
    }

    #[test]
    fn platform_rejects_oversized_names() {
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(
            Platform::try_new(long),
            Err(FieldError::TooLong { .. })
        ));
    }

    #[test]
    fn model_name_round_trips_through_string() {
        let m = ModelName::try_new("domain_aware").expect("valid model");
        let s: String = m.clone().into();
        assert_eq!(ModelName::try_from(s), Ok(m));
    }

    #[test]
    fn platform_ordering_is_lexicographic() {
        let a = Platform::try_new("facebook").expect("valid");
        let b = Platform::try_new("linkedin").expect("valid");
        let c = Platform::try_new("twitter").expect("valid");
        assert!(a < b && b < c);
    }
}
