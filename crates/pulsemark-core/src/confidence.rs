//! # Confidence Scores
//!
//! Fixed-point model confidence in the unit interval.
//!
//! Per AGENTS.md Section 2, the core performs no floating-point arithmetic.
//! A confidence is stored as basis points (1/10 000), so the report value
//! `0.85` is exactly `8500` and survives render/parse round-trips without
//! representation error. Averages are computed in integer arithmetic with
//! round-half-up.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Basis points in 1.0 (the upper bound of the unit interval).
pub const CONFIDENCE_SCALE: u16 = 10_000;

/// Errors constructing or parsing a [`Confidence`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfidenceError {
    /// Value exceeded 1.0 (10 000 basis points).
    #[error("confidence {0} exceeds {CONFIDENCE_SCALE} basis points")]
    OutOfRange(u32),

    /// Text was not a decimal in the form `0.85` / `1.0`.
    #[error("malformed confidence value: {0:?}")]
    Malformed(String),
}

/// A model confidence score in `[0, 1]`, stored as basis points.
///
/// The inner value is guaranteed to be at most [`CONFIDENCE_SCALE`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(try_from = "u16", into = "u16")]
pub struct Confidence(u16);

impl Confidence {
    /// Zero confidence.
    pub const ZERO: Self = Self(0);

    /// Full confidence (1.0).
    pub const ONE: Self = Self(CONFIDENCE_SCALE);

    /// Create a confidence from basis points.
    pub fn from_basis_points(bp: u16) -> Result<Self, ConfidenceError> {
        if bp > CONFIDENCE_SCALE {
            return Err(ConfidenceError::OutOfRange(u32::from(bp)));
        }
        Ok(Self(bp))
    }

    /// The score in basis points (0..=10 000).
    #[must_use]
    pub fn basis_points(self) -> u16 {
        self.0
    }

    /// Integer average of a set of confidences, round half up.
    ///
    /// Returns `None` for an empty input (an average of nothing is not a
    /// score of zero).
    #[must_use]
    pub fn average<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        let mut sum: u64 = 0;
        let mut count: u64 = 0;
        for value in values {
            sum = sum.saturating_add(u64::from(value.0));
            count = count.saturating_add(1);
        }
        if count == 0 {
            return None;
        }
        // Each term is at most CONFIDENCE_SCALE, so the mean fits in u16.
        let mean = (sum + count / 2) / count;
        Some(Self(mean as u16))
    }

    /// Parse the report's decimal form (`0.85`, `0.853`, `1.0`).
    ///
    /// Accepts an integer part of `0` or `1` and one to four fraction
    /// digits; rejects anything above 1.0.
    pub fn parse_decimal(text: &str) -> Result<Self, ConfidenceError> {
        let malformed = || ConfidenceError::Malformed(text.to_string());

        let (whole, frac) = text.split_once('.').ok_or_else(malformed)?;
        if frac.is_empty() || frac.len() > 4 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let whole_bp: u32 = match whole {
            "0" => 0,
            "1" => u32::from(CONFIDENCE_SCALE),
            _ => return Err(malformed()),
        };
        let mut frac_bp: u32 = frac.parse().map_err(|_| malformed())?;
        // Scale e.g. "85" (two digits) to 8500 basis points.
        for _ in frac.len()..4 {
            frac_bp *= 10;
        }
        let total = whole_bp + frac_bp;
        if total > u32::from(CONFIDENCE_SCALE) {
            return Err(ConfidenceError::OutOfRange(total));
        }
        Ok(Self(total as u16))
    }
}

impl TryFrom<u16> for Confidence {
    type Error = ConfidenceError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::from_basis_points(value)
    }
}

impl From<Confidence> for u16 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

impl std::fmt::Display for Confidence {
    /// Minimal decimal form: trailing zeros trimmed, at least one fraction
    /// digit (`0.85`, `0.853`, `1.0`). [`Confidence::parse_decimal`] is the
    /// exact inverse.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let whole = self.0 / CONFIDENCE_SCALE;
        let frac = self.0 % CONFIDENCE_SCALE;
        let mut digits = format!("{frac:04}");
        while digits.len() > 1 && digits.ends_with('0') {
            digits.pop();
        }
        write!(f, "{whole}.{digits}")
    }
}

// =============================================================================
// TESTS
// =============================================================================
