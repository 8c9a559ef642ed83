//! String pairs for the grid (alignment) topology.

use serde::{Deserialize, Serialize};

use crate::error::{InstanceError, SrfResult};

/// Needleman-Wunsch scoring scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scoring {
    /// Score for identical symbols.
    pub match_score: i64,
    /// Score for differing symbols.
    pub mismatch: i64,
    /// Score for a gap in either string.
    pub gap: i64,
}

impl Default for Scoring {
    /// `+1` match, `-1` mismatch, `-1` gap.
    fn default() -> Self {
        Self {
            match_score: 1,
            mismatch: -1,
            gap: -1,
        }
    }
}

impl Scoring {
    /// Boundary score of a prefix aligned against `len` gaps.
    ///
    /// Saturates instead of overflowing for extreme gap scores.
    #[inline]
    pub fn gap_run(&self, len: usize) -> i64 {
        self.gap.saturating_mul(i64::try_from(len).unwrap_or(i64::MAX))
    }
}

/// Two non-empty symbol strings to align.
///
/// Row `i` of the DP grid corresponds to the first `i` symbols of `a`,
/// column `j` to the first `j` symbols of `b`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlignmentPair {
    a: Vec<u8>,
    b: Vec<u8>,
}

impl AlignmentPair {
    /// Creates a pair.
    ///
    /// # Errors
    ///
    /// Returns `InstanceError::EmptyString` if either string is empty.
    pub fn new(a: impl Into<Vec<u8>>, b: impl Into<Vec<u8>>) -> SrfResult<Self> {
        let a = a.into();
        let b = b.into();
        if a.is_empty() {
            return Err(InstanceError::EmptyString { which: "a" }.into());
        }
        if b.is_empty() {
            return Err(InstanceError::EmptyString { which: "b" }.into());
        }
        Ok(Self { a, b })
    }

    /// Length of `a` (grid has `rows() + 1` rows).
    #[inline]
    pub fn rows(&self) -> usize {
        self.a.len()
    }

    /// Length of `b` (grid has `cols() + 1` columns).
    #[inline]
    pub fn cols(&self) -> usize {
        self.b.len()
    }

    /// First string.
    pub fn a(&self) -> &[u8] {
        &self.a
    }

    /// Second string.
    pub fn b(&self) -> &[u8] {
        &self.b
    }

    /// Substitution score for grid cell `(i, j)`, both 1-based.
    #[inline]
    pub fn substitution(&self, i: usize, j: usize, scoring: &Scoring) -> i64 {
        if self.a[i - 1] == self.b[j - 1] {
            scoring.match_score
        } else {
            scoring.mismatch
        }
    }
}
