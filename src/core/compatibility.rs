use crate::core::personality::PersonalityType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of personality types (rows and columns of the matrix)
pub const TYPE_COUNT: usize = 16;

/// Minimum score any type must have with itself
pub const SELF_COMPATIBILITY_FLOOR: u8 = 90;

/// Errors raised when building a matrix from raw rows
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatrixError {
    #[error("score {score} for {row}/{col} is outside 0..=100")]
    OutOfRange {
        row: PersonalityType,
        col: PersonalityType,
        score: u8,
    },

    #[error("matrix is not symmetric: {a}/{b} = {ab}, {b}/{a} = {ba}")]
    Asymmetric {
        a: PersonalityType,
        b: PersonalityType,
        ab: u8,
        ba: u8,
    },

    #[error("self-compatibility of {0} is {1}, expected at least 90")]
    SelfCompatibilityTooLow(PersonalityType, u8),
}

/// Rows follow `PersonalityType::ALL` order.
const SAYU_TABLE: [[u8; TYPE_COUNT]; TYPE_COUNT] = [
    // LAEF
    [90, 75, 85, 65, 70, 60, 55, 45, 80, 65, 75, 55, 85, 70, 60, 50],
    // LAEC
    [75, 95, 70, 80, 65, 85, 50, 70, 60, 80, 55, 75, 65, 80, 45, 65],
    // LAMF
    [85, 70, 90, 75, 60, 55, 80, 65, 70, 55, 85, 70, 60, 50, 75, 60],
    // LAMC
    [65, 80, 75, 95, 55, 70, 65, 85, 50, 70, 60, 80, 45, 65, 55, 75],
    // LREF
    [70, 65, 60, 55, 90, 75, 70, 60, 75, 60, 65, 50, 90, 75, 65, 55],
    // LREC
    [60, 85, 55, 70, 75, 90, 50, 65, 55, 75, 45, 60, 70, 85, 40, 55],
    // LRMF
    [55, 50, 80, 65, 70, 50, 90, 70, 60, 45, 75, 60, 65, 50, 80, 65],
    // LRMC
    [45, 70, 65, 85, 60, 65, 70, 90, 40, 60, 55, 70, 45, 60, 65, 80],
    // SAEF
    [80, 60, 70, 50, 75, 55, 60, 40, 95, 75, 80, 60, 85, 70, 65, 50],
    // SAEC
    [65, 80, 55, 70, 60, 75, 45, 60, 75, 90, 65, 80, 70, 85, 50, 70],
    // SAMF
    [75, 55, 85, 60, 65, 45, 75, 55, 80, 65, 95, 70, 75, 60, 85, 65],
    // SAMC
    [55, 75, 70, 80, 50, 60, 60, 70, 60, 80, 70, 95, 55, 75, 65, 85],
    // SREF
    [85, 65, 60, 45, 90, 70, 65, 45, 85, 70, 75, 55, 90, 80, 70, 60],
    // SREC
    [70, 80, 50, 65, 75, 85, 50, 60, 70, 85, 60, 75, 80, 95, 55, 75],
    // SRMF
    [60, 45, 75, 55, 65, 40, 80, 65, 65, 50, 85, 65, 70, 55, 90, 75],
    // SRMC
    [50, 65, 60, 75, 55, 55, 65, 80, 50, 70, 65, 85, 60, 75, 75, 95],
];

/// Symmetric personality compatibility table
///
/// Built once (validated) and shared read-only between the matcher and
/// request handlers. There is no way to mutate a matrix after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityMatrix {
    scores: [[u8; TYPE_COUNT]; TYPE_COUNT],
}

impl CompatibilityMatrix {
    /// Build a matrix from raw rows, checking every invariant
    pub fn from_rows(scores: [[u8; TYPE_COUNT]; TYPE_COUNT]) -> Result<Self, MatrixError> {
        for a in PersonalityType::ALL {
            for b in PersonalityType::ALL {
                let ab = scores[a.index()][b.index()];
                if ab > 100 {
                    return Err(MatrixError::OutOfRange { row: a, col: b, score: ab });
                }
                let ba = scores[b.index()][a.index()];
                if ab != ba {
                    return Err(MatrixError::Asymmetric { a, b, ab, ba });
                }
            }
            let own = scores[a.index()][a.index()];
            if own < SELF_COMPATIBILITY_FLOOR {
                return Err(MatrixError::SelfCompatibilityTooLow(a, own));
            }
        }

        Ok(Self { scores })
    }

    /// The SAYU table used in production
    pub fn sayu() -> Self {
        Self { scores: SAYU_TABLE }
    }

    /// A matrix where every pair scores `cross` and every type scores `own`
    /// with itself. Handy as a test fixture.
    pub fn uniform(own: u8, cross: u8) -> Result<Self, MatrixError> {
        let mut scores = [[cross; TYPE_COUNT]; TYPE_COUNT];
        for (i, row) in scores.iter_mut().enumerate() {
            row[i] = own;
        }
        Self::from_rows(scores)
    }

    #[inline]
    pub fn score(&self, a: PersonalityType, b: PersonalityType) -> u8 {
        self.scores[a.index()][b.index()]
    }

    /// Types whose score with `host` is at least `min_score`, best first
    pub fn compatible_types(&self, host: PersonalityType, min_score: u8) -> Vec<PersonalityType> {
        let mut types: Vec<PersonalityType> = PersonalityType::ALL
            .iter()
            .copied()
            .filter(|t| self.score(host, *t) >= min_score)
            .collect();
        types.sort_by(|a, b| self.score(host, *b).cmp(&self.score(host, *a)).then(a.cmp(b)));
        types
    }
}

impl Default for CompatibilityMatrix {
    fn default() -> Self {
        Self::sayu()
    }
}

/// Human-facing bucket for a compatibility score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompatibilityLevel {
    Perfect,
    Excellent,
    Good,
    Fair,
    Moderate,
    Low,
}

impl CompatibilityLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            95..=u8::MAX => CompatibilityLevel::Perfect,
            85..=94 => CompatibilityLevel::Excellent,
            75..=84 => CompatibilityLevel::Good,
            65..=74 => CompatibilityLevel::Fair,
            50..=64 => CompatibilityLevel::Moderate,
            _ => CompatibilityLevel::Low,
        }
    }
}
