//! Difficulty scale
//!
//! Three ordered levels (`easy < medium < hard`) used both as pipeline input
//! and as the controller's decision variable.

use crate::error::AdaptiveError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Problem difficulty level
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    /// Simple operations, small numbers
    Easy,
    /// Moderate complexity
    #[default]
    Medium,
    /// Complex multi-step reasoning
    Hard,
}

/// Per-level performance thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Minimum average consistency expected at this level
    pub min_consistency: f64,
    /// Minimum accuracy expected at this level
    pub min_accuracy: f64,
}

impl DifficultyLevel {
    /// All levels, easiest first
    pub const ALL: [Self; 3] = [Self::Easy, Self::Medium, Self::Hard];

    /// Position on the scale (0 = easy)
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Easy => 0,
            Self::Medium => 1,
            Self::Hard => 2,
        }
    }

    /// One level harder, clamped at `hard`
    #[inline]
    #[must_use]
    pub fn harder(self) -> Self {
        match self {
            Self::Easy => Self::Medium,
            Self::Medium | Self::Hard => Self::Hard,
        }
    }

    /// One level easier, clamped at `easy`
    #[inline]
    #[must_use]
    pub fn easier(self) -> Self {
        match self {
            Self::Easy | Self::Medium => Self::Easy,
            Self::Hard => Self::Medium,
        }
    }

    /// Thresholds a student must meet to stay at this level
    #[must_use]
    pub fn thresholds(self) -> Thresholds {
        match self {
            Self::Easy => Thresholds {
                min_consistency: 0.8,
                min_accuracy: 0.9,
            },
            Self::Medium => Thresholds {
                min_consistency: 0.6,
                min_accuracy: 0.7,
            },
            Self::Hard => Thresholds {
                min_consistency: 0.4,
                min_accuracy: 0.5,
            },
        }
    }

    /// Lowercase label
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DifficultyLevel {
    type Err = AdaptiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(AdaptiveError::UnknownDifficulty(s.to_string())),
        }
    }
}
