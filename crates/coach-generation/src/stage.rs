//! Stage names and argument shapes

use crate::error::GenerationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A unit of generation work addressable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Math word problem
    GenerateProblem,
    /// Simulated student attempt
    SimulateStudent,
    /// Analysis of the attempt
    AnalyzeThought,
    /// Teaching strategies
    TeachingStrategies,
    /// Tutoring dialogue
    TutorSession,
    /// Deterministic consistency check
    ConsistencyValidation,
    /// Disability identification from a free-text response
    IdentifyDisability,
}

impl Stage {
    /// All stages
    pub const ALL: [Self; 7] = [
        Self::GenerateProblem,
        Self::SimulateStudent,
        Self::AnalyzeThought,
        Self::TeachingStrategies,
        Self::TutorSession,
        Self::ConsistencyValidation,
        Self::IdentifyDisability,
    ];

    /// Registry name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GenerateProblem => "generate_problem",
            Self::SimulateStudent => "simulate_student",
            Self::AnalyzeThought => "analyze_thought",
            Self::TeachingStrategies => "teaching_strategies",
            Self::TutorSession => "tutor_session",
            Self::ConsistencyValidation => "consistency_validation",
            Self::IdentifyDisability => "identify_disability",
        }
    }

    /// Positional argument names
    #[must_use]
    pub fn arg_names(self) -> &'static [&'static str] {
        match self {
            Self::GenerateProblem => &["grade_level", "difficulty"],
            Self::SimulateStudent => &["disability", "problem"],
            Self::AnalyzeThought => &["disability", "problem", "attempt_json"],
            Self::TeachingStrategies | Self::TutorSession => {
                &["disability", "problem", "attempt_json", "thought_json"]
            }
            Self::ConsistencyValidation => {
                &["problem", "disability", "attempt_json", "expected_answer"]
            }
            Self::IdentifyDisability => &["problem", "student_response"],
        }
    }

    /// Number of positional arguments
    #[inline]
    #[must_use]
    pub fn arity(self) -> usize {
        self.arg_names().len()
    }

    /// Sampling temperature, `None` for locally computed stages
    #[must_use]
    pub fn temperature(self) -> Option<f32> {
        match self {
            Self::GenerateProblem => Some(0.5),
            Self::SimulateStudent => Some(0.7),
            Self::AnalyzeThought | Self::IdentifyDisability => Some(0.3),
            Self::TeachingStrategies => Some(0.4),
            Self::TutorSession => Some(0.6),
            Self::ConsistencyValidation => None,
        }
    }

    /// Check an argument list against the declared arity
    ///
    /// # Errors
    /// [`GenerationError::ArgumentCount`] on mismatch.
    pub fn check_args(self, args: &[String]) -> Result<(), GenerationError> {
        if args.len() == self.arity() {
            Ok(())
        } else {
            Err(GenerationError::ArgumentCount {
                stage: self.as_str(),
                expected: self.arity(),
                actual: args.len(),
            })
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| GenerationError::UnregisteredStage(s.to_string()))
    }
}
