//! Workflow variants and progress labels

use crate::error::StateError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which subset of the pipeline a request runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    /// All eight nodes
    #[default]
    Full,
    /// Problem generation only
    ProblemOnly,
    /// Analysis of a caller-provided problem and attempt
    AnalysisOnly,
}

impl WorkflowType {
    /// Every supported variant
    pub const ALL: [Self; 3] = [Self::Full, Self::ProblemOnly, Self::AnalysisOnly];

    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::ProblemOnly => "problem_only",
            Self::AnalysisOnly => "analysis_only",
        }
    }

    /// Short human description
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Full => "generate, simulate, analyze, coach and validate in one pass",
            Self::ProblemOnly => "generate a single problem",
            Self::AnalysisOnly => "analyze a provided problem and student attempt",
        }
    }
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowType {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|w| w.as_str() == label)
            .ok_or_else(|| StateError::UnknownWorkflow(s.to_string()))
    }
}

/// Furthest pipeline step reflected in a state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrentStep {
    /// Nothing produced yet
    Initialized,
    /// Problem available
    ProblemGenerated,
    /// Student attempt available
    StudentSimulated,
    /// Thought analysis available
    ThoughtAnalyzed,
    /// Teaching strategies available
    StrategiesGenerated,
    /// Tutor session available
    TutorSimulated,
    /// Consistency report available
    ConsistencyValidated,
    /// Pipeline finished
    Completed,
}

impl CurrentStep {
    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::ProblemGenerated => "problem_generated",
            Self::StudentSimulated => "student_simulated",
            Self::ThoughtAnalyzed => "thought_analyzed",
            Self::StrategiesGenerated => "strategies_generated",
            Self::TutorSimulated => "tutor_simulated",
            Self::ConsistencyValidated => "consistency_validated",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for CurrentStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
