//! Session state
//!
//! One [`SessionState`] is built per request and threaded through the
//! pipeline by a single owner. Stage outputs accumulate monotonically:
//! [`SessionState::merge`] refuses to replace a populated field.

use crate::records::{Problem, StageRecord, StudentAttempt, ThoughtAnalysis};
use crate::workflow::WorkflowType;
use coach_adaptive::{DifficultyLevel, SessionRecord};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Grade level used when the caller gives none
pub const DEFAULT_GRADE_LEVEL: &str = "7th";

/// Disability used when the caller gives none
pub const DEFAULT_DISABILITY: &str = "Dyslexia";

/// Internal bookkeeping carried alongside stage outputs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Fixed at normalization time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_type: Option<WorkflowType>,

    /// Caller supplied the problem; never regenerate it
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub use_provided_problem: bool,

    /// Bypass the response cache for problem generation
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub refresh_problem: bool,

    /// Where the student attempt came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_attempt_source: Option<String>,

    /// Node name to cache-hit flag, in execution order
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub cache_status: IndexMap<String, bool>,

    /// Caller keys passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionMetadata {
    /// Build from caller-supplied metadata
    ///
    /// Recognized keys are lifted into typed fields; `workflow_type` and
    /// `cache_status` are owned by the pipeline and ignored here.
    #[must_use]
    pub fn from_caller(mut map: Map<String, Value>) -> Self {
        map.remove("workflow_type");
        map.remove("cache_status");
        let use_provided_problem = take_flag(&mut map, "use_provided_problem");
        let refresh_problem = take_flag(&mut map, "refresh_problem");
        let student_attempt_source = match map.remove("student_attempt_source") {
            Some(Value::String(s)) => Some(s),
            _ => None,
        };

        Self {
            workflow_type: None,
            use_provided_problem,
            refresh_problem,
            student_attempt_source,
            cache_status: IndexMap::new(),
            extra: map,
        }
    }

    /// Record whether a node's invocation was served from cache
    pub fn record_cache(&mut self, node: &str, cache_hit: bool) {
        self.cache_status.insert(node.to_string(), cache_hit);
    }

    /// Nothing recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workflow_type.is_none()
            && !self.use_provided_problem
            && !self.refresh_problem
            && self.student_attempt_source.is_none()
            && self.cache_status.is_empty()
            && self.extra.is_empty()
    }
}

fn take_flag(map: &mut Map<String, Value>, key: &str) -> bool {
    match map.remove(key) {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => matches!(s.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        _ => false,
    }
}

/// Stage-produced fields of [`SessionState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateField {
    /// `problem`
    Problem,
    /// `student_attempt`
    StudentAttempt,
    /// `thought_analysis`
    ThoughtAnalysis,
    /// `strategies`
    Strategies,
    /// `tutor_session`
    TutorSession,
    /// `consistency_report`
    ConsistencyReport,
    /// `adaptive_plan`
    AdaptivePlan,
    /// `disability_analysis`
    DisabilityAnalysis,
}

impl StateField {
    /// All stage-produced fields, in response order
    pub const ALL: [Self; 8] = [
        Self::Problem,
        Self::StudentAttempt,
        Self::ThoughtAnalysis,
        Self::Strategies,
        Self::TutorSession,
        Self::ConsistencyReport,
        Self::AdaptivePlan,
        Self::DisabilityAnalysis,
    ];

    /// Internal state key
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Problem => "problem",
            Self::StudentAttempt => "student_attempt",
            Self::ThoughtAnalysis => "thought_analysis",
            Self::Strategies => "strategies",
            Self::TutorSession => "tutor_session",
            Self::ConsistencyReport => "consistency_report",
            Self::AdaptivePlan => "adaptive_plan",
            Self::DisabilityAnalysis => "disability_analysis",
        }
    }

    /// Key used in the response `results` mapping
    #[must_use]
    pub fn external_name(self) -> &'static str {
        match self {
            Self::Problem => "generated_problem",
            Self::StudentAttempt => "student_simulation",
            Self::ThoughtAnalysis => "thought_analysis",
            Self::Strategies => "teaching_strategies",
            Self::TutorSession => "tutor_session",
            Self::ConsistencyReport => "consistency_validation",
            Self::AdaptivePlan => "adaptive_plan",
            Self::DisabilityAnalysis => "disability_analysis",
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Partial update produced by one pipeline node
#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
    /// New problem
    Problem(Problem),
    /// New student attempt
    StudentAttempt(StudentAttempt),
    /// New thought analysis
    ThoughtAnalysis(ThoughtAnalysis),
    /// New teaching strategies
    Strategies(StageRecord),
    /// New tutor session
    TutorSession(StageRecord),
    /// New consistency report
    ConsistencyReport(StageRecord),
    /// New adaptive plan
    AdaptivePlan(StageRecord),
    /// New disability analysis
    DisabilityAnalysis(StageRecord),
}

impl StateUpdate {
    /// Field this update targets
    #[must_use]
    pub fn field(&self) -> StateField {
        match self {
            Self::Problem(_) => StateField::Problem,
            Self::StudentAttempt(_) => StateField::StudentAttempt,
            Self::ThoughtAnalysis(_) => StateField::ThoughtAnalysis,
            Self::Strategies(_) => StateField::Strategies,
            Self::TutorSession(_) => StateField::TutorSession,
            Self::ConsistencyReport(_) => StateField::ConsistencyReport,
            Self::AdaptivePlan(_) => StateField::AdaptivePlan,
            Self::DisabilityAnalysis(_) => StateField::DisabilityAnalysis,
        }
    }
}

/// Result of [`SessionState::merge`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Field was empty and now holds the update
    Applied,
    /// Field already held a value; update dropped
    Refused,
}

/// Per-request session state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    /// Target grade level
    pub grade_level: String,
    /// Requested difficulty
    pub difficulty: DifficultyLevel,
    /// Learning disability being simulated
    pub disability: String,

    /// Math problem
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<Problem>,
    /// Simulated or provided attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_attempt: Option<StudentAttempt>,
    /// Analysis of the attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought_analysis: Option<ThoughtAnalysis>,
    /// Teaching strategies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategies: Option<StageRecord>,
    /// Simulated tutoring dialogue
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tutor_session: Option<StageRecord>,
    /// Consistency validation report
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistency_report: Option<StageRecord>,
    /// Difficulty recommendation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adaptive_plan: Option<StageRecord>,
    /// Disability identification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disability_analysis: Option<StageRecord>,

    /// Past session performance
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_history: Option<Vec<SessionRecord>>,
    /// Free-text response to classify
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_response: Option<String>,

    /// Bookkeeping
    #[serde(skip_serializing_if = "SessionMetadata::is_empty")]
    pub metadata: SessionMetadata,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            grade_level: DEFAULT_GRADE_LEVEL.to_string(),
            difficulty: DifficultyLevel::default(),
            disability: DEFAULT_DISABILITY.to_string(),
            problem: None,
            student_attempt: None,
            thought_analysis: None,
            strategies: None,
            tutor_session: None,
            consistency_report: None,
            adaptive_plan: None,
            disability_analysis: None,
            student_history: None,
            student_response: None,
            metadata: SessionMetadata::default(),
        }
    }
}

impl SessionState {
    /// Create state with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With grade level
    #[inline]
    #[must_use]
    pub fn with_grade_level(mut self, grade_level: impl Into<String>) -> Self {
        self.grade_level = grade_level.into();
        self
    }

    /// With difficulty
    #[inline]
    #[must_use]
    pub fn with_difficulty(mut self, difficulty: DifficultyLevel) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// With disability
    #[inline]
    #[must_use]
    pub fn with_disability(mut self, disability: impl Into<String>) -> Self {
        self.disability = disability.into();
        self
    }

    /// Workflow fixed at normalization, `full` if unset
    #[must_use]
    pub fn workflow_type(&self) -> WorkflowType {
        self.metadata.workflow_type.unwrap_or_default()
    }

    /// Non-empty problem statement
    #[must_use]
    pub fn problem_text(&self) -> Option<&str> {
        self.problem.as_ref().and_then(Problem::text)
    }

    /// Non-empty student response
    #[must_use]
    pub fn student_response(&self) -> Option<&str> {
        self.student_response.as_deref().filter(|r| !r.is_empty())
    }

    /// History records, empty if none supplied
    #[must_use]
    pub fn history(&self) -> &[SessionRecord] {
        self.student_history.as_deref().unwrap_or_default()
    }

    /// Field holds a non-empty value
    #[must_use]
    pub fn is_populated(&self, field: StateField) -> bool {
        match field {
            StateField::Problem => self.problem.as_ref().is_some_and(|p| !p.is_empty()),
            StateField::StudentAttempt => {
                self.student_attempt.as_ref().is_some_and(|a| !a.is_empty())
            }
            StateField::ThoughtAnalysis => {
                self.thought_analysis.as_ref().is_some_and(|t| !t.is_empty())
            }
            StateField::Strategies => populated(self.strategies.as_ref()),
            StateField::TutorSession => populated(self.tutor_session.as_ref()),
            StateField::ConsistencyReport => populated(self.consistency_report.as_ref()),
            StateField::AdaptivePlan => populated(self.adaptive_plan.as_ref()),
            StateField::DisabilityAnalysis => populated(self.disability_analysis.as_ref()),
        }
    }

    /// Apply a node's partial update
    ///
    /// A populated field is never replaced: the update is dropped and
    /// [`MergeOutcome::Refused`] returned.
    pub fn merge(&mut self, update: StateUpdate) -> MergeOutcome {
        let field = update.field();
        if self.is_populated(field) {
            tracing::warn!(field = %field, "refusing to overwrite populated state field");
            return MergeOutcome::Refused;
        }

        match update {
            StateUpdate::Problem(v) => self.problem = Some(v),
            StateUpdate::StudentAttempt(v) => self.student_attempt = Some(v),
            StateUpdate::ThoughtAnalysis(v) => self.thought_analysis = Some(v),
            StateUpdate::Strategies(v) => self.strategies = Some(v),
            StateUpdate::TutorSession(v) => self.tutor_session = Some(v),
            StateUpdate::ConsistencyReport(v) => self.consistency_report = Some(v),
            StateUpdate::AdaptivePlan(v) => self.adaptive_plan = Some(v),
            StateUpdate::DisabilityAnalysis(v) => self.disability_analysis = Some(v),
        }
        MergeOutcome::Applied
    }
}

fn populated(record: Option<&StageRecord>) -> bool {
    record.is_some_and(|r| !r.is_empty())
}
