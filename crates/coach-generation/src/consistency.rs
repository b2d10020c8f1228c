//! Deterministic consistency validation of a simulated student attempt
//!
//! Five independent checks, each scored in roughly `[0, 1]`:
//!
//! | check | measures |
//! |---|---|
//! | `step_answer_consistency` | final answer appears in the worked steps |
//! | `disability_behavior` | narrative mentions behaviours typical of the disability |
//! | `mathematical_reasoning` | operations, progression, answer plausibility |
//! | `error_patterns` | disability-specific error vocabulary |
//! | `completeness` | expected fields present with meaningful content |
//!
//! The overall score is their mean.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-+]?[0-9]*\.?[0-9]+").expect("number pattern must compile"));

const NO_DISABILITY: &str = "No disability";

struct BehaviorTable {
    disability: &'static str,
    expected: &'static [&'static str],
    unexpected: &'static [&'static str],
}

const BEHAVIORS: &[BehaviorTable] = &[
    BehaviorTable {
        disability: "Dyslexia",
        expected: &[
            "confusion",
            "re-reading",
            "number reversal",
            "mixing up",
            "difficulty reading",
            "reversed",
            "transposed",
            "b/d",
            "p/q",
            "6/9",
        ],
        unexpected: &[
            "clear understanding",
            "no confusion",
            "perfect reading",
            "easily understood",
        ],
    },
    BehaviorTable {
        disability: "Dyscalculia",
        expected: &[
            "number confusion",
            "operation confusion",
            "calculation errors",
            "number sense issues",
            "confused",
            "mistake",
            "wrong operation",
        ],
        unexpected: &[
            "perfect calculations",
            "no number confusion",
            "clear calculations",
        ],
    },
    BehaviorTable {
        disability: "Attention Deficit Hyperactivity Disorder",
        expected: &[
            "rushing",
            "skipping steps",
            "careless errors",
            "impulsive",
            "losing focus",
            "quickly",
            "fast",
            "skip",
        ],
        unexpected: &["careful work", "no rushing", "complete steps", "thoroughly"],
    },
    BehaviorTable {
        disability: "Dysgraphia",
        expected: &[
            "handwriting",
            "writing",
            "difficulty writing",
            "messy",
            "unclear",
            "backwards",
        ],
        unexpected: &["clear writing", "neat", "perfect handwriting"],
    },
    BehaviorTable {
        disability: "Auditory Processing Disorder",
        expected: &[
            "misunderstood",
            "confused instructions",
            "hearing",
            "listening",
            "misheard",
        ],
        unexpected: &["clear understanding", "perfect hearing"],
    },
    BehaviorTable {
        disability: "Non verbal Learning Disorder",
        expected: &["visual", "spatial", "diagram", "chart", "graph", "confused"],
        unexpected: &["clear visual understanding", "perfect spatial"],
    },
    BehaviorTable {
        disability: "Language Processing Disorder",
        expected: &["language", "words", "vocabulary", "confused", "misunderstood"],
        unexpected: &["clear language", "perfect understanding"],
    },
    BehaviorTable {
        disability: NO_DISABILITY,
        expected: &[
            "clear thinking",
            "logical steps",
            "careful work",
            "methodical",
            "systematic",
        ],
        unexpected: &[
            "excessive confusion",
            "major errors",
            "disability-like patterns",
            "very confused",
            "completely wrong",
        ],
    },
];

const ERROR_PATTERNS: &[(&str, &[&str])] = &[
    ("Dyslexia", &["6/9", "b/d", "p/q", "reversed", "transposed"]),
    (
        "Dyscalculia",
        &["operation confusion", "number confusion", "place value"],
    ),
    (
        "Attention Deficit Hyperactivity Disorder",
        &["rushed", "skipped", "careless"],
    ),
    (NO_DISABILITY, &[]),
];

const NO_DISABILITY_ERROR_WORDS: &[&str] = &["confusion", "mistake", "error", "wrong", "difficult"];

const OPERATION_MARKERS: &[&str] = &["+", "-", "×", "*", "÷", "/", "=", "equals"];

const REQUIRED_FIELDS: [&str; 3] = ["thoughtprocess", "steps_to_solve", "disability_impact"];

/// Outcome of one check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Score, normally within `[0, 1]`
    pub score: f64,
    /// Short verdict label
    pub status: String,
    /// Human-readable summary
    pub details: String,
    /// Check-specific evidence
    #[serde(flatten)]
    pub evidence: Map<String, Value>,
}

impl CheckResult {
    fn new(score: f64, status: &str, details: String) -> Self {
        Self {
            score,
            status: status.to_string(),
            details,
            evidence: Map::new(),
        }
    }

    fn with(mut self, key: &str, value: Value) -> Self {
        self.evidence.insert(key.to_string(), value);
        self
    }
}

/// Results of all five checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyChecks {
    /// Final answer vs worked steps
    pub step_answer_consistency: CheckResult,
    /// Behaviour vs disability profile
    pub disability_behavior: CheckResult,
    /// Quality of the math work
    pub mathematical_reasoning: CheckResult,
    /// Disability-specific error vocabulary
    pub error_patterns: CheckResult,
    /// Field presence and content
    pub completeness: CheckResult,
}

impl ConsistencyChecks {
    fn named(&self) -> [(&'static str, &CheckResult); 5] {
        [
            ("step_answer_consistency", &self.step_answer_consistency),
            ("disability_behavior", &self.disability_behavior),
            ("mathematical_reasoning", &self.mathematical_reasoning),
            ("error_patterns", &self.error_patterns),
            ("completeness", &self.completeness),
        ]
    }
}

/// Consistency validation report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    /// Mean of the five check scores
    pub overall_consistency_score: f64,
    /// Individual checks
    pub checks: ConsistencyChecks,
    /// Suggestions for checks scoring below 0.5
    pub recommendations: Vec<String>,
    /// Critical issues
    pub flags: Vec<String>,
}

/// Validate a simulated attempt against the disability and expected answer
#[must_use]
pub fn validate_consistency(
    disability: &str,
    attempt: &Map<String, Value>,
    expected_answer: &str,
) -> ConsistencyReport {
    let student_answer = extract_final_answer(attempt);
    let text = attempt_text(attempt);

    let checks = ConsistencyChecks {
        step_answer_consistency: check_step_answer(attempt, &student_answer),
        disability_behavior: check_disability_behavior(disability, &text),
        mathematical_reasoning: check_reasoning(attempt, &student_answer, expected_answer),
        error_patterns: check_error_patterns(disability, &text),
        completeness: check_completeness(attempt),
    };

    let named = checks.named();
    #[allow(clippy::cast_precision_loss)]
    let overall = named.iter().map(|(_, c)| c.score).sum::<f64>() / named.len() as f64;
    let recommendations = named
        .iter()
        .filter(|(_, c)| c.score < 0.5)
        .map(|(name, _)| recommendation(name).to_string())
        .collect();
    let flags = critical_flags(&checks);

    ConsistencyReport {
        overall_consistency_score: overall,
        checks,
        recommendations,
        flags,
    }
}

/// Student's final answer: explicit field, else last number in the last
/// step, else last number in the narrative
#[must_use]
pub fn extract_final_answer(attempt: &Map<String, Value>) -> String {
    if let Some(answer) = attempt.get("final_answer") {
        return value_text(answer).trim().to_string();
    }

    if let Some(last) = steps(attempt).last() {
        if let Some(n) = last_number(&value_text(last)) {
            return n;
        }
    }

    attempt
        .get("thoughtprocess")
        .and_then(|t| last_number(&value_text(t)))
        .unwrap_or_default()
}

fn check_step_answer(attempt: &Map<String, Value>, answer: &str) -> CheckResult {
    let steps = steps(attempt);
    if steps.is_empty() || answer.is_empty() {
        return CheckResult::new(0.0, "incomplete", "Missing steps or final answer".to_string());
    }

    let step_answers: Vec<String> = steps
        .iter()
        .flat_map(|s| numbers(&value_text(s)))
        .collect();

    let found = answer.trim().parse::<f64>().is_ok_and(|target| {
        step_answers
            .iter()
            .filter(|n| is_plain_number(n))
            .filter_map(|n| n.parse::<f64>().ok())
            .any(|n| (target - n).abs() < 0.01)
    });

    let (score, status, verb) = if found {
        (1.0, "consistent", "found")
    } else {
        (0.3, "inconsistent", "not found")
    };
    CheckResult::new(
        score,
        status,
        format!("Final answer '{answer}' {verb} in step-by-step work"),
    )
    .with("step_answers", json!(step_answers))
}

fn check_disability_behavior(disability: &str, text: &str) -> CheckResult {
    let table = BEHAVIORS
        .iter()
        .find(|t| t.disability == disability)
        .or_else(|| BEHAVIORS.iter().find(|t| t.disability == NO_DISABILITY))
        .unwrap_or(&BEHAVIORS[0]);

    let expected_found = matches_in(table.expected, text);
    let unexpected_found = matches_in(table.unexpected, text);

    #[allow(clippy::cast_precision_loss)]
    let score = {
        let m = expected_found.len() as f64;
        let u = unexpected_found.len() as f64;
        let n = table.expected.len() as f64;
        let k = table.unexpected.len() as f64;
        let expected_score = (m / (n * 0.3).max(1.0)).min(1.0);
        let penalty = (u / (k * 0.5).max(1.0)).min(0.5);
        let base = if expected_found.is_empty() { 0.1 } else { 0.3 };
        (base + expected_score - penalty).min(1.0)
    };

    CheckResult::new(
        score,
        if score > 0.5 { "realistic" } else { "unrealistic" },
        format!(
            "Found {}/{} expected behaviors, {}/{} unexpected behaviors",
            expected_found.len(),
            table.expected.len(),
            unexpected_found.len(),
            table.unexpected.len()
        ),
    )
    .with("expected_found", json!(expected_found))
    .with("unexpected_found", json!(unexpected_found))
}

fn check_reasoning(attempt: &Map<String, Value>, answer: &str, expected: &str) -> CheckResult {
    let steps = steps(attempt);
    if steps.is_empty() || answer.is_empty() {
        return CheckResult::new(0.0, "incomplete", "Missing mathematical work".to_string());
    }

    let has_operations = steps.iter().any(|s| {
        let text = value_text(s).to_lowercase();
        OPERATION_MARKERS.iter().any(|op| text.contains(op))
    });
    let has_progression = steps.len() >= 2;
    let reasonable_answer = match (answer.trim().parse::<f64>(), expected.trim().parse::<f64>()) {
        (Ok(_), Ok(expected)) if expected == 0.0 => true,
        (Ok(student), Ok(expected)) => (student - expected).abs() / expected < 0.5,
        _ => false,
    };

    let passed = [has_operations, has_progression, reasonable_answer]
        .iter()
        .filter(|b| **b)
        .count();
    #[allow(clippy::cast_precision_loss)]
    let score = passed as f64 / 3.0;

    CheckResult::new(
        score,
        if score > 0.7 { "good" } else { "needs_improvement" },
        format!(
            "Operations: {has_operations}, Progression: {has_progression}, Reasonable: {reasonable_answer}"
        ),
    )
    .with("has_operations", json!(has_operations))
    .with("has_progression", json!(has_progression))
    .with("reasonable_answer", json!(reasonable_answer))
}

fn check_error_patterns(disability: &str, text: &str) -> CheckResult {
    let expected: &[&str] = ERROR_PATTERNS
        .iter()
        .find(|(name, _)| *name == disability)
        .map(|(_, patterns)| *patterns)
        .unwrap_or_default();
    let found = matches_in(expected, text);

    let (score, status, details) = if disability == NO_DISABILITY {
        #[allow(clippy::cast_precision_loss)]
        let count = matches_in(NO_DISABILITY_ERROR_WORDS, text).len() as f64;
        let score = (1.0 - count * 0.2).max(0.0);
        let status = if score > 0.7 { "appropriate" } else { "too_many_errors" };
        (score, status, "Found minimal error patterns".to_string())
    } else {
        #[allow(clippy::cast_precision_loss)]
        let score = if expected.is_empty() {
            0.5
        } else {
            (found.len() as f64 / expected.len() as f64).min(1.0)
        };
        let status = if score > 0.3 { "realistic" } else { "unrealistic" };
        (score, status, format!("Found {} error patterns", found.len()))
    };

    CheckResult::new(score, status, details)
        .with("expected_patterns", json!(expected))
        .with("found_patterns", json!(found))
}

fn check_completeness(attempt: &Map<String, Value>) -> CheckResult {
    let (present, missing): (Vec<&str>, Vec<&str>) = REQUIRED_FIELDS
        .iter()
        .copied()
        .partition(|field| attempt.get(*field).is_some_and(is_truthy));

    let steps = steps(attempt);
    let meaningful_steps = steps
        .iter()
        .filter(|s| value_text(s).trim().chars().count() > 10)
        .count();
    let meaningful_thoughts = attempt
        .get("thoughtprocess")
        .is_some_and(|t| value_text(t).trim().chars().count() > 20);

    #[allow(clippy::cast_precision_loss)]
    let (field_score, structure_score) = {
        let field_score = present.len() as f64 / REQUIRED_FIELDS.len() as f64;
        let step_ratio = meaningful_steps as f64 / steps.len().max(1) as f64;
        let thought = if meaningful_thoughts { 1.0 } else { 0.0 };
        (field_score, (step_ratio + thought) / 2.0)
    };
    let score = (field_score + structure_score) / 2.0;

    CheckResult::new(
        score,
        if score > 0.7 { "complete" } else { "incomplete" },
        format!(
            "Fields present: {}/{}, Meaningful content: {structure_score:.2}",
            present.len(),
            REQUIRED_FIELDS.len()
        ),
    )
    .with("present_fields", json!(present))
    .with("missing_fields", json!(missing))
}

fn recommendation(check: &str) -> &'static str {
    match check {
        "step_answer_consistency" => "Ensure the final answer matches the step-by-step calculations",
        "disability_behavior" => {
            "Review disability characteristics to make the simulation more realistic"
        }
        "mathematical_reasoning" => {
            "Include more detailed mathematical work and logical progression"
        }
        "error_patterns" => "Add more disability-specific error patterns to the response",
        _ => "Ensure all required fields are present and meaningful",
    }
}

fn critical_flags(checks: &ConsistencyChecks) -> Vec<String> {
    let mut flags = Vec::new();
    if checks.step_answer_consistency.score < 0.3 {
        flags.push("CRITICAL: Final answer doesn't match step-by-step work".to_string());
    }
    if checks.disability_behavior.score < 0.2 {
        flags.push("CRITICAL: Response doesn't match expected disability behavior".to_string());
    }
    if checks.completeness.score < 0.3 {
        flags.push("CRITICAL: Response is severely incomplete".to_string());
    }
    flags
}

fn steps(attempt: &Map<String, Value>) -> &[Value] {
    match attempt.get("steps_to_solve") {
        Some(Value::Array(items)) => items,
        _ => &[],
    }
}

fn attempt_text(attempt: &Map<String, Value>) -> String {
    let field = |key: &str| attempt.get(key).map(value_text).unwrap_or_default();
    let steps = steps(attempt)
        .iter()
        .map(value_text)
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "{} {} {}",
        field("thoughtprocess"),
        steps,
        field("disability_impact")
    )
    .to_lowercase()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn numbers(text: &str) -> Vec<String> {
    NUMBER
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

fn last_number(text: &str) -> Option<String> {
    NUMBER.find_iter(text).last().map(|m| m.as_str().to_string())
}

fn is_plain_number(token: &str) -> bool {
    let digits: String = token.chars().filter(|c| *c != '.' && *c != '-').collect();
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn matches_in(patterns: &[&'static str], text: &str) -> Vec<&'static str> {
    patterns
        .iter()
        .copied()
        .filter(|p| text.contains(p))
        .collect()
}
