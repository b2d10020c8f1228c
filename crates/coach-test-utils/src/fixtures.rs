//! Canned stage payloads

use crate::ScriptedGenerationClient;
use coach_adaptive::SessionRecord;
use coach_generation::Stage;
use serde_json::{json, Value};

pub fn problem() -> Value {
    json!({
        "problem": "Maya has 12 stickers and buys 7 more. She gives 3 to her brother. How many stickers does she have now?",
        "answer": "16",
        "solution": "12 + 7 = 19, then 19 - 3 = 16",
        "grade_level": "3rd",
        "concepts": ["addition", "subtraction"],
        "difficulty": "easy"
    })
}

pub fn attempt() -> Value {
    json!({
        "thoughtprocess": "I need to add first. 12 and 7... I read it as 21 and 7 at first, then fixed it.",
        "steps_to_solve": ["12 + 7 = 19", "19 - 3 = 16"],
        "disability_impact": "Reversed digits when reading the numbers"
    })
}

pub fn thought_analysis() -> Value {
    json!({
        "thought": "Student reversed 12 while reading but recovered",
        "mistake_analysis": {"type": "interpretive", "severity": "mild", "frequency": "pattern"},
        "disability_connections": ["number reversal"],
        "learning_implications": "Benefits from visual number supports"
    })
}

pub fn strategies() -> Value {
    json!({
        "strategies": [{"name": "Color-coded numbers", "description": "Highlight each number"}],
        "rationale": "Reduces reversal errors"
    })
}

pub fn tutor_session() -> Value {
    json!({
        "dialogue": [
            {"speaker": "tutor", "text": "Let's read the numbers together."},
            {"speaker": "student", "text": "Twelve and seven."}
        ]
    })
}

pub fn consistency_report() -> Value {
    json!({
        "overall_consistency_score": 0.82,
        "checks": {},
        "recommendations": [],
        "flags": []
    })
}

pub fn disability_analysis() -> Value {
    json!({
        "likely_disability": "Dyslexia",
        "confidence": 0.7,
        "evidence": ["digit reversal"]
    })
}

/// `count` identical history records
pub fn history(count: usize, consistency_score: f64, is_correct: bool) -> Vec<SessionRecord> {
    vec![SessionRecord::new(consistency_score).with_correct(is_correct); count]
}

/// Client scripted for every generated stage
pub fn scripted_pipeline() -> ScriptedGenerationClient {
    ScriptedGenerationClient::new()
        .with_payload(Stage::GenerateProblem, problem())
        .with_payload(Stage::SimulateStudent, attempt())
        .with_payload(Stage::AnalyzeThought, thought_analysis())
        .with_payload(Stage::TeachingStrategies, strategies())
        .with_payload(Stage::TutorSession, tutor_session())
        .with_payload(Stage::ConsistencyValidation, consistency_report())
        .with_payload(Stage::IdentifyDisability, disability_analysis())
}

/// A completion usable by every prompt-backed stage
pub fn universal_completion() -> Value {
    let mut merged = problem();
    for part in [attempt(), thought_analysis(), strategies(), disability_analysis()] {
        if let (Some(target), Value::Object(source)) = (merged.as_object_mut(), part) {
            target.extend(source);
        }
    }
    merged
}
