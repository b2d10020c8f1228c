//! Prompt templates
//!
//! Templates use `{{name}}` placeholders. Stage arguments are bound by the
//! names in [`Stage::arg_names`]; the student simulation template also
//! receives the fields of a [`DisabilityProfile`].

mod disability;

pub use disability::{DisabilityProfile, PROFILES};

use crate::error::GenerationError;
use crate::stage::Stage;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("placeholder pattern must compile"));

const GENERATE_PROBLEM: &str = include_str!("generate_problem.txt");
const SIMULATE_STUDENT: &str = include_str!("simulate_student.txt");
const ANALYZE_THOUGHT: &str = include_str!("analyze_thought.txt");
const TEACHING_STRATEGIES: &str = include_str!("teaching_strategies.txt");
const TUTOR_SESSION: &str = include_str!("tutor_session.txt");
const IDENTIFY_DISABILITY: &str = include_str!("identify_disability.txt");

/// Raw template text for a stage, `None` for locally computed stages
#[must_use]
pub fn template(stage: Stage) -> Option<&'static str> {
    match stage {
        Stage::GenerateProblem => Some(GENERATE_PROBLEM),
        Stage::SimulateStudent => Some(SIMULATE_STUDENT),
        Stage::AnalyzeThought => Some(ANALYZE_THOUGHT),
        Stage::TeachingStrategies => Some(TEACHING_STRATEGIES),
        Stage::TutorSession => Some(TUTOR_SESSION),
        Stage::IdentifyDisability => Some(IDENTIFY_DISABILITY),
        Stage::ConsistencyValidation => None,
    }
}

/// Render the prompt for a stage invocation
///
/// # Errors
/// [`GenerationError::ArgumentCount`] on arity mismatch,
/// [`GenerationError::UnregisteredStage`] for stages without a template.
pub fn render(stage: Stage, args: &[String]) -> Result<String, GenerationError> {
    stage.check_args(args)?;
    let text = template(stage)
        .ok_or_else(|| GenerationError::UnregisteredStage(stage.as_str().to_string()))?;

    let profile = (stage == Stage::SimulateStudent).then(|| DisabilityProfile::lookup(&args[0]));
    let characteristics = profile
        .map(|p| p.characteristics.join(", "))
        .unwrap_or_default();

    let mut bindings: Vec<(&str, &str)> = stage
        .arg_names()
        .iter()
        .copied()
        .zip(args.iter().map(String::as_str))
        .collect();
    if let Some(profile) = profile {
        bindings.push(("description", profile.description));
        bindings.push(("characteristics", &characteristics));
        bindings.push(("math_impact", profile.math_impact));
    }

    Ok(fill(text, &bindings))
}

/// Single pass over the template; bound values are never rescanned and
/// unknown placeholders stay as written
fn fill(template: &str, bindings: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            bindings
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map_or_else(|| caps[0].to_string(), |(_, value)| (*value).to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn every_generated_stage_has_template() {
        for stage in Stage::ALL {
            assert_eq!(
                template(stage).is_some(),
                stage.temperature().is_some(),
                "{stage}"
            );
        }
    }

    #[test]
    fn render_binds_all_placeholders() {
        let prompt = render(Stage::GenerateProblem, &args(&["5th", "hard"])).unwrap();
        assert!(prompt.contains("5th grade student at hard difficulty"));
        assert!(prompt.contains(r#""grade_level": "5th""#));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn render_student_includes_profile() {
        let prompt = render(
            Stage::SimulateStudent,
            &args(&["Dyscalculia", "What is 3 + 4?"]),
        )
        .unwrap();
        assert!(prompt.contains("number sense"));
        assert!(prompt.contains("What is 3 + 4?"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn render_student_unknown_disability_falls_back() {
        let prompt = render(Stage::SimulateStudent, &args(&["Unlisted", "p"])).unwrap();
        assert!(prompt.contains("letter and number reversals"));
        assert!(prompt.contains("student with Unlisted"));
    }

    #[test]
    fn argument_values_are_not_rescanned() {
        let prompt = render(
            Stage::AnalyzeThought,
            &args(&["ADHD", "What is 8 x 3?", r#"{"thoughtprocess": "copy {{problem}} here"}"#]),
        )
        .unwrap();
        assert!(prompt.contains("copy {{problem}} here"));
        let slots = template(Stage::AnalyzeThought)
            .unwrap()
            .matches("{{problem}}")
            .count();
        assert_eq!(prompt.matches("What is 8 x 3?").count(), slots);
    }

    #[test]
    fn unknown_placeholders_are_left_alone() {
        assert_eq!(fill("{{a}} and {{b}}", &[("a", "{{b}}")]), "{{b}} and {{b}}");
    }

    #[test]
    fn render_checks_arity() {
        assert!(matches!(
            render(Stage::AnalyzeThought, &args(&["Dyslexia", "p"])),
            Err(GenerationError::ArgumentCount { .. })
        ));
        assert!(matches!(
            render(Stage::ConsistencyValidation, &args(&["p", "d", "{}", "4"])),
            Err(GenerationError::UnregisteredStage(_))
        ));
    }

    #[test]
    fn all_templates_render_cleanly() {
        for stage in Stage::ALL.into_iter().filter(|s| template(*s).is_some()) {
            let values: Vec<String> = (0..stage.arity()).map(|i| format!("v{i}")).collect();
            let prompt = render(stage, &values).unwrap();
            assert!(!prompt.contains("{{"), "{stage} left a placeholder");
        }
    }
}
