//! `coach` command-line entry points
//!
//! Every command prints JSON on stdout; logs go to stderr.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use coach_adaptive::HistoryInput;
use coach_core::{CoachConfig, OrchestratorError, WorkflowService};
use coach_generation::{
    CachedGenerationClient, ConsistencyHandler, GenerationClient, GenerationError,
    OpenAiGenerator, Stage, StageRegistry,
};
use coach_state::{SessionPayload, WorkflowType};
use serde_json::{json, Value};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("coach")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Disability-aware math tutoring pipeline")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("run")
                .about("Run a workflow and print the response envelope")
                .arg(input_arg())
                .arg(
                    Arg::new("workflow")
                        .long("workflow")
                        .help("Workflow type, overriding the payload (full, problem_only, analysis_only)"),
                ),
        )
        .subcommand(
            Command::new("session")
                .about("Run the pipeline and print the raw session state")
                .arg(input_arg()),
        )
        .subcommand(
            Command::new("adaptive")
                .about("Recommend the next difficulty from a session history")
                .arg(
                    Arg::new("history")
                        .long("history")
                        .required(true)
                        .help("History as a JSON array, or a file holding one"),
                )
                .arg(
                    Arg::new("current")
                        .long("current")
                        .required(true)
                        .help("Current difficulty (easy, medium, hard)"),
                ),
        )
        .subcommand(
            Command::new("stage")
                .about("Invoke a single generation stage and print its payload")
                .arg(
                    Arg::new("name")
                        .required(true)
                        .value_parser(Stage::ALL.map(Stage::as_str))
                        .help("Stage name"),
                )
                .arg(
                    Arg::new("arg")
                        .long("arg")
                        .action(ArgAction::Append)
                        .help("Positional stage argument, repeated in order"),
                )
                .arg(
                    Arg::new("no-cache")
                        .long("no-cache")
                        .action(ArgAction::SetTrue)
                        .help("Bypass the response cache"),
                ),
        )
        .subcommand(Command::new("workflows").about("List supported workflow types"))
}

fn input_arg() -> Arg {
    Arg::new("input")
        .long("input")
        .default_value("-")
        .help("Request payload file, or - for stdin")
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match run(&matches).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

async fn run(matches: &ArgMatches) -> Result<()> {
    let config_path = matches.get_one::<PathBuf>("config").map(PathBuf::as_path);

    match matches.subcommand() {
        Some(("run", args)) => {
            let mut payload = read_payload(input_path(args))?;
            if let Some(workflow) = args.get_one::<String>("workflow") {
                payload.workflow_type = Some(workflow.clone());
            }
            let service = backend_service(config_path)?;
            let response = service.run_workflow(payload).await?;
            print_json(&serde_json::to_value(response)?)
        }
        Some(("session", args)) => {
            let payload = read_payload(input_path(args))?;
            let service = backend_service(config_path)?;
            let state = service.run_learning_session(payload).await?;
            print_json(&Value::Object(state))
        }
        Some(("adaptive", args)) => {
            let history = args
                .get_one::<String>("history")
                .context("--history is required")?;
            let current = args
                .get_one::<String>("current")
                .context("--current is required")?;

            // No generation backend is needed for a recommendation.
            let service = WorkflowService::from_client(Arc::new(CachedGenerationClient::new(
                StageRegistry::new(),
            )));
            let recommendation = service.recommend_difficulty(read_history(history)?, current)?;
            print_json(&serde_json::to_value(recommendation)?)
        }
        Some(("stage", args)) => {
            let name = args
                .get_one::<String>("name")
                .context("stage name is required")?;
            let stage: Stage = name.parse()?;
            let stage_args: Vec<String> = args
                .get_many::<String>("arg")
                .map(|values| values.cloned().collect())
                .unwrap_or_default();

            let client = stage_client(stage, config_path)?;
            let output =
                invoke_stage(&client, stage, stage_args, !args.get_flag("no-cache")).await?;
            print_json(&output)
        }
        Some(("workflows", _)) => print_json(&workflows()),
        _ => Ok(()),
    }
}

fn backend_service(config_path: Option<&Path>) -> Result<WorkflowService> {
    let config = CoachConfig::load(config_path)?;
    Ok(WorkflowService::from_config(&config)?)
}

/// The consistency check runs locally; every other stage needs the backend
fn stage_client(stage: Stage, config_path: Option<&Path>) -> Result<CachedGenerationClient> {
    let config = CoachConfig::load(config_path)?;
    let registry = if stage == Stage::ConsistencyValidation {
        let mut registry = StageRegistry::new();
        registry.register(stage, Arc::new(ConsistencyHandler));
        registry
    } else {
        StageRegistry::with_defaults(Arc::new(OpenAiGenerator::new(&config.openai)?))
    };
    Ok(CachedGenerationClient::from_config(registry, &config.cache))
}

async fn invoke_stage(
    client: &dyn GenerationClient,
    stage: Stage,
    args: Vec<String>,
    use_cache: bool,
) -> Result<Value> {
    let invocation = client.invoke(stage, args, use_cache).await?;
    Ok(json!({
        "stage": stage.as_str(),
        "cache_hit": invocation.cache_hit,
        "payload": invocation.payload,
    }))
}

fn input_path(args: &ArgMatches) -> &str {
    args.get_one::<String>("input").map_or("-", String::as_str)
}

fn read_payload(input: &str) -> Result<SessionPayload> {
    let text = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read payload from stdin")?;
        buf
    } else {
        std::fs::read_to_string(input).with_context(|| format!("failed to read {input}"))?
    };
    parse_payload(&text)
}

fn parse_payload(text: &str) -> Result<SessionPayload> {
    if text.trim().is_empty() {
        return Ok(SessionPayload::new());
    }
    serde_json::from_str(text).context("payload is not a valid request object")
}

/// Inline JSON if it looks like JSON, otherwise a file path
///
/// An inline object is passed on so it fails as "not a sequence" rather
/// than as a missing file.
fn read_history(arg: &str) -> Result<HistoryInput> {
    let trimmed = arg.trim_start();
    let text = if trimmed.starts_with(['[', '{', '"']) {
        arg.to_string()
    } else {
        std::fs::read_to_string(arg).with_context(|| format!("failed to read {arg}"))?
    };
    serde_json::from_str(&text).context("history must be a JSON array or a JSON-encoded string")
}

fn workflows() -> Value {
    WorkflowType::ALL
        .iter()
        .map(|w| json!({"name": w.as_str(), "description": w.description()}))
        .collect()
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// 2 for requests the caller must fix, 1 for everything else
fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(e) = err.downcast_ref::<OrchestratorError>() {
        return if e.is_client_error() { 2 } else { 1 };
    }
    if let Some(e) = err.downcast_ref::<GenerationError>() {
        return if e.is_client_error() { 2 } else { 1 };
    }
    if err.downcast_ref::<serde_json::Error>().is_some() {
        return 2;
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use coach_state::StateError;
    use std::io::Write;

    #[test]
    fn command_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn parses_run_arguments() {
        let matches = cli()
            .try_get_matches_from(["coach", "run", "--workflow", "problem_only", "--config", "c.toml"])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "run");
        assert_eq!(input_path(args), "-");
        assert_eq!(args.get_one::<String>("workflow").unwrap(), "problem_only");
        assert_eq!(
            args.get_one::<PathBuf>("config").unwrap(),
            &PathBuf::from("c.toml")
        );
    }

    #[test]
    fn adaptive_requires_history_and_current() {
        assert!(cli()
            .try_get_matches_from(["coach", "adaptive", "--current", "easy"])
            .is_err());
    }

    #[test]
    fn history_inline_or_file() {
        let inline = read_history(r#"[{"consistency_score": 0.5}]"#).unwrap();
        assert!(matches!(inline, HistoryInput::Records(ref r) if r.len() == 1));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#""[{{\"consistency_score\": 0.9}}]""#).unwrap();
        let from_file = read_history(file.path().to_str().unwrap()).unwrap();
        assert!(matches!(from_file, HistoryInput::Encoded(_)));
        assert_eq!(from_file.into_records().unwrap().len(), 1);
    }

    #[test]
    fn inline_object_history_is_not_a_path() {
        let history = read_history(r#"{"consistency_score": 0.5}"#);
        let err = history.unwrap_err();
        assert!(err.downcast_ref::<serde_json::Error>().is_some());
        assert!(!format!("{err:#}").contains("failed to read"));
        assert_eq!(exit_code(&err), 2);
    }

    #[test]
    fn parses_stage_arguments() {
        let matches = cli()
            .try_get_matches_from([
                "coach", "stage", "tutor_session", "--arg", "ADHD", "--arg", "2 + 2", "--no-cache",
            ])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        assert_eq!(args.get_one::<String>("name").unwrap(), "tutor_session");
        let values: Vec<&String> = args.get_many::<String>("arg").unwrap().collect();
        assert_eq!(values, ["ADHD", "2 + 2"]);
        assert!(args.get_flag("no-cache"));

        assert!(cli()
            .try_get_matches_from(["coach", "stage", "chat_with_ai"])
            .is_err());
    }

    #[tokio::test]
    async fn consistency_stage_runs_locally() {
        let client = stage_client(Stage::ConsistencyValidation, None).unwrap();
        let args = vec![
            "What is 9 + 7?".to_string(),
            "Dyscalculia".to_string(),
            json!({"thoughtprocess": "I counted on my fingers", "steps_to_solve": ["9 + 7 = 16"]})
                .to_string(),
            "16".to_string(),
        ];

        let first = invoke_stage(&client, Stage::ConsistencyValidation, args.clone(), true)
            .await
            .unwrap();
        assert_eq!(first["stage"], "consistency_validation");
        assert_eq!(first["cache_hit"], false);
        assert!(first["payload"]["overall_consistency_score"].is_number());

        let second = invoke_stage(&client, Stage::ConsistencyValidation, args, true)
            .await
            .unwrap();
        assert_eq!(second["cache_hit"], true);
        assert_eq!(second["payload"], first["payload"]);
    }

    #[tokio::test]
    async fn stage_argument_mismatch_is_a_client_error() {
        let client = stage_client(Stage::ConsistencyValidation, None).unwrap();
        let err = invoke_stage(&client, Stage::ConsistencyValidation, vec!["x".to_string()], true)
            .await
            .unwrap_err();
        assert_eq!(exit_code(&err), 2);
    }

    #[test]
    fn empty_payload_uses_defaults() {
        let payload = parse_payload("  \n").unwrap();
        assert_eq!(payload, SessionPayload::new());
        assert!(parse_payload("[1, 2]").is_err());
    }

    #[test]
    fn exit_codes_follow_error_class() {
        let client = anyhow::Error::from(OrchestratorError::from(StateError::UnknownWorkflow(
            "x".to_string(),
        )));
        assert_eq!(exit_code(&client), 2);

        let server = anyhow::Error::from(OrchestratorError::invalid_payload("tutor_session", "empty"));
        assert_eq!(exit_code(&server), 1);

        let io = anyhow::anyhow!("disk on fire");
        assert_eq!(exit_code(&io), 1);
    }

    #[test]
    fn workflows_listing() {
        let listed = workflows();
        assert_eq!(listed.as_array().unwrap().len(), 3);
        assert_eq!(listed[0]["name"], "full");
    }
}
