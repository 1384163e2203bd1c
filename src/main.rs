//! ProdMill engine binary.
//!
//! Dispatches one unit of work per invocation: formalize an issue into
//! spec-kit documents, advance the next ready bead, or apply a constitution
//! update. See the library crate docs for the pipeline details.

use std::env;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use prodmill_engine::config::{EngineConfig, Mode, PublisherKind, load_file_config};
use prodmill_engine::dispatch::JulesClient;
use prodmill_engine::engine::{EngineOutcome, STARTING_BRANCH, run_engine};
use prodmill_engine::error::{EngineError, Result};
use prodmill_engine::exit_codes;
use prodmill_engine::governance::{LocalAgentPublisher, RemoteDispatchPublisher};
use prodmill_engine::logging;
use prodmill_engine::prompt::PromptEngine;
use prodmill_engine::workspace::WorkspacePaths;

#[derive(Parser)]
#[command(
    name = "prodmill-engine",
    version,
    about = "Bridge a beads backlog and spec-kit plan to the Jules session API"
)]
struct Cli {
    /// Pipeline to run for this invocation.
    #[arg(long, value_enum, env = "PRODMILL_MODE")]
    mode: Mode,

    /// Workspace root containing `.spec-kit/` and `.beads/`.
    #[arg(long, env = "PRODMILL_WORKSPACE", default_value = ".")]
    workspace: PathBuf,

    /// Repository identifier (`owner/repo`) for session source context.
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,

    /// Issue body text (create-specification and update-governance).
    #[arg(long, env = "PRODMILL_ISSUE_BODY")]
    issue_body: Option<String>,

    /// Session API credential.
    #[arg(long, env = "JULES_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Credential forwarded to the local governance agent.
    #[arg(long, env = "PRODMILL_AGENT_API_KEY", hide_env_values = true)]
    agent_api_key: Option<String>,

    /// How update-governance publishes the extracted text.
    #[arg(
        long,
        value_enum,
        env = "PRODMILL_GOVERNANCE_PUBLISHER",
        default_value = "remote"
    )]
    governance_publisher: PublisherKind,
}

impl Cli {
    fn into_config(self) -> EngineConfig {
        EngineConfig {
            mode: self.mode,
            workspace: self.workspace,
            repository: self.repository,
            issue_body: self.issue_body,
            api_key: self.api_key,
            agent_api_key: self.agent_api_key,
            governance_publisher: self.governance_publisher,
        }
    }
}

fn main() -> ExitCode {
    logging::init();
    match run() {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            report(&err);
            ExitCode::from(exit_codes::FAILURE as u8)
        }
    }
}

fn run() -> Result<i32> {
    let cfg = Cli::parse().into_config();
    let paths = WorkspacePaths::new(&cfg.workspace);
    let file_cfg = load_file_config(&paths.engine_config_path)?;

    let dispatcher = JulesClient::new(cfg.api_key.clone())?;
    let prompts = PromptEngine::new();

    let outcome = match cfg.governance_publisher {
        PublisherKind::Remote => {
            let publisher = RemoteDispatchPublisher::new(
                &dispatcher,
                &prompts,
                cfg.repository.as_deref(),
                STARTING_BRANCH,
            );
            run_engine(&cfg, &file_cfg, &dispatcher, &publisher)?
        }
        PublisherKind::Local => {
            let publisher = LocalAgentPublisher::new(
                file_cfg.agent.clone(),
                cfg.agent_api_key.clone(),
                cfg.workspace.clone(),
            );
            run_engine(&cfg, &file_cfg, &dispatcher, &publisher)?
        }
    };

    match outcome {
        EngineOutcome::TaskDispatched { task_id, session } => {
            info!(task_id = %task_id, session = session.as_deref().unwrap_or("-"), "task dispatched");
            set_action_output("issue_id", &task_id)?;
            // stdout carries the chosen task id for scripted callers.
            println!("{task_id}");
            Ok(exit_codes::OK)
        }
        EngineOutcome::Dispatched { session } => {
            info!(session = session.as_deref().unwrap_or("-"), "session dispatched");
            Ok(exit_codes::OK)
        }
        EngineOutcome::GovernanceApplied => {
            info!("constitution update applied locally");
            Ok(exit_codes::OK)
        }
        EngineOutcome::NoReadyWork => {
            info!("no ready work; nothing dispatched");
            Ok(exit_codes::OK)
        }
        EngineOutcome::ModeDisabled => {
            info!("advance-next-task is disabled");
            Ok(exit_codes::MODE_DISABLED)
        }
    }
}

/// Append a `name=value` pair to `$GITHUB_OUTPUT` when running as an action.
fn set_action_output(name: &str, value: &str) -> Result<()> {
    let Ok(path) = env::var("GITHUB_OUTPUT") else {
        return Ok(());
    };
    if path.is_empty() {
        return Ok(());
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {path}"))?;
    writeln!(file, "{name}={value}").with_context(|| format!("write {path}"))?;
    Ok(())
}

fn report(err: &EngineError) {
    match err {
        // Anyhow chains carry their context inline.
        EngineError::Other(inner) => eprintln!("error: {inner:#}"),
        other => eprintln!("error: {other}"),
    }
}
