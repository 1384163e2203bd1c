//! Publishing strategies for constitution updates.
//!
//! update-governance has two interchangeable realizations behind
//! [`GovernanceUpdatePublisher`]: dispatch a remote session asking the agent
//! to apply the update, or run a local agent CLI with the update as its
//! final argument. Which one runs is a configuration choice
//! (`--governance-publisher`), not a code path difference.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::config::AgentConfig;
use crate::dispatch::{SessionDispatcher, SessionRequest};
use crate::error::{EngineError, Result};
use crate::process::run_with_timeout;
use crate::prompt::PromptEngine;

/// What a publisher did with the update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishReport {
    /// A remote session was created to apply the update.
    RemoteSession { name: Option<String> },
    /// The local agent applied the update itself.
    LocalApplied,
}

pub trait GovernanceUpdatePublisher {
    fn publish(&self, update: &str) -> Result<PublishReport>;
}

/// Remote realization: one session dispatch.
pub struct RemoteDispatchPublisher<'a, D: SessionDispatcher> {
    dispatcher: &'a D,
    prompts: &'a PromptEngine,
    /// Checked at publish time; the publisher is built for every run but
    /// only update-governance exercises it.
    repository: Option<String>,
    starting_branch: String,
}

impl<'a, D: SessionDispatcher> RemoteDispatchPublisher<'a, D> {
    pub fn new(
        dispatcher: &'a D,
        prompts: &'a PromptEngine,
        repository: Option<&str>,
        starting_branch: &str,
    ) -> Self {
        Self {
            dispatcher,
            prompts,
            repository: repository.map(str::to_string),
            starting_branch: starting_branch.to_string(),
        }
    }
}

impl<D: SessionDispatcher> GovernanceUpdatePublisher for RemoteDispatchPublisher<'_, D> {
    fn publish(&self, update: &str) -> Result<PublishReport> {
        let repository = self.repository.as_deref().ok_or_else(|| {
            EngineError::Configuration(
                "repository is required (--repository or GITHUB_REPOSITORY)".to_string(),
            )
        })?;
        let prompt = self.prompts.render_constitution_update(update)?;
        let request = SessionRequest::new(
            prompt,
            repository,
            &self.starting_branch,
            "Constitution update".to_string(),
        );
        let session = self.dispatcher.create_session(&request)?;
        Ok(PublishReport::RemoteSession { name: session.name })
    }
}

/// Local realization: run the configured agent CLI as a subprocess.
///
/// The credential is injected into that single child's environment from
/// explicit configuration; the engine's own environment is never mutated.
pub struct LocalAgentPublisher {
    agent: AgentConfig,
    api_key: Option<String>,
    workdir: PathBuf,
}

impl LocalAgentPublisher {
    pub fn new(agent: AgentConfig, api_key: Option<String>, workdir: PathBuf) -> Self {
        Self {
            agent,
            api_key,
            workdir,
        }
    }
}

impl GovernanceUpdatePublisher for LocalAgentPublisher {
    #[instrument(skip_all, fields(command = %self.agent.command[0]))]
    fn publish(&self, update: &str) -> Result<PublishReport> {
        let api_key = self.api_key.as_deref().filter(|k| !k.is_empty()).ok_or_else(|| {
            EngineError::Configuration(format!(
                "local agent credential is required (--agent-api-key, forwarded as {})",
                self.agent.api_key_env
            ))
        })?;

        let mut cmd = Command::new(&self.agent.command[0]);
        cmd.args(&self.agent.command[1..])
            .arg(update)
            .env(&self.agent.api_key_env, api_key)
            .current_dir(&self.workdir);

        let output = run_with_timeout(
            cmd,
            Duration::from_secs(self.agent.timeout_secs),
            self.agent.output_limit_bytes,
        )
        .map_err(|err| {
            EngineError::LocalAgent(format!(
                "failed to run {:?}: {err:#}",
                self.agent.command.join(" ")
            ))
        })?;

        // Forward the agent's own output so failures are diagnosable from
        // the engine log alone.
        let stdout = output.stdout_text();
        if !stdout.trim().is_empty() {
            info!(agent_stdout = %stdout.trim());
        }
        let stderr = output.stderr_text();
        if !stderr.trim().is_empty() {
            warn!(agent_stderr = %stderr.trim());
        }

        if output.timed_out {
            return Err(EngineError::LocalAgent(format!(
                "{:?} timed out after {}s",
                self.agent.command.join(" "),
                self.agent.timeout_secs
            )));
        }
        if !output.status.success() {
            return Err(EngineError::LocalAgent(format!(
                "{:?} exited with {:?}",
                self.agent.command.join(" "),
                output.status.code()
            )));
        }

        info!("local agent applied constitution update");
        Ok(PublishReport::LocalApplied)
    }
}
