//! Engine configuration.
//!
//! Two layers, both immutable for the lifetime of one invocation:
//!
//! - [`EngineConfig`]: per-invocation inputs (mode, workspace, credentials,
//!   issue body) sourced from CLI arguments and environment variables.
//! - [`FileConfig`]: workspace-local tuning stored at
//!   `.spec-kit/engine.toml`, intended to be edited by humans. Missing file
//!   or missing fields fall back to defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// The three pipelines the engine can run; exactly one per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Formalize an issue body into spec-kit documents.
    CreateSpecification,
    /// Dispatch the first ready bead with its plan context.
    AdvanceNextTask,
    /// Apply a proposed constitution update.
    UpdateGovernance,
}

/// How update-governance publishes the extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PublisherKind {
    /// Dispatch a session asking the remote agent to apply the update.
    Remote,
    /// Run the local agent CLI with the update as its final argument.
    Local,
}

/// Per-invocation configuration, assembled by the CLI layer.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub mode: Mode,
    /// Workspace root containing `.spec-kit/` and `.beads/`.
    pub workspace: PathBuf,
    /// Repository identifier in `owner/repo` form.
    pub repository: Option<String>,
    /// Issue body text; required by two of the three modes.
    pub issue_body: Option<String>,
    /// Session API credential.
    pub api_key: Option<String>,
    /// Credential handed to the local governance agent.
    pub agent_api_key: Option<String>,
    pub governance_publisher: PublisherKind,
}

impl EngineConfig {
    /// Repository identifier, or a configuration error naming the input.
    pub fn require_repository(&self) -> Result<&str> {
        self.repository
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| {
                EngineError::Configuration(
                    "repository is required (--repository or GITHUB_REPOSITORY)".to_string(),
                )
            })
    }

    /// Issue body, or a configuration error; emptiness of individual
    /// sections is judged by the calling mode, not here.
    pub fn require_issue_body(&self) -> Result<&str> {
        self.issue_body
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| {
                EngineError::Configuration(
                    "issue body is required for this mode (--issue-body or PRODMILL_ISSUE_BODY)"
                        .to_string(),
                )
            })
    }
}

/// Workspace-local engine tuning (TOML).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileConfig {
    /// Administrative switch for advance-next-task. When false the mode
    /// reports a distinct "disabled" outcome instead of doing work.
    pub advance_enabled: bool,

    pub tracker: TrackerConfig,
    pub agent: AgentConfig,
}

/// External backlog tracker invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Command prefix; `ready --json` is appended (e.g. `["bd"]`).
    pub command: Vec<String>,
    /// Bounded wait for the tracker subprocess.
    pub timeout_secs: u64,
    /// Truncate tracker stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

/// Local governance agent invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Command prefix; the constitution update text is appended as the
    /// final argument.
    pub command: Vec<String>,
    /// Environment variable name the agent reads its credential from.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub output_limit_bytes: usize,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            advance_enabled: true,
            tracker: TrackerConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            command: vec!["bd".to_string()],
            timeout_secs: 120,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: vec!["gemini".to_string()],
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 30 * 60,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl FileConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tracker.command.is_empty() || self.tracker.command[0].trim().is_empty() {
            return Err(EngineError::Configuration(
                "tracker.command must be a non-empty array".to_string(),
            ));
        }
        if self.tracker.timeout_secs == 0 {
            return Err(EngineError::Configuration(
                "tracker.timeout_secs must be > 0".to_string(),
            ));
        }
        if self.agent.command.is_empty() || self.agent.command[0].trim().is_empty() {
            return Err(EngineError::Configuration(
                "agent.command must be a non-empty array".to_string(),
            ));
        }
        if self.agent.timeout_secs == 0 {
            return Err(EngineError::Configuration(
                "agent.timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load `engine.toml` from the given path, defaulting when absent.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        let cfg = FileConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: FileConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
