//! Shared fixtures for unit and integration tests.
//!
//! Compiled only for tests (or with the `test-support` feature, which the
//! dev-dependency on this crate enables for `tests/`).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde_json::Map;
use tempfile::TempDir;

use crate::config::{AgentConfig, EngineConfig, FileConfig, Mode, PublisherKind, TrackerConfig};
use crate::dispatch::{SessionDispatcher, SessionRequest, SessionResponse};
use crate::error::EngineError;
use crate::governance::{GovernanceUpdatePublisher, PublishReport};

/// Temporary ProdMill workspace with `.spec-kit/` and `.beads/` in place.
pub struct TestWorkspace {
    temp: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let temp = TempDir::new().context("create tempdir")?;
        fs::create_dir(temp.path().join(".spec-kit")).context("create .spec-kit")?;
        fs::create_dir(temp.path().join(".beads")).context("create .beads")?;
        Ok(Self { temp })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn write_plan(&self, text: &str) -> Result<()> {
        fs::write(self.path().join(".spec-kit/plan.md"), text).context("write plan.md")
    }

    pub fn write_constitution(&self, text: &str) -> Result<()> {
        fs::write(self.path().join(".spec-kit/constitution.md"), text)
            .context("write constitution.md")
    }

    /// Persist a file config so the spawned binary picks it up.
    pub fn write_engine_toml(&self, cfg: &FileConfig) -> Result<()> {
        let text = toml::to_string_pretty(cfg).context("serialize engine.toml")?;
        fs::write(self.path().join(".spec-kit/engine.toml"), text).context("write engine.toml")
    }

    /// Script the next tracker invocation's stdout.
    pub fn write_tracker_output(&self, text: &str) -> Result<()> {
        fs::write(self.path().join(".tracker-output"), text).context("write tracker output")
    }

    /// File config whose tracker replays `.tracker-output` instead of
    /// running a real `bd`.
    pub fn file_config(&self) -> FileConfig {
        FileConfig {
            advance_enabled: true,
            tracker: TrackerConfig {
                // `ready --json` land in $0/$1 and are ignored.
                command: vec![
                    "sh".to_string(),
                    "-c".to_string(),
                    "cat .tracker-output".to_string(),
                ],
                timeout_secs: 10,
                output_limit_bytes: 100_000,
            },
            agent: AgentConfig {
                command: vec!["true".to_string()],
                api_key_env: "FAKE_AGENT_KEY".to_string(),
                timeout_secs: 10,
                output_limit_bytes: 100_000,
            },
        }
    }

    /// File config whose tracker fails outright.
    pub fn file_config_with_failing_tracker(&self) -> FileConfig {
        let mut cfg = self.file_config();
        cfg.tracker.command = vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo 'db locked' >&2; exit 1".to_string(),
        ];
        cfg
    }

    pub fn engine_config(&self, mode: Mode) -> EngineConfig {
        EngineConfig {
            mode,
            workspace: self.path().to_path_buf(),
            repository: Some("acme/widgets".to_string()),
            issue_body: None,
            api_key: Some("test-key".to_string()),
            agent_api_key: Some("agent-key".to_string()),
            governance_publisher: PublisherKind::Remote,
        }
    }
}

/// Dispatcher that records requests and returns a scripted result.
#[derive(Default)]
pub struct RecordingDispatcher {
    requests: Mutex<Vec<SessionRequest>>,
    fail_status: Mutex<Option<(Option<u16>, String)>>,
    session_name: Mutex<Option<String>>,
}

impl RecordingDispatcher {
    pub fn with_session_name(name: &str) -> Self {
        let dispatcher = Self::default();
        *dispatcher.session_name.lock().expect("lock") = Some(name.to_string());
        dispatcher
    }

    /// Make every subsequent dispatch fail like the remote API did.
    pub fn fail_with(&self, status: Option<u16>, detail: &str) {
        *self.fail_status.lock().expect("lock") = Some((status, detail.to_string()));
    }

    pub fn requests(&self) -> Vec<SessionRequest> {
        self.requests.lock().expect("lock").clone()
    }
}

impl SessionDispatcher for RecordingDispatcher {
    fn create_session(
        &self,
        request: &SessionRequest,
    ) -> std::result::Result<SessionResponse, EngineError> {
        self.requests.lock().expect("lock").push(request.clone());
        if let Some((status, detail)) = self.fail_status.lock().expect("lock").clone() {
            return Err(EngineError::RemoteDispatch { status, detail });
        }
        Ok(SessionResponse {
            name: self.session_name.lock().expect("lock").clone(),
            extra: Map::new(),
        })
    }
}

/// Publisher that records updates and reports local success.
#[derive(Default)]
pub struct RecordingPublisher {
    updates: Mutex<Vec<String>>,
}

impl RecordingPublisher {
    pub fn updates(&self) -> Vec<String> {
        self.updates.lock().expect("lock").clone()
    }
}

impl GovernanceUpdatePublisher for RecordingPublisher {
    fn publish(&self, update: &str) -> std::result::Result<PublishReport, EngineError> {
        self.updates.lock().expect("lock").push(update.to_string());
        Ok(PublishReport::LocalApplied)
    }
}

/// Publisher that always fails like a broken local agent.
pub struct FailingPublisher;

impl GovernanceUpdatePublisher for FailingPublisher {
    fn publish(&self, _update: &str) -> std::result::Result<PublishReport, EngineError> {
        Err(EngineError::LocalAgent("scripted failure".to_string()))
    }
}

/// Workspace path helper for configs pointing somewhere that does not exist.
pub fn missing_dir() -> PathBuf {
    PathBuf::from("/nonexistent/prodmill-test")
}
