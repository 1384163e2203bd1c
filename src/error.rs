//! Engine error kinds.
//!
//! Every failure the engine can report is a named variant so callers and
//! tests can distinguish them; all are terminal for the invocation. The
//! empty-backlog case is not an error (see [`crate::engine::EngineOutcome`]).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Missing required input or an otherwise unusable configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Required workspace directories are absent.
    #[error("missing workspace structure: {0}")]
    MissingWorkspaceStructure(String),

    /// The tracker tool could not be run, exited nonzero, or timed out.
    #[error("backlog unavailable: {0}")]
    BacklogUnavailable(String),

    /// The tracker tool emitted a line that is not a valid task record.
    #[error("backlog parse error: {0}")]
    BacklogParse(String),

    /// No plan section carries the bead marker for the chosen task.
    #[error("no plan section found for bead {task_id}")]
    PlanSectionNotFound { task_id: String },

    /// The issue body has no (non-empty) product specification section.
    #[error("issue body is missing a '### Product Specification' section")]
    MissingSpecification,

    /// The issue body has no (non-empty) proposed constitution update.
    #[error("issue body is missing a '### Proposed Constitution Update' section")]
    MissingGovernanceUpdate,

    /// Non-2xx response or transport failure from the session API.
    #[error("remote dispatch failed{}: {detail}", fmt_status(.status))]
    RemoteDispatch { status: Option<u16>, detail: String },

    /// The locally-invoked governance agent exited nonzero or timed out.
    #[error("local agent failed: {0}")]
    LocalAgent(String),

    /// Plumbing failures (file reads, template rendering) with context.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {code})"),
        None => String::new(),
    }
}
