//! Backlog adapter over the external tracker tool.
//!
//! The tracker (`bd` by default) is invoked as `<command> ready --json` in
//! the workspace directory and is expected to print zero or more JSON task
//! records, one per line, highest priority first. The engine performs no
//! sorting of its own: the first record is the chosen unit of work.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::TrackerConfig;
use crate::error::{EngineError, Result};
use crate::process::run_with_timeout;

/// One ready backlog item. Opaque beyond `id` and `title`; unknown fields
/// round-trip into the dispatch payload untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Parse newline-delimited tracker output into an ordered backlog snapshot.
///
/// Blank lines are skipped; any other line must be a JSON object with a
/// string `id`.
pub fn parse_ready_output(output: &str) -> Result<Vec<TaskRecord>> {
    let mut tasks = Vec::new();
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let task: TaskRecord = serde_json::from_str(line).map_err(|err| {
            EngineError::BacklogParse(format!("bad tracker line {line:?}: {err}"))
        })?;
        tasks.push(task);
    }
    Ok(tasks)
}

/// Run the tracker's ready query and return the first ready task, if any.
///
/// `Ok(None)` is the "no ready work" outcome: the backlog is healthy but
/// empty, and the caller should finish successfully without dispatching.
pub fn next_ready_task(workdir: &Path, tracker: &TrackerConfig) -> Result<Option<TaskRecord>> {
    let mut cmd = Command::new(&tracker.command[0]);
    cmd.args(&tracker.command[1..])
        .arg("ready")
        .arg("--json")
        .current_dir(workdir);

    let output = run_with_timeout(
        cmd,
        Duration::from_secs(tracker.timeout_secs),
        tracker.output_limit_bytes,
    )
    .map_err(|err| {
        EngineError::BacklogUnavailable(format!(
            "failed to run {:?}: {err:#}",
            tracker.command.join(" ")
        ))
    })?;

    if output.timed_out {
        return Err(EngineError::BacklogUnavailable(format!(
            "{:?} timed out after {}s",
            tracker.command.join(" "),
            tracker.timeout_secs
        )));
    }
    if !output.status.success() {
        return Err(EngineError::BacklogUnavailable(format!(
            "{:?} exited with {:?}: {}",
            tracker.command.join(" "),
            output.status.code(),
            output.stderr_text().trim()
        )));
    }

    let tasks = parse_ready_output(&output.stdout_text())?;
    debug!(ready = tasks.len(), "tracker returned ready tasks");
    match tasks.into_iter().next() {
        Some(task) => {
            info!(task_id = %task.id, "selected first ready task");
            Ok(Some(task))
        }
        None => Ok(None),
    }
}
