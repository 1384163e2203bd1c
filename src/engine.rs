//! Mode dispatch: one invocation, one pipeline.
//!
//! [`run_engine`] is the single entry point. It selects the pipeline for the
//! configured mode, exercises the extraction components as needed, and hands
//! exactly one fully-built request to the session dispatcher or the
//! governance publisher. There is no state across invocations and no retry:
//! each run re-reads the filesystem and either dispatches once or fails.

use tracing::{info, instrument};

use crate::backlog::next_ready_task;
use crate::config::{EngineConfig, FileConfig, Mode};
use crate::dispatch::{SessionDispatcher, SessionRequest};
use crate::error::{EngineError, Result};
use crate::governance::{GovernanceUpdatePublisher, PublishReport};
use crate::issue::{CONSTITUTION_UPDATE_HEADING, split_spec_and_plan};
use crate::plan::extract_section;
use crate::prompt::PromptEngine;
use crate::workspace::WorkspacePaths;

/// Sessions always start from the default branch.
pub const STARTING_BRANCH: &str = "main";

/// Terminal outcome of one successful invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOutcome {
    /// advance-next-task dispatched a session for this bead.
    TaskDispatched {
        task_id: String,
        session: Option<String>,
    },
    /// A session was dispatched with no bead attached.
    Dispatched { session: Option<String> },
    /// The local agent applied the constitution update.
    GovernanceApplied,
    /// The backlog is healthy but empty; nothing was dispatched.
    NoReadyWork,
    /// advance-next-task is administratively disabled.
    ModeDisabled,
}

/// Run the pipeline for the configured mode.
#[instrument(skip_all, fields(mode = ?cfg.mode, workspace = %cfg.workspace.display()))]
pub fn run_engine<D, P>(
    cfg: &EngineConfig,
    file_cfg: &FileConfig,
    dispatcher: &D,
    publisher: &P,
) -> Result<EngineOutcome>
where
    D: SessionDispatcher,
    P: GovernanceUpdatePublisher,
{
    info!(workspace = %cfg.workspace.display(), "engine starting");
    match cfg.mode {
        Mode::CreateSpecification => create_specification(cfg, dispatcher),
        Mode::AdvanceNextTask => advance_next_task(cfg, file_cfg, dispatcher),
        Mode::UpdateGovernance => update_governance(cfg, publisher),
    }
}

fn create_specification<D: SessionDispatcher>(
    cfg: &EngineConfig,
    dispatcher: &D,
) -> Result<EngineOutcome> {
    let body = cfg.require_issue_body()?;
    let sections = split_spec_and_plan(body);
    if sections.specification.is_empty() {
        return Err(EngineError::MissingSpecification);
    }
    let plan = (!sections.plan.is_empty()).then_some(sections.plan.as_str());

    let prompts = PromptEngine::new();
    let prompt = prompts.render_create_spec(&sections.specification, plan)?;
    let request = SessionRequest::new(
        prompt,
        cfg.require_repository()?,
        STARTING_BRANCH,
        "Create specification from issue".to_string(),
    );

    let session = dispatcher.create_session(&request)?;
    info!(with_plan = plan.is_some(), "specification session dispatched");
    Ok(EngineOutcome::Dispatched {
        session: session.name,
    })
}

fn advance_next_task<D: SessionDispatcher>(
    cfg: &EngineConfig,
    file_cfg: &FileConfig,
    dispatcher: &D,
) -> Result<EngineOutcome> {
    if !file_cfg.advance_enabled {
        info!("advance-next-task is disabled in engine.toml; nothing to do");
        return Ok(EngineOutcome::ModeDisabled);
    }

    let paths = WorkspacePaths::new(&cfg.workspace);
    paths.check_layout()?;

    let Some(task) = next_ready_task(&paths.root, &file_cfg.tracker)? else {
        info!("no ready tasks in backlog");
        return Ok(EngineOutcome::NoReadyWork);
    };

    let plan = paths.read_plan()?;
    let plan_context = extract_section(&plan, &task.id)?;
    let constitution = paths.read_constitution()?;

    let prompts = PromptEngine::new();
    let prompt = prompts.render_advance(&task, &plan_context, &constitution)?;
    let title = format!(
        "Advance {}",
        task.title.as_deref().unwrap_or(task.id.as_str())
    );
    let request = SessionRequest::new(prompt, cfg.require_repository()?, STARTING_BRANCH, title);

    let session = dispatcher.create_session(&request)?;
    info!(task_id = %task.id, "task session dispatched");
    Ok(EngineOutcome::TaskDispatched {
        task_id: task.id,
        session: session.name,
    })
}

fn update_governance<P: GovernanceUpdatePublisher>(
    cfg: &EngineConfig,
    publisher: &P,
) -> Result<EngineOutcome> {
    let body = cfg.require_issue_body()?;

    // Deliberately a raw substring search, not the line sectionizer: the
    // update is everything after the heading, wherever it sits.
    let update = body
        .find(CONSTITUTION_UPDATE_HEADING)
        .map(|idx| body[idx + CONSTITUTION_UPDATE_HEADING.len()..].trim())
        .unwrap_or("");
    if update.is_empty() {
        return Err(EngineError::MissingGovernanceUpdate);
    }

    match publisher.publish(update)? {
        PublishReport::RemoteSession { name } => Ok(EngineOutcome::Dispatched { session: name }),
        PublishReport::LocalApplied => Ok(EngineOutcome::GovernanceApplied),
    }
}
