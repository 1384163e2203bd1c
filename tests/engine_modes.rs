//! End-to-end tests for the three engine modes against a temp workspace.
//!
//! The session dispatcher and governance publisher are scripted fakes; the
//! backlog tracker is a real subprocess replaying prepared output, so the
//! subprocess path is exercised without a `bd` install.

use prodmill_engine::config::Mode;
use prodmill_engine::engine::{EngineOutcome, run_engine};
use prodmill_engine::error::EngineError;
use prodmill_engine::governance::{LocalAgentPublisher, RemoteDispatchPublisher};
use prodmill_engine::prompt::PromptEngine;
use prodmill_engine::test_support::{
    FailingPublisher, RecordingDispatcher, RecordingPublisher, TestWorkspace, missing_dir,
};

const PLAN: &str = "## Setup <!-- bead:pm-1 -->\nWire the pipeline.\n## Deploy <!-- bead:pm-2 -->\nShip it.\n";
const CONSTITUTION: &str = "Beads are closed only after review.\n";

fn ready_line() -> String {
    "{\"id\":\"pm-1\",\"title\":\"Setup\",\"priority\":1}\n".to_string()
}

#[test]
fn advance_dispatches_first_ready_task_with_context() {
    let ws = TestWorkspace::new().expect("workspace");
    ws.write_plan(PLAN).expect("plan");
    ws.write_constitution(CONSTITUTION).expect("constitution");
    ws.write_tracker_output(&(ready_line() + "{\"id\":\"pm-2\"}\n"))
        .expect("tracker");

    let dispatcher = RecordingDispatcher::with_session_name("sessions/abc");
    let publisher = RecordingPublisher::default();
    let outcome = run_engine(
        &ws.engine_config(Mode::AdvanceNextTask),
        &ws.file_config(),
        &dispatcher,
        &publisher,
    )
    .expect("run");

    assert_eq!(
        outcome,
        EngineOutcome::TaskDispatched {
            task_id: "pm-1".to_string(),
            session: Some("sessions/abc".to_string()),
        }
    );

    let requests = dispatcher.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.title, "Advance Setup");
    assert_eq!(request.source_context.source, "sources/github/acme/widgets");
    assert_eq!(request.source_context.github_repo_context.starting_branch, "main");
    // Only the first ready task's section; the raw record and constitution
    // ride along verbatim.
    assert!(request.prompt.contains("Wire the pipeline."));
    assert!(!request.prompt.contains("Ship it."));
    assert!(request.prompt.contains("\"id\": \"pm-1\""));
    assert!(request.prompt.contains("\"priority\": 1"));
    assert!(request.prompt.contains("Beads are closed only after review."));
    assert!(request.prompt.contains("bd close pm-1"));
}

#[test]
fn advance_with_empty_backlog_dispatches_nothing() {
    let ws = TestWorkspace::new().expect("workspace");
    ws.write_plan(PLAN).expect("plan");
    ws.write_constitution(CONSTITUTION).expect("constitution");
    ws.write_tracker_output("").expect("tracker");

    let dispatcher = RecordingDispatcher::default();
    let outcome = run_engine(
        &ws.engine_config(Mode::AdvanceNextTask),
        &ws.file_config(),
        &dispatcher,
        &RecordingPublisher::default(),
    )
    .expect("run");

    assert_eq!(outcome, EngineOutcome::NoReadyWork);
    assert!(dispatcher.requests().is_empty());
}

#[test]
fn advance_fails_on_malformed_tracker_line_before_any_dispatch() {
    let ws = TestWorkspace::new().expect("workspace");
    ws.write_plan(PLAN).expect("plan");
    ws.write_constitution(CONSTITUTION).expect("constitution");
    ws.write_tracker_output("{\"id\":\"pm-1\"}\nnot json at all\n")
        .expect("tracker");

    let dispatcher = RecordingDispatcher::default();
    let err = run_engine(
        &ws.engine_config(Mode::AdvanceNextTask),
        &ws.file_config(),
        &dispatcher,
        &RecordingPublisher::default(),
    )
    .expect_err("bad tracker output");

    assert!(matches!(err, EngineError::BacklogParse(_)));
    assert!(dispatcher.requests().is_empty());
}

#[test]
fn advance_surfaces_tracker_diagnostics_on_failure() {
    let ws = TestWorkspace::new().expect("workspace");
    ws.write_plan(PLAN).expect("plan");
    ws.write_constitution(CONSTITUTION).expect("constitution");

    let err = run_engine(
        &ws.engine_config(Mode::AdvanceNextTask),
        &ws.file_config_with_failing_tracker(),
        &RecordingDispatcher::default(),
        &RecordingPublisher::default(),
    )
    .expect_err("tracker exits nonzero");

    assert!(matches!(err, EngineError::BacklogUnavailable(_)));
    assert!(err.to_string().contains("db locked"));
}

#[test]
fn advance_requires_workspace_structure() {
    let ws = TestWorkspace::new().expect("workspace");
    let mut cfg = ws.engine_config(Mode::AdvanceNextTask);
    cfg.workspace = missing_dir();

    let err = run_engine(
        &cfg,
        &ws.file_config(),
        &RecordingDispatcher::default(),
        &RecordingPublisher::default(),
    )
    .expect_err("no .spec-kit or .beads");

    assert!(matches!(err, EngineError::MissingWorkspaceStructure(_)));
}

#[test]
fn advance_fails_when_plan_has_no_section_for_the_task() {
    let ws = TestWorkspace::new().expect("workspace");
    ws.write_plan("## Deploy <!-- bead:pm-2 -->\nShip it.\n").expect("plan");
    ws.write_constitution(CONSTITUTION).expect("constitution");
    ws.write_tracker_output(&ready_line()).expect("tracker");

    let err = run_engine(
        &ws.engine_config(Mode::AdvanceNextTask),
        &ws.file_config(),
        &RecordingDispatcher::default(),
        &RecordingPublisher::default(),
    )
    .expect_err("no matching bead marker");

    assert!(matches!(
        err,
        EngineError::PlanSectionNotFound { ref task_id } if task_id == "pm-1"
    ));
}

#[test]
fn advance_reports_disabled_instead_of_working() {
    let ws = TestWorkspace::new().expect("workspace");
    ws.write_tracker_output(&ready_line()).expect("tracker");
    let mut file_cfg = ws.file_config();
    file_cfg.advance_enabled = false;

    let dispatcher = RecordingDispatcher::default();
    let outcome = run_engine(
        &ws.engine_config(Mode::AdvanceNextTask),
        &file_cfg,
        &dispatcher,
        &RecordingPublisher::default(),
    )
    .expect("run");

    assert_eq!(outcome, EngineOutcome::ModeDisabled);
    assert!(dispatcher.requests().is_empty());
}

#[test]
fn advance_surfaces_remote_dispatch_failure() {
    let ws = TestWorkspace::new().expect("workspace");
    ws.write_plan(PLAN).expect("plan");
    ws.write_constitution(CONSTITUTION).expect("constitution");
    ws.write_tracker_output(&ready_line()).expect("tracker");

    let dispatcher = RecordingDispatcher::default();
    dispatcher.fail_with(Some(500), "internal error");

    let err = run_engine(
        &ws.engine_config(Mode::AdvanceNextTask),
        &ws.file_config(),
        &dispatcher,
        &RecordingPublisher::default(),
    )
    .expect_err("dispatch failed");

    match err {
        EngineError::RemoteDispatch { status, .. } => assert_eq!(status, Some(500)),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn create_spec_dispatches_formalization_prompt() {
    let ws = TestWorkspace::new().expect("workspace");
    let mut cfg = ws.engine_config(Mode::CreateSpecification);
    cfg.issue_body = Some(
        "### Product Specification\nBuild a widget.\n### Technical Plan\nUse gears.".to_string(),
    );

    let dispatcher = RecordingDispatcher::default();
    let outcome = run_engine(
        &cfg,
        &ws.file_config(),
        &dispatcher,
        &RecordingPublisher::default(),
    )
    .expect("run");

    assert_eq!(outcome, EngineOutcome::Dispatched { session: None });
    let requests = dispatcher.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].title, "Create specification from issue");
    assert!(requests[0].prompt.contains("Build a widget."));
    assert!(requests[0].prompt.contains("Use gears."));
    assert!(requests[0].prompt.contains("dependency-ordered"));
}

#[test]
fn create_spec_without_plan_asks_for_proposal_only() {
    let ws = TestWorkspace::new().expect("workspace");
    let mut cfg = ws.engine_config(Mode::CreateSpecification);
    cfg.issue_body = Some("### Product Specification\nBuild a widget.".to_string());

    let dispatcher = RecordingDispatcher::default();
    run_engine(
        &cfg,
        &ws.file_config(),
        &dispatcher,
        &RecordingPublisher::default(),
    )
    .expect("run");

    let requests = dispatcher.requests();
    assert!(requests[0].prompt.contains("human review"));
    assert!(!requests[0].prompt.contains("dependency-ordered"));
}

#[test]
fn update_governance_remote_dispatches_update_prompt() {
    let ws = TestWorkspace::new().expect("workspace");
    let mut cfg = ws.engine_config(Mode::UpdateGovernance);
    cfg.issue_body =
        Some("### Proposed Constitution Update\nAll beads get reviews.".to_string());

    let dispatcher = RecordingDispatcher::with_session_name("sessions/gov");
    let prompts = PromptEngine::new();
    let publisher =
        RemoteDispatchPublisher::new(&dispatcher, &prompts, Some("acme/widgets"), "main");

    let outcome = run_engine(&cfg, &ws.file_config(), &dispatcher, &publisher).expect("run");

    assert_eq!(
        outcome,
        EngineOutcome::Dispatched {
            session: Some("sessions/gov".to_string())
        }
    );
    let requests = dispatcher.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].title, "Constitution update");
    assert!(requests[0].prompt.contains("All beads get reviews."));
}

#[test]
fn update_governance_local_runs_the_agent() {
    let ws = TestWorkspace::new().expect("workspace");
    let mut cfg = ws.engine_config(Mode::UpdateGovernance);
    cfg.issue_body =
        Some("### Proposed Constitution Update\nAll beads get reviews.".to_string());

    let out_path = ws.path().join("captured.txt");
    let mut file_cfg = ws.file_config();
    file_cfg.agent.command = vec![
        "sh".to_string(),
        "-c".to_string(),
        format!("printf '%s' \"$0\" > {}", out_path.display()),
    ];

    let publisher = LocalAgentPublisher::new(
        file_cfg.agent.clone(),
        cfg.agent_api_key.clone(),
        cfg.workspace.clone(),
    );
    let outcome = run_engine(
        &cfg,
        &file_cfg,
        &RecordingDispatcher::default(),
        &publisher,
    )
    .expect("run");

    assert_eq!(outcome, EngineOutcome::GovernanceApplied);
    assert_eq!(
        std::fs::read_to_string(out_path).expect("read"),
        "All beads get reviews."
    );
}

#[test]
fn update_governance_surfaces_local_agent_failure() {
    let ws = TestWorkspace::new().expect("workspace");
    let mut cfg = ws.engine_config(Mode::UpdateGovernance);
    cfg.issue_body = Some("### Proposed Constitution Update\nText.".to_string());

    let err = run_engine(
        &cfg,
        &ws.file_config(),
        &RecordingDispatcher::default(),
        &FailingPublisher,
    )
    .expect_err("publisher fails");

    assert!(matches!(err, EngineError::LocalAgent(_)));
}
