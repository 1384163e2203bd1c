//! Automation engine bridging a beads backlog and a spec-kit planning
//! directory with the Jules remote coding-agent session API.
//!
//! One invocation handles exactly one unit of work, selected by mode:
//!
//! - **create-specification**: split a human issue body into specification
//!   and plan text and dispatch a formalization prompt.
//! - **advance-next-task**: pick the first ready bead, assemble its context
//!   (task record, matching plan section, constitution) and dispatch an
//!   execution prompt.
//! - **update-governance**: extract a proposed constitution update from an
//!   issue body and publish it remotely or via a local agent CLI.
//!
//! The architecture separates pure text extraction ([`plan`], [`issue`],
//! [`backlog::parse_ready_output`]) from side-effecting collaborators
//! ([`process`], [`dispatch`], [`governance`]), which sit behind traits so
//! tests can script them. [`engine`] coordinates both to implement the
//! modes.

pub mod backlog;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod exit_codes;
pub mod governance;
pub mod issue;
pub mod logging;
pub mod plan;
pub mod process;
pub mod prompt;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod workspace;
