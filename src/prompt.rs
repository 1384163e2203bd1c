//! Prompt rendering for outbound sessions.
//!
//! Each mode has a markdown template compiled into the binary; rendering
//! fills in the extracted context. Templates are checked at construction, so
//! a broken template fails fast rather than mid-pipeline.

use anyhow::{Context, Result};
use minijinja::{Environment, context};

use crate::backlog::TaskRecord;

const ADVANCE_TEMPLATE: &str = include_str!("prompts/advance.md");
const CREATE_SPEC_TEMPLATE: &str = include_str!("prompts/create_spec.md");
const CONSTITUTION_TEMPLATE: &str = include_str!("prompts/constitution.md");

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("advance", ADVANCE_TEMPLATE)
            .expect("advance template should be valid");
        env.add_template("create_spec", CREATE_SPEC_TEMPLATE)
            .expect("create_spec template should be valid");
        env.add_template("constitution", CONSTITUTION_TEMPLATE)
            .expect("constitution template should be valid");
        Self { env }
    }

    /// Execution prompt for advance-next-task: the raw task record, its plan
    /// section, the constitution, and the standing system instruction.
    pub fn render_advance(
        &self,
        task: &TaskRecord,
        plan_context: &str,
        constitution: &str,
    ) -> Result<String> {
        let task_json =
            serde_json::to_string_pretty(task).context("serialize task record")?;
        let template = self.env.get_template("advance")?;
        let rendered = template.render(context! {
            task_id => task.id.as_str(),
            task_json => task_json,
            plan_context => plan_context.trim(),
            constitution => constitution.trim(),
        })?;
        Ok(rendered)
    }

    /// Formalization prompt for create-specification. The instruction
    /// branches on whether the issue supplied a technical plan.
    pub fn render_create_spec(&self, specification: &str, plan: Option<&str>) -> Result<String> {
        let template = self.env.get_template("create_spec")?;
        let rendered = template.render(context! {
            specification => specification.trim(),
            plan => plan.map(str::trim).filter(|p| !p.is_empty()),
        })?;
        Ok(rendered)
    }

    /// Remote-realization prompt for update-governance.
    pub fn render_constitution_update(&self, update: &str) -> Result<String> {
        let template = self.env.get_template("constitution")?;
        let rendered = template.render(context! { update => update.trim() })?;
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn task() -> TaskRecord {
        TaskRecord {
            id: "pm-42".to_string(),
            title: Some("Setup".to_string()),
            extra: Map::new(),
        }
    }

    #[test]
    fn advance_prompt_embeds_all_context() {
        let engine = PromptEngine::new();
        let prompt = engine
            .render_advance(&task(), "Do X.", "Rule one.")
            .expect("render");
        assert!(prompt.contains("\"id\": \"pm-42\""));
        assert!(prompt.contains("Do X."));
        assert!(prompt.contains("Rule one."));
        assert!(prompt.contains("bd close pm-42"));
        assert!(prompt.contains("commit"));
    }

    #[test]
    fn create_spec_with_plan_asks_for_beads() {
        let engine = PromptEngine::new();
        let prompt = engine
            .render_create_spec("Build a widget.", Some("Use gears."))
            .expect("render");
        assert!(prompt.contains("Build a widget."));
        assert!(prompt.contains("Use gears."));
        assert!(prompt.contains("dependency-ordered"));
    }

    #[test]
    fn create_spec_without_plan_asks_for_review_and_no_beads() {
        let engine = PromptEngine::new();
        let prompt = engine
            .render_create_spec("Build a widget.", None)
            .expect("render");
        assert!(prompt.contains("human review"));
        assert!(prompt.contains("not create any beads"));
        assert!(!prompt.contains("dependency-ordered"));
    }

    #[test]
    fn blank_plan_counts_as_absent() {
        let engine = PromptEngine::new();
        let prompt = engine
            .render_create_spec("Build a widget.", Some("   "))
            .expect("render");
        assert!(prompt.contains("human review"));
    }

    #[test]
    fn constitution_prompt_quotes_the_update() {
        let engine = PromptEngine::new();
        let prompt = engine
            .render_constitution_update("All beads get reviews.")
            .expect("render");
        assert!(prompt.contains("All beads get reviews."));
        assert!(prompt.contains("constitution update"));
    }
}
