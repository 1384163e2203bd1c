//! Issue body sectioning by fixed headings.
//!
//! Human-submitted issues carry named sections under fixed, case-sensitive
//! markdown headings. Matching is purely textual: a heading matches when a
//! line equals the heading string (modulo surrounding whitespace), first
//! occurrence wins. A missing heading yields an empty section; whether that
//! is an error is the calling mode's decision.

pub const SPECIFICATION_HEADING: &str = "### Product Specification";
pub const PLAN_HEADING: &str = "### Technical Plan";
pub const CONSTITUTION_UPDATE_HEADING: &str = "### Proposed Constitution Update";

/// Specification/plan pair extracted from one issue body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueSections {
    /// Text between the specification heading and the plan heading (or end
    /// of text). Empty when the heading is absent.
    pub specification: String,
    /// Text after the plan heading, to end of text. Empty when absent.
    pub plan: String,
}

/// Split an issue body into its specification and plan sections.
pub fn split_spec_and_plan(body: &str) -> IssueSections {
    IssueSections {
        specification: section_between(body, SPECIFICATION_HEADING, Some(PLAN_HEADING)),
        plan: section_between(body, PLAN_HEADING, None),
    }
}

/// Capture the lines after the first occurrence of `heading`, stopping
/// before `until` (when given) or end of text. Trimmed; empty when the
/// heading is absent.
pub fn section_between(body: &str, heading: &str, until: Option<&str>) -> String {
    let mut lines = body.lines().skip_while(|line| line.trim() != heading);
    if lines.next().is_none() {
        return String::new();
    }
    let captured: Vec<&str> = match until {
        Some(stop) => lines.take_while(|line| line.trim() != stop).collect(),
        None => lines.collect(),
    };
    captured.join("\n").trim().to_string()
}
