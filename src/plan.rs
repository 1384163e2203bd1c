//! Plan section extraction by bead marker.
//!
//! `plan.md` is one concatenated document; each section opens with a heading
//! line carrying a marker comment tying it to a backlog item:
//!
//! ```markdown
//! ## Setup the pipeline <!-- bead:pm-42 -->
//! Body text until the next `##` heading.
//! ```
//!
//! Extraction is a single line scan rather than one monolithic pattern, so
//! the edge cases (heading at end of document, missing trailing newline) are
//! explicit.

use crate::error::{EngineError, Result};

/// A line opening a plan section. `###` sub-headings also start with this
/// prefix and therefore terminate a section, matching the original
/// convention.
const HEADING_PREFIX: &str = "##";

fn is_heading(line: &str) -> bool {
    line.starts_with(HEADING_PREFIX)
}

/// Extract the body of the plan section marked `bead:<task_id>`.
///
/// Returns the text between the marked heading line and the next heading
/// line (or end of document), trimmed. If multiple headings carry the same
/// marker only the first governs; duplicates are not validated. That
/// mirrors the established document convention and is a latent defect if a
/// plan ever repeats a bead id.
pub fn extract_section(plan: &str, task_id: &str) -> Result<String> {
    let marker = format!("<!-- bead:{task_id} -->");

    let lines: Vec<&str> = plan.lines().collect();
    for (idx, line) in lines.iter().copied().enumerate() {
        if is_heading(line) && line.contains(&marker) {
            let body: Vec<&str> = lines[idx + 1..]
                .iter()
                .copied()
                .take_while(|&l| !is_heading(l))
                .collect();
            return Ok(body.join("\n").trim().to_string());
        }
    }

    Err(EngineError::PlanSectionNotFound {
        task_id: task_id.to_string(),
    })
}
