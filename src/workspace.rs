//! Spec-kit workspace layout and document reads.
//!
//! A ProdMill workspace carries a `.spec-kit/` directory (plan, constitution,
//! engine config) and a `.beads/` directory owned by the tracker tool. The
//! engine only checks that both exist; `.beads/` contents are the tracker's
//! business.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::error::{EngineError, Result};

/// Canonical paths within a workspace root.
#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    pub root: PathBuf,
    pub spec_kit_dir: PathBuf,
    pub beads_dir: PathBuf,
    pub plan_path: PathBuf,
    pub constitution_path: PathBuf,
    pub engine_config_path: PathBuf,
}

impl WorkspacePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let spec_kit_dir = root.join(".spec-kit");
        Self {
            beads_dir: root.join(".beads"),
            plan_path: spec_kit_dir.join("plan.md"),
            constitution_path: spec_kit_dir.join("constitution.md"),
            engine_config_path: spec_kit_dir.join("engine.toml"),
            spec_kit_dir,
            root,
        }
    }

    /// Require both `.spec-kit/` and `.beads/` to exist.
    pub fn check_layout(&self) -> Result<()> {
        let mut missing = Vec::new();
        if !self.spec_kit_dir.is_dir() {
            missing.push(".spec-kit");
        }
        if !self.beads_dir.is_dir() {
            missing.push(".beads");
        }
        if missing.is_empty() {
            return Ok(());
        }
        Err(EngineError::MissingWorkspaceStructure(format!(
            "{} under {}",
            missing.join(" and "),
            self.root.display()
        )))
    }

    /// Read the plan document in full.
    pub fn read_plan(&self) -> Result<String> {
        let text = fs::read_to_string(&self.plan_path)
            .with_context(|| format!("read {}", self.plan_path.display()))?;
        Ok(text)
    }

    /// Read the constitution in full. Opaque text, never mutated here.
    pub fn read_constitution(&self) -> Result<String> {
        let text = fs::read_to_string(&self.constitution_path)
            .with_context(|| format!("read {}", self.constitution_path.display()))?;
        Ok(text)
    }
}
