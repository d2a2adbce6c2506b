//! Target assembly: build environment, per-target trees, task wiring.

pub mod styles;
pub mod targets;
pub mod tasks;

use std::path::PathBuf;

use anyhow::Result;

use crate::build::targets::Browser;
use crate::pipeline::config::Config;

/// Scratch area for per-target intermediate trees.
pub const SCRATCH_DIR: &str = "tmp";
/// Distribution directory for final artifacts.
pub const DIST_DIR: &str = "dist";
/// Source roots re-armed by watch mode.
pub const WATCH_ROOTS: &[&str] = &["src", "libs"];

/// Everything a task action needs: the project root and its
/// configuration. Created once per invocation.
pub struct BuildEnv {
    pub root: PathBuf,
    pub config: Config,
}

impl BuildEnv {
    pub fn new(root: PathBuf) -> Result<Self> {
        let config = Config::load(&root)?;
        Ok(Self { root, config })
    }

    pub fn scratch(&self) -> PathBuf {
        self.root.join(SCRATCH_DIR)
    }

    pub fn dist(&self) -> PathBuf {
        self.root.join(DIST_DIR)
    }

    /// Scratch subdirectory holding one target's assembled tree. Targets
    /// write only under their own subdirectory, so independent branches
    /// never contend for paths.
    pub fn target_dir(&self, browser: Browser) -> PathBuf {
        self.scratch().join(browser.id())
    }

    /// File name of the assembled bundle with `extension`, e.g.
    /// `webext.js`.
    pub fn bundle(&self, extension: &str) -> String {
        format!("{}.{}", self.config.project.name, extension)
    }
}
