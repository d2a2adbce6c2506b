//! Preflight checks for external collaborators.
//!
//! Validates that the host has the tools a command is about to spawn, so
//! a run fails up front with an install hint instead of a mid-build spawn
//! error.

use anyhow::{bail, Result};

use crate::pipeline::config::Config;

/// Check if a command is resolvable on PATH.
pub fn command_exists(tool: &str) -> bool {
    which::which(tool).is_ok()
}

/// Check that specific tools are available.
///
/// Each tuple is (command, install hint).
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let mut missing = Vec::new();

    for (tool, hint) in tools {
        if !command_exists(tool) {
            missing.push((*tool, *hint));
        }
    }

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|(tool, hint)| format!("  {} (install: {})", tool, hint))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Missing required host tools:\n{}", msg);
    }

    Ok(())
}

/// Tools a full build spawns.
pub fn check_build_tools(config: &Config) -> Result<()> {
    check_required_tools(&[(config.styles.compiler.as_str(), "less")])
}

/// Tools the distribution tasks spawn, on top of the build tools.
pub fn check_dist_tools(config: &Config) -> Result<()> {
    check_required_tools(&[
        (config.tools.signer.as_str(), "the signing browser"),
        (config.tools.packer.as_str(), "the extension SDK"),
    ])
}
