//! Styled-assets bundle.
//!
//! Stylesheet compilation is delegated to the external compiler; the
//! result lands at `tmp/<name>.css`, which the target trees copy.

use std::fs;
use std::process::Command;

use anyhow::{bail, Context, Result};

use crate::artifact::process::run_tool;
use crate::build::BuildEnv;

pub fn build_styles(env: &BuildEnv) -> Result<()> {
    let entry = env.root.join(&env.config.styles.entry);
    if !entry.is_file() {
        bail!("missing stylesheet entry '{}'", entry.display());
    }
    let scratch = env.scratch();
    fs::create_dir_all(&scratch)
        .with_context(|| format!("creating scratch directory '{}'", scratch.display()))?;
    let out = scratch.join(env.bundle("css"));

    let mut command = Command::new(&env.config.styles.compiler);
    command.arg(&entry).arg(&out);
    run_tool(command, &env.config.styles.compiler)?;

    if !out.is_file() {
        bail!(
            "stylesheet compiler finished but '{}' is missing",
            out.display()
        );
    }
    Ok(())
}
