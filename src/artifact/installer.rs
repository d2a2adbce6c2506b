use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};

use crate::artifact::process::run_tool;
use crate::artifact::Packager;

/// Installer packaging: run the external extension packer inside the
/// assembled tree, writing the package into the distribution directory.
#[derive(Debug, Clone)]
pub struct InstallerPacker {
    pub packer: String,
    pub filename: String,
}

impl Packager for InstallerPacker {
    fn package(&self, tree: &Path, dist: &Path) -> Result<PathBuf> {
        if !tree.is_dir() {
            bail!("missing assembled tree '{}'", tree.display());
        }
        fs::create_dir_all(dist)
            .with_context(|| format!("creating distribution directory '{}'", dist.display()))?;
        // The packer runs with the tree as its working directory, so the
        // output path must stay valid from there.
        let dist = dist
            .canonicalize()
            .with_context(|| format!("resolving distribution directory '{}'", dist.display()))?;
        let out = dist.join(&self.filename);

        let mut command = Command::new(&self.packer);
        command
            .arg("xpi")
            .arg(format!("--output-file={}", out.display()))
            .current_dir(tree);
        run_tool(command, &self.packer)?;

        if !out.is_file() {
            bail!(
                "packer finished but the package '{}' is missing",
                out.display()
            );
        }
        Ok(out)
    }
}
