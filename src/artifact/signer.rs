use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};

use crate::artifact::process::run_tool;
use crate::artifact::Packager;

/// Signed-binary packaging: drive the browser's extension packer over an
/// assembled tree with a private key, then move the signed binary into
/// the distribution directory.
///
/// The packer writes its output next to the input tree (`<tree>.crx`).
#[derive(Debug, Clone)]
pub struct ExtensionSigner {
    pub signer: String,
    pub key: PathBuf,
    pub filename: String,
}

impl ExtensionSigner {
    /// Resolve the signing key under the invoking user's home directory.
    pub fn with_home_key(signer: &str, key_rel: &str, filename: &str) -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("cannot locate a home directory for the signing key"))?;
        Ok(Self {
            signer: signer.to_string(),
            key: home.join(key_rel),
            filename: filename.to_string(),
        })
    }
}

impl Packager for ExtensionSigner {
    fn package(&self, tree: &Path, dist: &Path) -> Result<PathBuf> {
        if !tree.is_dir() {
            bail!("missing assembled tree '{}'", tree.display());
        }
        if !self.key.is_file() {
            bail!("missing signing key '{}'", self.key.display());
        }

        let mut command = Command::new(&self.signer);
        command
            .arg(format!("--pack-extension={}", tree.display()))
            .arg(format!("--pack-extension-key={}", self.key.display()));
        run_tool(command, &self.signer)?;

        let produced = tree.with_extension("crx");
        if !produced.is_file() {
            bail!(
                "signer finished but the signed binary '{}' is missing",
                produced.display()
            );
        }
        fs::create_dir_all(dist)
            .with_context(|| format!("creating distribution directory '{}'", dist.display()))?;
        let out = dist.join(&self.filename);
        fs::rename(&produced, &out).with_context(|| {
            format!(
                "moving signed binary '{}' -> '{}'",
                produced.display(),
                out.display()
            )
        })?;
        Ok(out)
    }
}

/// Republish one target's artifact under another target's file name: the
/// sibling target ships the same signed payload with a different
/// extension.
pub fn republish_as(source: &Path, dist: &Path, filename: &str) -> Result<PathBuf> {
    if !source.is_file() {
        bail!("missing source artifact '{}'", source.display());
    }
    fs::create_dir_all(dist)
        .with_context(|| format!("creating distribution directory '{}'", dist.display()))?;
    let out = dist.join(filename);
    fs::copy(source, &out).with_context(|| {
        format!(
            "copying artifact '{}' -> '{}'",
            source.display(),
            out.display()
        )
    })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_key_is_fatal_before_spawning() {
        let temp = TempDir::new().unwrap();
        let tree = temp.path().join("chrome");
        fs::create_dir_all(&tree).unwrap();

        let signer = ExtensionSigner {
            signer: "definitely_not_a_real_browser".to_string(),
            key: temp.path().join("no-such.pem"),
            filename: "chrome.crx".to_string(),
        };
        let err = signer
            .package(&tree, &temp.path().join("dist"))
            .unwrap_err();
        assert!(err.to_string().contains("missing signing key"));
    }

    #[test]
    fn signer_output_is_relocated() {
        let temp = TempDir::new().unwrap();
        let tree = temp.path().join("chrome");
        fs::create_dir_all(&tree).unwrap();
        let key = temp.path().join("key.pem");
        fs::write(&key, "fake key").unwrap();

        // Stand-in signer that ignores its arguments and exits 0; the
        // expected sibling output is dropped in place beforehand.
        let signer = ExtensionSigner {
            signer: "true".to_string(),
            key,
            filename: "chrome.crx".to_string(),
        };
        fs::write(tree.with_extension("crx"), "signed bytes").unwrap();

        let out = signer.package(&tree, &temp.path().join("dist")).unwrap();
        assert_eq!(out, temp.path().join("dist/chrome.crx"));
        assert_eq!(fs::read_to_string(&out).unwrap(), "signed bytes");
        assert!(!tree.with_extension("crx").exists());
    }

    #[test]
    fn republish_copies_under_new_name() {
        let temp = TempDir::new().unwrap();
        let dist = temp.path().join("dist");
        fs::create_dir_all(&dist).unwrap();
        fs::write(dist.join("chrome.crx"), "payload").unwrap();

        let out = republish_as(&dist.join("chrome.crx"), &dist, "opera.nex").unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "payload");
        assert!(dist.join("chrome.crx").is_file());
    }

    #[test]
    fn republish_requires_the_source_artifact() {
        let temp = TempDir::new().unwrap();
        let err = republish_as(
            &temp.path().join("dist/chrome.crx"),
            &temp.path().join("dist"),
            "opera.nex",
        )
        .unwrap_err();
        assert!(err.to_string().contains("missing source artifact"));
    }
}
