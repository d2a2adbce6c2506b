use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const MANIFEST_FILENAME: &str = "manifest.json";

/// One packaged artifact as recorded in the distribution manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub target: String,
    pub file: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub built_at_utc: String,
}

impl ArtifactEntry {
    /// Describe a packaged artifact on disk.
    pub fn describe(target: &str, artifact: &Path) -> Result<Self> {
        let (sha256, size_bytes) = hash_file(artifact)?;
        let file = artifact
            .file_name()
            .and_then(|part| part.to_str())
            .ok_or_else(|| anyhow::anyhow!("artifact '{}' has no file name", artifact.display()))?
            .to_string();
        let built_at_utc = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .context("formatting build timestamp")?;
        Ok(Self {
            target: target.to_string(),
            file,
            size_bytes,
            sha256,
            built_at_utc,
        })
    }
}

/// Write the distribution manifest listing every packaged artifact.
pub fn write_manifest(dist: &Path, entries: &[ArtifactEntry]) -> Result<PathBuf> {
    let path = dist.join(MANIFEST_FILENAME);
    let mut json = serde_json::to_string_pretty(entries).context("encoding manifest")?;
    json.push('\n');
    fs::write(&path, json).with_context(|| format!("writing manifest '{}'", path.display()))?;
    Ok(path)
}

fn hash_file(path: &Path) -> Result<(String, u64)> {
    let file = File::open(path).with_context(|| format!("opening artifact '{}'", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    let mut size = 0u64;
    loop {
        let n = reader
            .read(&mut buf)
            .with_context(|| format!("reading artifact '{}'", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }
    Ok((format!("{:x}", hasher.finalize()), size))
}
