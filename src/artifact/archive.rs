use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::CompressionMethod;
use zip::ZipWriter;

use crate::artifact::Packager;

/// Flat-archive packaging: compress an assembled tree into one zip file.
///
/// Entries are walked in sorted order so rebuilding an unchanged tree
/// produces the same entry sequence.
#[derive(Debug, Clone)]
pub struct ZipArchive {
    pub filename: String,
}

impl ZipArchive {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
        }
    }
}

impl Packager for ZipArchive {
    fn package(&self, tree: &Path, dist: &Path) -> Result<PathBuf> {
        if !tree.is_dir() {
            bail!("missing assembled tree '{}'", tree.display());
        }
        fs::create_dir_all(dist)
            .with_context(|| format!("creating distribution directory '{}'", dist.display()))?;
        let out = dist.join(&self.filename);
        let file = File::create(&out)
            .with_context(|| format!("creating archive '{}'", out.display()))?;
        let mut writer = ZipWriter::new(file);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in WalkDir::new(tree).sort_by_file_name() {
            let entry =
                entry.with_context(|| format!("walking assembled tree '{}'", tree.display()))?;
            let rel = entry
                .path()
                .strip_prefix(tree)
                .with_context(|| format!("relativizing '{}'", entry.path().display()))?;
            if rel.as_os_str().is_empty() {
                continue;
            }
            let name = rel.to_string_lossy().replace('\\', "/");
            if entry.file_type().is_dir() {
                writer
                    .add_directory(format!("{name}/"), options)
                    .with_context(|| format!("adding directory '{name}' to archive"))?;
            } else {
                writer
                    .start_file(name.clone(), options)
                    .with_context(|| format!("adding '{name}' to archive"))?;
                let bytes = fs::read(entry.path())
                    .with_context(|| format!("reading '{}'", entry.path().display()))?;
                writer
                    .write_all(&bytes)
                    .with_context(|| format!("writing '{name}' into archive"))?;
            }
        }
        writer
            .finish()
            .with_context(|| format!("finalizing archive '{}'", out.display()))?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn packs_tree_into_zip() {
        let temp = TempDir::new().unwrap();
        let tree = temp.path().join("chrome");
        fs::create_dir_all(tree.join("icons")).unwrap();
        fs::write(tree.join("app.js"), "const X = 1").unwrap();
        fs::write(tree.join("icons/icon.png"), [9u8, 8, 7]).unwrap();

        let out = ZipArchive::new("chrome.zip")
            .package(&tree, &temp.path().join("dist"))
            .unwrap();
        assert_eq!(out.file_name().unwrap(), "chrome.zip");

        let mut reader = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
        let names: Vec<String> = (0..reader.len())
            .map(|i| reader.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"app.js".to_string()));
        assert!(names.contains(&"icons/icon.png".to_string()));

        let mut contents = String::new();
        reader
            .by_name("app.js")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "const X = 1");
    }

    #[test]
    fn missing_tree_is_fatal() {
        let temp = TempDir::new().unwrap();
        let err = ZipArchive::new("x.zip")
            .package(&temp.path().join("nope"), &temp.path().join("dist"))
            .unwrap_err();
        assert!(err.to_string().contains("missing assembled tree"));
    }

    #[test]
    fn rebuild_overwrites_the_artifact() {
        let temp = TempDir::new().unwrap();
        let tree = temp.path().join("tree");
        fs::create_dir_all(&tree).unwrap();
        fs::write(tree.join("a.txt"), "one").unwrap();

        let dist = temp.path().join("dist");
        let packager = ZipArchive::new("t.zip");
        packager.package(&tree, &dist).unwrap();

        fs::write(tree.join("a.txt"), "two").unwrap();
        let out = packager.package(&tree, &dist).unwrap();

        let mut reader = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
        let mut contents = String::new();
        reader
            .by_name("a.txt")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "two");
    }
}
