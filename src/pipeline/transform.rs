use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::pipeline::fileset::FileSet;

/// One file flowing through a transform pipeline. `path` is relative to
/// the pipeline's destination directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }

    /// Contents as UTF-8, for text transforms.
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.contents)
            .with_context(|| format!("file '{}' is not valid UTF-8", self.path.display()))
    }
}

/// A pipeline step: consume the ordered file list, produce the next one.
/// A step may rename, merge, split, or rewrite files; a step that cannot
/// process an input fails the whole pipeline run.
pub trait Transform {
    fn apply(&self, input: Vec<SourceFile>) -> Result<Vec<SourceFile>>;
}

/// Merge all inputs into one output, preserving input order, with a
/// newline between files.
#[derive(Debug, Clone)]
pub struct Concat {
    pub output: PathBuf,
}

impl Concat {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
        }
    }
}

impl Transform for Concat {
    fn apply(&self, input: Vec<SourceFile>) -> Result<Vec<SourceFile>> {
        let mut merged = Vec::new();
        for (index, file) in input.iter().enumerate() {
            if index > 0 {
                merged.push(b'\n');
            }
            merged.extend_from_slice(&file.contents);
        }
        Ok(vec![SourceFile::new(self.output.clone(), merged)])
    }
}

/// Rename a single file.
#[derive(Debug, Clone)]
pub struct Rename {
    pub to: PathBuf,
}

impl Rename {
    pub fn new(to: impl Into<PathBuf>) -> Self {
        Self { to: to.into() }
    }
}

impl Transform for Rename {
    fn apply(&self, mut input: Vec<SourceFile>) -> Result<Vec<SourceFile>> {
        match input.len() {
            1 => {
                input[0].path = self.to.clone();
                Ok(input)
            }
            n => bail!("rename expects exactly one file, got {n}"),
        }
    }
}

/// Resolve `set` against `root`, thread the files through `steps` in
/// declared order, and write the results under `dest`. Returns the written
/// paths.
pub fn run(
    root: &Path,
    set: &FileSet,
    steps: &[&dyn Transform],
    dest: &Path,
) -> Result<Vec<PathBuf>> {
    let mut files = load(root, set)?;
    for step in steps {
        files = step.apply(files)?;
    }
    write(dest, &files)
}

/// Copy a selection under `dest` without transforming it.
pub fn copy(root: &Path, set: &FileSet, dest: &Path) -> Result<Vec<PathBuf>> {
    run(root, set, &[], dest)
}

fn load(root: &Path, set: &FileSet) -> Result<Vec<SourceFile>> {
    let mut files = Vec::new();
    for selected in set.resolve(root)? {
        let contents = fs::read(&selected.abs)
            .with_context(|| format!("reading source file '{}'", selected.abs.display()))?;
        files.push(SourceFile::new(selected.rel, contents));
    }
    Ok(files)
}

fn write(dest: &Path, files: &[SourceFile]) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let path = dest.join(&file.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating output directory '{}'", parent.display()))?;
        }
        fs::write(&path, &file.contents)
            .with_context(|| format!("writing output file '{}'", path.display()))?;
        written.push(path);
    }
    Ok(written)
}
