use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use glob::Pattern;

/// One entry of an ordered selection: an include or exclude pattern,
/// relative to the project root.
#[derive(Debug, Clone)]
struct SelectPattern {
    pattern: String,
    exclude: bool,
}

/// A concrete file selected by a [`FileSet`].
///
/// `rel` is the path relative to the pattern's base (the directory part
/// before the first wildcard component), which is the path the file keeps
/// under a pipeline's destination directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub rel: PathBuf,
    pub abs: PathBuf,
}

/// Ordered include/exclude patterns selecting the files for one pipeline
/// run. Later exclusions override earlier inclusions. Ephemeral: a set is
/// built, resolved once, and dropped.
#[derive(Debug, Clone, Default)]
pub struct FileSet {
    patterns: Vec<SelectPattern>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from patterns in declared order. A leading `!` marks an
    /// exclusion.
    pub fn from_list<S: AsRef<str>>(patterns: impl IntoIterator<Item = S>) -> Self {
        let mut set = Self::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            set = match pattern.strip_prefix('!') {
                Some(rest) => set.exclude(rest),
                None => set.include(pattern),
            };
        }
        set
    }

    pub fn include(mut self, pattern: &str) -> Self {
        self.patterns.push(SelectPattern {
            pattern: pattern.to_string(),
            exclude: false,
        });
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.patterns.push(SelectPattern {
            pattern: pattern.to_string(),
            exclude: true,
        });
        self
    }

    /// Resolve the selection against `root` into an ordered file list.
    ///
    /// Inclusion order is declared order; matches of a single wildcard
    /// pattern are sorted so the result never depends on directory listing
    /// order. A literal include that matches no file is a fatal error
    /// naming the path; a wildcard include may match nothing.
    pub fn resolve(&self, root: &Path) -> Result<Vec<SelectedFile>> {
        let mut selected: Vec<SelectedFile> = Vec::new();
        for entry in &self.patterns {
            if entry.exclude {
                let matcher = Pattern::new(&entry.pattern)
                    .with_context(|| format!("invalid exclude pattern '{}'", entry.pattern))?;
                selected.retain(|file| {
                    file.abs
                        .strip_prefix(root)
                        .map(|rel| !matcher.matches_path(rel))
                        .unwrap_or(true)
                });
            } else if has_wildcard(&entry.pattern) {
                resolve_wildcard(root, &entry.pattern, &mut selected)?;
            } else {
                let abs = root.join(&entry.pattern);
                if !abs.is_file() {
                    bail!("missing source file '{}'", abs.display());
                }
                let rel = abs
                    .file_name()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(&entry.pattern));
                push_unique(&mut selected, SelectedFile { rel, abs });
            }
        }
        Ok(selected)
    }
}

fn resolve_wildcard(root: &Path, pattern: &str, selected: &mut Vec<SelectedFile>) -> Result<()> {
    let base_dir = root.join(pattern_base(pattern));
    let full = root.join(pattern);
    let full = full
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("non-UTF-8 include pattern '{pattern}'"))?;

    let mut matches = Vec::new();
    for hit in glob::glob(full).with_context(|| format!("invalid include pattern '{pattern}'"))? {
        let path = hit.with_context(|| format!("reading matches for pattern '{pattern}'"))?;
        if !path.is_file() {
            continue;
        }
        let rel = path.strip_prefix(&base_dir).unwrap_or(&path).to_path_buf();
        matches.push(SelectedFile { rel, abs: path });
    }
    matches.sort_by(|a, b| a.abs.cmp(&b.abs));
    for file in matches {
        push_unique(selected, file);
    }
    Ok(())
}

fn push_unique(selected: &mut Vec<SelectedFile>, file: SelectedFile) {
    if !selected.iter().any(|existing| existing.abs == file.abs) {
        selected.push(file);
    }
}

fn has_wildcard(text: &str) -> bool {
    text.chars().any(|c| matches!(c, '*' | '?' | '['))
}

/// Directory part of a pattern before its first wildcard component.
fn pattern_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    for part in Path::new(pattern).components() {
        if has_wildcard(&part.as_os_str().to_string_lossy()) {
            break;
        }
        base.push(part);
    }
    base
}
