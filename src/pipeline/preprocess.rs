use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};

use crate::pipeline::transform::{SourceFile, Transform};

/// Conditional flags understood by the source tree, one per target
/// platform.
pub const PLATFORM_FLAGS: &[&str] = &["CHROME", "OPERA", "FIREFOX", "SAFARI"];

/// The set of conditional flags active for one target's build.
///
/// Constructed once per target and immutable during that build. A
/// directive naming a flag outside [`PLATFORM_FLAGS`] fails the build
/// instead of silently passing through.
#[derive(Debug, Clone)]
pub struct BuildContext {
    flags: BTreeMap<&'static str, bool>,
}

impl BuildContext {
    /// Context with every known flag off.
    pub fn none() -> Self {
        Self {
            flags: PLATFORM_FLAGS.iter().map(|flag| (*flag, false)).collect(),
        }
    }

    /// Context with exactly `active` on.
    pub fn with_flag(active: &str) -> Result<Self> {
        let mut ctx = Self::none();
        match ctx.flags.get_mut(active) {
            Some(slot) => {
                *slot = true;
                Ok(ctx)
            }
            None => bail!(
                "unknown conditional flag '{active}'; expected one of: {}",
                PLATFORM_FLAGS.join(", ")
            ),
        }
    }

    fn get(&self, flag: &str) -> Option<bool> {
        self.flags.get(flag).copied()
    }
}

enum Directive {
    Open(String),
    Close,
}

/// Remove directive-delimited regions whose flag is off in `ctx`.
///
/// Regions are flat (no nesting) and delimited by marker lines:
/// `// @if FLAG` .. `// @endif` in scripts, `<!-- @if FLAG -->` ..
/// `<!-- @endif -->` in markup. Marker lines never reach the output;
/// retained lines keep their original line endings.
pub fn strip_regions(source: &str, ctx: &BuildContext) -> Result<String> {
    let mut out = String::with_capacity(source.len());
    let mut open: Option<(String, bool)> = None;
    for (index, line) in source.split_inclusive('\n').enumerate() {
        let number = index + 1;
        match parse_directive(line) {
            Some(Directive::Open(flag)) => {
                if let Some((current, _)) = &open {
                    bail!("nested @if '{flag}' inside '{current}' region at line {number}");
                }
                let keep = match ctx.get(&flag) {
                    Some(keep) => keep,
                    None => bail!(
                        "unknown conditional flag '{flag}' at line {number}; expected one of: {}",
                        PLATFORM_FLAGS.join(", ")
                    ),
                };
                open = Some((flag, keep));
            }
            Some(Directive::Close) => {
                if open.take().is_none() {
                    bail!("@endif without matching @if at line {number}");
                }
            }
            None => match &open {
                Some((_, false)) => {}
                _ => out.push_str(line),
            },
        }
    }
    if let Some((flag, _)) = open {
        bail!("unterminated @if region for flag '{flag}'");
    }
    Ok(out)
}

fn parse_directive(line: &str) -> Option<Directive> {
    let text = line.trim();
    if let Some(rest) = text.strip_prefix("// @if ") {
        return Some(Directive::Open(rest.trim().to_string()));
    }
    if text == "// @endif" {
        return Some(Directive::Close);
    }
    if let Some(rest) = text.strip_prefix("<!-- @if ") {
        if let Some(flag) = rest.strip_suffix("-->") {
            return Some(Directive::Open(flag.trim().to_string()));
        }
    }
    if text == "<!-- @endif -->" {
        return Some(Directive::Close);
    }
    None
}

/// Pipeline step applying [`strip_regions`] to every file.
#[derive(Debug, Clone)]
pub struct Preprocess {
    pub ctx: BuildContext,
}

impl Transform for Preprocess {
    fn apply(&self, input: Vec<SourceFile>) -> Result<Vec<SourceFile>> {
        input
            .into_iter()
            .map(|file| {
                let stripped = strip_regions(file.text()?, &self.ctx)
                    .with_context(|| format!("preprocessing '{}'", file.path.display()))?;
                Ok(SourceFile::new(file.path, stripped))
            })
            .collect()
    }
}
