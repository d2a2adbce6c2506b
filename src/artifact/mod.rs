//! Platform packagers.
//!
//! Each packager turns a fully assembled, platform-conditioned tree into
//! that target's final artifact: an in-process zip archive, or an external
//! signing/packing tool driven by arguments and judged by exit code. The
//! engine only ever sees the [`Packager`] capability, never a specific
//! tool's argument syntax.

pub mod archive;
pub mod installer;
pub mod manifest;
pub(crate) mod process;
pub mod signer;

use std::path::{Path, PathBuf};

use anyhow::Result;

pub use process::ToolFailure;

/// Package `tree` for one target, yielding the artifact path.
///
/// Artifacts are written wholesale into `dist` and never mutated
/// afterward; a rebuild overwrites them.
pub trait Packager {
    fn package(&self, tree: &Path, dist: &Path) -> Result<PathBuf>;
}
