//! Streaming file-transform pipeline.
//!
//! A pipeline run resolves a [`fileset::FileSet`] into an ordered list of
//! concrete files, threads it through a declared sequence of
//! [`transform::Transform`] steps, and writes the results under a
//! destination directory. Declared order is load-bearing: it governs the
//! concatenation order of merged outputs.

pub mod config;
pub mod fileset;
pub mod preprocess;
pub mod template;
pub mod transform;
