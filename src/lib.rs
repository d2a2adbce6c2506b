//! Build orchestration for cross-browser extension packages.
//!
//! One shared source tree feeds four target platforms (Chrome, Opera,
//! Firefox, Safari), each with its own file layout, conditional code
//! inclusion, and final artifact format. The crate provides:
//!
//! - **Task graph** - named build steps with explicit dependencies,
//!   validated (unknown deps, cycles) and executed in dependency order
//! - **Transform pipeline** - ordered file selection threaded through
//!   composable transforms: concatenation, conditional preprocessing,
//!   template inlining
//! - **Platform packagers** - zip archiving, external signing and
//!   installer packing behind one capability
//! - **Preflight checks** - host tool validation before builds
//! - **Watch mode** - rebuild-on-change wrapper loop around the graph
//!
//! # Layout contract
//!
//! ```text
//! src/, libs/, icons/     shared source tree
//! tmp/                    scratch area, one subdirectory per target
//! dist/                   final artifacts, one per target
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use webext_builder::build::{tasks, BuildEnv};
//! use webext_builder::graph;
//!
//! let env = BuildEnv::new(std::env::current_dir()?)?;
//! let registry = tasks::registry(&env)?;
//! graph::run(&registry, "chrome")?;
//! ```

pub mod artifact;
pub mod build;
pub mod graph;
pub mod pipeline;
pub mod preflight;
pub mod watch;

pub use build::targets::Browser;
pub use build::BuildEnv;
pub use graph::TaskGraph;
pub use pipeline::config::Config;
pub use pipeline::preprocess::BuildContext;
