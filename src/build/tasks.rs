//! The named task registry.
//!
//! Every build command corresponds to a task here, wired into one
//! dependency graph: `clean` -> `styles` -> per-target template/script/
//! tree tasks -> the `build` group -> packaging tasks -> the `dist`
//! group task.

use std::fs;
use std::process::Command;

use anyhow::{Context, Result};

use crate::artifact::archive::ZipArchive;
use crate::artifact::installer::InstallerPacker;
use crate::artifact::manifest::{self, ArtifactEntry};
use crate::artifact::process::run_tool_streaming;
use crate::artifact::signer::{republish_as, ExtensionSigner};
use crate::artifact::Packager;
use crate::build::styles::build_styles;
use crate::build::targets::{self, Browser};
use crate::build::BuildEnv;
use crate::graph::TaskGraph;

const CHROME_ZIP: &str = "chrome.zip";
const CHROME_CRX: &str = "chrome.crx";
const OPERA_NEX: &str = "opera.nex";
const FIREFOX_XPI: &str = "firefox.xpi";

/// Construct the full task graph over `env`.
pub fn registry(env: &BuildEnv) -> Result<TaskGraph<'_>> {
    let mut graph = TaskGraph::new();

    graph.task("clean", &[], move || clean(env))?;
    graph.task("styles", &["clean"], move || build_styles(env))?;

    for browser in [Browser::Chrome, Browser::Safari, Browser::Firefox] {
        let template = format!("{}:template", browser.id());
        let scripts = format!("{}:js", browser.id());
        graph.task(&template, &["styles"], move || {
            targets::build_template(env, browser)
        })?;
        graph.task(&scripts, &[template.as_str()], move || {
            targets::build_scripts(env, browser)
        })?;
        graph.task(browser.id(), &[scripts.as_str()], move || {
            targets::assemble_tree(env, browser)
        })?;
    }
    // Opera ships the finished chrome tree under its own name.
    graph.task("opera", &["chrome"], move || {
        targets::assemble_tree(env, Browser::Opera)
    })?;

    graph.group(
        "build",
        &["clean", "styles", "chrome", "opera", "safari", "firefox"],
    )?;

    graph.task("chrome:zip", &["build"], move || {
        ZipArchive::new(CHROME_ZIP)
            .package(&env.target_dir(Browser::Chrome), &env.dist())
            .map(drop)
    })?;
    graph.task("chrome:crx", &["build"], move || {
        chrome_signer(env)?
            .package(&env.target_dir(Browser::Chrome), &env.dist())
            .map(drop)
    })?;
    graph.task("opera:nex", &["chrome:crx"], move || {
        republish_as(&env.dist().join(CHROME_CRX), &env.dist(), OPERA_NEX).map(drop)
    })?;
    graph.task("firefox:xpi", &["build"], move || {
        InstallerPacker {
            packer: env.config.tools.packer.clone(),
            filename: FIREFOX_XPI.to_string(),
        }
        .package(&env.target_dir(Browser::Firefox), &env.dist())
        .map(drop)
    })?;
    // Per-target distribution groups, plus the everything group that also
    // records the manifest. Safari has no file artifact: its distribution
    // shape is the assembled `.safariextension` tree.
    graph.group("chrome:dist", &["chrome:zip", "chrome:crx"])?;
    graph.group("opera:dist", &["opera:nex"])?;
    graph.group("firefox:dist", &["firefox:xpi"])?;
    graph.task(
        "dist",
        &["chrome:dist", "opera:dist", "firefox:dist"],
        move || write_dist_manifest(env),
    )?;

    graph.task("test", &["build"], move || run_tests(env))?;

    Ok(graph)
}

fn chrome_signer(env: &BuildEnv) -> Result<ExtensionSigner> {
    ExtensionSigner::with_home_key(
        &env.config.tools.signer,
        &env.config.tools.signing_key,
        CHROME_CRX,
    )
}

/// Remove the scratch area. Partial output from a failed run stays on
/// disk until this task runs.
fn clean(env: &BuildEnv) -> Result<()> {
    let scratch = env.scratch();
    if scratch.exists() {
        fs::remove_dir_all(&scratch)
            .with_context(|| format!("removing scratch directory '{}'", scratch.display()))?;
    }
    Ok(())
}

fn write_dist_manifest(env: &BuildEnv) -> Result<()> {
    let dist = env.dist();
    let mut entries = Vec::new();
    for (target, filename) in [
        ("chrome", CHROME_ZIP),
        ("chrome", CHROME_CRX),
        ("opera", OPERA_NEX),
        ("firefox", FIREFOX_XPI),
    ] {
        entries.push(ArtifactEntry::describe(target, &dist.join(filename))?);
    }
    let path = manifest::write_manifest(&dist, &entries)?;
    println!("[dist] manifest at {}", path.display());
    Ok(())
}

fn run_tests(env: &BuildEnv) -> Result<()> {
    let mut command = Command::new(&env.config.test.command);
    command.args(&env.config.test.args).current_dir(&env.root);
    run_tool_streaming(command, &env.config.test.command)
}
