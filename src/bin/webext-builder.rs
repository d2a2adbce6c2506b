use anyhow::{bail, Context, Result};

use webext_builder::artifact::ToolFailure;
use webext_builder::build::targets::Browser;
use webext_builder::build::{tasks, BuildEnv};
use webext_builder::{graph, preflight, watch};

fn usage() -> &'static str {
    "Usage:\n  webext-builder build [chrome|opera|firefox|safari]\n  webext-builder dist [chrome|opera|firefox]\n  webext-builder watch\n  webext-builder test\n  webext-builder clean"
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error:#}");
        std::process::exit(exit_code(&error));
    }
}

/// Propagate a failing collaborator's exit code; 1 for everything else.
fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ToolFailure>())
        .and_then(|failure| failure.code)
        .unwrap_or(1)
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let root = std::env::current_dir().context("resolving current directory")?;
    let env = BuildEnv::new(root)?;

    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match args.as_slice() {
        ["clean"] => run_task(&env, "clean"),
        ["build"] => {
            preflight::check_build_tools(&env.config)?;
            run_task(&env, "build")
        }
        ["build", target] => {
            let browser = Browser::parse(target)?;
            preflight::check_build_tools(&env.config)?;
            run_task(&env, browser.id())
        }
        ["dist"] => {
            preflight::check_build_tools(&env.config)?;
            preflight::check_dist_tools(&env.config)?;
            run_task(&env, "dist")
        }
        ["dist", target] => {
            let browser = Browser::parse(target)?;
            if browser == Browser::Safari {
                bail!("safari ships as a directory tree; build it with `webext-builder build safari`");
            }
            preflight::check_build_tools(&env.config)?;
            preflight::check_dist_tools(&env.config)?;
            run_task(&env, &format!("{}:dist", browser.id()))
        }
        ["test"] => {
            preflight::check_build_tools(&env.config)?;
            run_task(&env, "test")
        }
        ["watch"] => {
            preflight::check_build_tools(&env.config)?;
            watch::watch_and_rebuild(&env)
        }
        _ => bail!(usage()),
    }
}

fn run_task(env: &BuildEnv, name: &str) -> Result<()> {
    let registry = tasks::registry(env)?;
    graph::run(&registry, name)
}
