//! Watch mode: a wrapper loop around the build task, not a task itself.
//!
//! Runs a full build, then re-arms a debounced recursive watch over the
//! source roots and re-runs the build on any change, looping until
//! externally terminated. A failed rebuild is reported and watching
//! continues. An exclusive lock file enforces one build at a time per
//! project.

use std::fs::File;
use std::sync::mpsc::channel;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use fs2::FileExt;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};

use crate::build::{tasks, BuildEnv, WATCH_ROOTS};
use crate::graph;

const LOCK_FILENAME: &str = ".webext-builder.lock";

pub fn watch_and_rebuild(env: &BuildEnv) -> Result<()> {
    let lock_path = env.root.join(LOCK_FILENAME);
    let lock = File::create(&lock_path)
        .with_context(|| format!("creating build lock '{}'", lock_path.display()))?;
    lock.try_lock_exclusive().with_context(|| {
        format!(
            "another build holds the lock '{}'; one build at a time",
            lock_path.display()
        )
    })?;

    rebuild(env);

    let (tx, rx) = channel();
    let debounce = Duration::from_millis(env.config.watch.debounce_ms);
    let mut debouncer = new_debouncer(debounce, tx).context("initializing filesystem watcher")?;

    let mut watched = 0usize;
    for root in WATCH_ROOTS {
        let path = env.root.join(root);
        if !path.is_dir() {
            continue;
        }
        debouncer
            .watcher()
            .watch(&path, RecursiveMode::Recursive)
            .with_context(|| format!("watching '{}'", path.display()))?;
        watched += 1;
    }
    if watched == 0 {
        bail!(
            "nothing to watch: no source roots exist under '{}'",
            env.root.display()
        );
    }
    println!("[watch] watching for changes");

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant: Vec<_> = events
                    .iter()
                    .filter(|event| matches!(event.kind, DebouncedEventKind::Any))
                    .collect();
                if relevant.is_empty() {
                    continue;
                }
                for event in &relevant {
                    if let Some(name) = event.path.file_name() {
                        println!("[watch] changed: {}", name.to_string_lossy());
                    }
                }
                rebuild(env);
                println!("[watch] watching for changes");
            }
            Ok(Err(error)) => {
                // Watcher hiccups are not fatal; keep watching.
                eprintln!("[watch] watcher error: {error:?}");
            }
            Err(_) => bail!("watch channel closed"),
        }
    }
}

fn rebuild(env: &BuildEnv) {
    match tasks::registry(env).and_then(|registry| graph::run(&registry, "build")) {
        Ok(()) => println!("[watch] build ok"),
        Err(error) => eprintln!("[watch] build failed: {error:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::config::Config;
    use tempfile::TempDir;

    #[test]
    fn refuses_a_rootless_project() {
        let temp = TempDir::new().unwrap();
        let env = BuildEnv {
            root: temp.path().to_path_buf(),
            config: Config::default(),
        };
        // No src/ or libs/ to watch; the loop must fail fast rather than
        // idle forever (the initial build failure alone is non-fatal).
        let err = watch_and_rebuild(&env).unwrap_err();
        assert!(err.to_string().contains("nothing to watch"));
    }

    #[test]
    fn lock_blocks_a_second_watcher() {
        let temp = TempDir::new().unwrap();
        let lock_path = temp.path().join(LOCK_FILENAME);
        let held = File::create(&lock_path).unwrap();
        held.try_lock_exclusive().unwrap();

        let env = BuildEnv {
            root: temp.path().to_path_buf(),
            config: Config::default(),
        };
        let err = watch_and_rebuild(&env).unwrap_err();
        assert!(err.to_string().contains("one build at a time"));
    }
}
