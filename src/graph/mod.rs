//! Task graph: named build steps with explicit dependencies.
//!
//! The graph is constructed explicitly (task id, prerequisite list,
//! action), validated once for unknown dependencies and cycles, and
//! executed in dependency order by [`run`]. The executor holds no
//! cross-run cache: re-running a task redoes its file work from scratch.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, Context, Result};

type Action<'a> = Box<dyn Fn() -> Result<()> + 'a>;

struct Task<'a> {
    deps: Vec<String>,
    action: Option<Action<'a>>,
}

enum Mark {
    InProgress,
    Done,
}

/// Registry of named tasks wired into a dependency graph.
#[derive(Default)]
pub struct TaskGraph<'a> {
    tasks: BTreeMap<String, Task<'a>>,
}

impl<'a> TaskGraph<'a> {
    pub fn new() -> Self {
        Self {
            tasks: BTreeMap::new(),
        }
    }

    /// Register a task with an action.
    pub fn task(
        &mut self,
        name: &str,
        deps: &[&str],
        action: impl Fn() -> Result<()> + 'a,
    ) -> Result<()> {
        self.insert(name, deps, Some(Box::new(action)))
    }

    /// Register a grouping task: no action, done once every dependency
    /// has completed successfully.
    pub fn group(&mut self, name: &str, deps: &[&str]) -> Result<()> {
        self.insert(name, deps, None)
    }

    fn insert(&mut self, name: &str, deps: &[&str], action: Option<Action<'a>>) -> Result<()> {
        if self.tasks.contains_key(name) {
            bail!("task '{name}' is registered twice");
        }
        self.tasks.insert(
            name.to_string(),
            Task {
                deps: deps.iter().map(|dep| dep.to_string()).collect(),
                action,
            },
        );
        Ok(())
    }

    /// Check that every dependency exists and the graph is acyclic.
    /// A cycle is reported with its member tasks in order.
    pub fn validate(&self) -> Result<()> {
        for (name, task) in &self.tasks {
            for dep in &task.deps {
                if !self.tasks.contains_key(dep) {
                    bail!("task '{name}' depends on unknown task '{dep}'");
                }
            }
        }
        let mut state: BTreeMap<&str, Mark> = BTreeMap::new();
        for name in self.tasks.keys() {
            self.check_cycles(name, &mut state, &mut Vec::new())?;
        }
        Ok(())
    }

    fn check_cycles<'s>(
        &'s self,
        name: &'s str,
        state: &mut BTreeMap<&'s str, Mark>,
        path: &mut Vec<&'s str>,
    ) -> Result<()> {
        match state.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                let start = path.iter().position(|task| *task == name).unwrap_or(0);
                let mut cycle: Vec<&str> = path[start..].to_vec();
                cycle.push(name);
                bail!("task dependency cycle: {}", cycle.join(" -> "));
            }
            None => {}
        }
        state.insert(name, Mark::InProgress);
        path.push(name);
        for dep in &self.tasks[name].deps {
            self.check_cycles(dep, state, path)?;
        }
        path.pop();
        state.insert(name, Mark::Done);
        Ok(())
    }

    /// Dependency-ordered closure of `name`: every transitively required
    /// task exactly once, prerequisites before dependents. Call after
    /// [`TaskGraph::validate`].
    pub fn resolve<'b>(&'b self, name: &'b str) -> Result<Vec<&'b str>> {
        if !self.tasks.contains_key(name) {
            bail!("unknown task '{name}'");
        }
        let mut seen = BTreeSet::new();
        let mut order = Vec::new();
        self.collect(name, &mut seen, &mut order);
        Ok(order)
    }

    fn collect<'s>(&'s self, name: &'s str, seen: &mut BTreeSet<&'s str>, order: &mut Vec<&'s str>) {
        if !seen.insert(name) {
            return;
        }
        let Some(task) = self.tasks.get(name) else {
            return;
        };
        for dep in &task.deps {
            self.collect(dep, seen, order);
        }
        order.push(name);
    }
}

/// Execute `name` and everything it requires, in dependency order.
///
/// The first failing task stops the run; the returned error names the
/// task and carries the underlying cause.
pub fn run(graph: &TaskGraph, name: &str) -> Result<()> {
    graph.validate()?;
    for task in graph.resolve(name)? {
        if let Some(action) = &graph.tasks[task].action {
            println!("[{task}] running");
            action().with_context(|| format!("task '{task}' failed"))?;
        }
    }
    Ok(())
}
