use std::fmt;
use std::process::Command;

use anyhow::{Context, Result};

/// Failure of an external collaborator, carrying the tool's exit code so
/// the CLI can propagate it.
#[derive(Debug)]
pub struct ToolFailure {
    pub tool: String,
    pub code: Option<i32>,
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "`{}` exited with code {}", self.tool, code),
            None => write!(f, "`{}` was terminated by a signal", self.tool),
        }
    }
}

impl std::error::Error for ToolFailure {}

/// Run a tool to completion, capturing its output. Non-zero exit is an
/// error carrying the captured stdout/stderr and the exit code.
pub(crate) fn run_tool(mut command: Command, tool: &str) -> Result<()> {
    let output = command
        .output()
        .with_context(|| format!("running {tool}"))?;
    if output.status.success() {
        return Ok(());
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(anyhow::Error::new(ToolFailure {
        tool: tool.to_string(),
        code: output.status.code(),
    })
    .context(format!(
        "{} failed: {}\n{}",
        tool,
        stdout.trim(),
        stderr.trim()
    )))
}

/// Run a tool with inherited stdio. Used for the test runner, whose
/// output belongs on the console as it happens.
pub(crate) fn run_tool_streaming(mut command: Command, tool: &str) -> Result<()> {
    let status = command
        .status()
        .with_context(|| format!("running {tool}"))?;
    if status.success() {
        return Ok(());
    }
    Err(anyhow::Error::new(ToolFailure {
        tool: tool.to_string(),
        code: status.code(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_ok() {
        let mut command = Command::new("true");
        command.arg("ignored");
        assert!(run_tool(command, "true").is_ok());
    }

    #[test]
    fn failure_carries_the_exit_code() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo oops >&2; exit 7"]);
        let err = run_tool(command, "sh").unwrap_err();

        let failure = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<ToolFailure>())
            .expect("ToolFailure in chain");
        assert_eq!(failure.code, Some(7));
        assert!(format!("{err:#}").contains("oops"));
    }

    #[test]
    fn missing_binary_is_a_spawn_error() {
        let command = Command::new("definitely_not_a_real_tool_12345");
        let err = run_tool(command, "definitely_not_a_real_tool_12345").unwrap_err();
        assert!(err
            .chain()
            .all(|cause| cause.downcast_ref::<ToolFailure>().is_none()));
    }
}
