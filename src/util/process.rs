use std::path::PathBuf;
use std::process::Command;

use anyhow::Context;

use crate::error::{ImageGraphError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Everything that leaves the process (git, docker) goes through this seam.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    pub cwd: Option<PathBuf>,
}

impl SystemRunner {
    pub fn in_dir(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(cwd.into()),
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(cwd) = self.cwd.as_ref() {
            cmd.current_dir(cwd);
        }
        tracing::debug!(program, ?args, "running command");
        let output = cmd
            .output()
            .with_context(|| format!("failed to run {} {}", program, args.join(" ")))?;
        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            code: output.status.code().unwrap_or(-1),
        })
    }
}

/// Runs a command and turns a non-zero exit into `ImageGraphError::Command`.
pub fn run_checked(runner: &dyn CommandRunner, program: &str, args: &[String]) -> Result<String> {
    let output = runner.run(program, args)?;
    if output.success() {
        return Ok(output.stdout);
    }
    Err(ImageGraphError::Command {
        command: format!("{} {}", program, args.join(" ")),
        code: output.code,
        stderr: output.stderr.trim().to_string(),
    })
}

pub fn to_args<const N: usize>(args: [&str; N]) -> Vec<String> {
    args.iter().map(|arg| arg.to_string()).collect()
}


#[cfg(test)]
mod tests {
    use crate::error::ImageGraphError;
    use crate::util::process::fake::RecordingRunner;
    use crate::util::process::{run_checked, to_args};

    #[test]
    fn run_checked_returns_stdout_on_success() {
        let runner = RecordingRunner::new().respond("git rev-parse", "abc123\n", 0);
        let out = run_checked(&runner, "git", &to_args(["rev-parse", "HEAD"])).expect("run");
        assert_eq!(out, "abc123\n");
        assert_eq!(runner.calls(), vec!["git rev-parse HEAD"]);
    }

    #[test]
    fn run_checked_maps_failure_to_command_error() {
        let runner = RecordingRunner::new().respond("docker push", "", 1);
        let err = run_checked(&runner, "docker", &to_args(["push", "bicf/base:1.0"]))
            .expect_err("push fails");
        assert!(matches!(
            err,
            ImageGraphError::Command { code: 1, ref stderr, .. } if stderr == "boom"
        ));
    }
}
