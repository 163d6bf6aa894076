//! Command execution.

use std::process::Stdio;

use async_trait::async_trait;

use crate::{CommandParts, export::CondaError};

/// Runs a command to completion and returns its stdout.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command`.
    async fn run(&self, command: CommandParts) -> Result<String, CondaError>;
}

/// Runs commands as child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: CommandParts) -> Result<String, CondaError> {
        let command_line = command.display();
        let (program, args) = command.into_resolved().await?;
        tracing::debug!(command = %command_line, "Running");

        let output = tokio::process::Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(CondaError::CommandFailed {
                command: command_line,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| CondaError::InvalidOutput(command_line))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::{CommandBuildError, CommandBuilder};

    fn sh(script: &str) -> CommandParts {
        CommandBuilder::new("sh").params(["-c", script]).build().unwrap()
    }

    #[tokio::test]
    async fn test_process_runner_returns_stdout() {
        let stdout = ProcessRunner.run(sh("printf 'numpy==1.26.4\\n'")).await.unwrap();
        assert_eq!(stdout, "numpy==1.26.4\n");
    }

    #[tokio::test]
    async fn test_process_runner_reports_exit_code_and_stderr() {
        let err = ProcessRunner
            .run(sh("echo 'EnvironmentLocationNotFound' >&2; exit 3"))
            .await
            .unwrap_err();

        match err {
            CondaError::CommandFailed {
                command,
                code,
                stderr,
            } => {
                assert!(command.starts_with("sh -c "));
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "EnvironmentLocationNotFound");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_process_runner_missing_program() {
        let command = CommandBuilder::new("/definitely/not/here/conda")
            .params(["env", "export"])
            .build()
            .unwrap();

        let err = ProcessRunner.run(command).await.unwrap_err();
        assert!(matches!(err, CondaError::Command(CommandBuildError::NotFound(_))));
    }
}
