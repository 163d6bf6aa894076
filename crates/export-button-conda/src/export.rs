//! Conda exporter: run conda and pip, then combine their output.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::{
    CommandBuildError, CommandBuilder, CommandRunner, EnvironmentFile, LocalPackages,
    ProcessRunner, combine_env_data,
};

/// Conda export error.
#[derive(Debug, Error)]
pub enum CondaError {
    #[error("Cannot include build versions with --from-history")]
    ConflictingOptions,
    #[error("`{command}` exited with {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("`{0}` printed non UTF-8 output")]
    InvalidOutput(String),
    #[error("Unexpected version output: {0}")]
    InvalidVersion(String),
    #[error("Command build error: {0}")]
    Command(#[from] CommandBuildError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// What to export and with which tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Environment prefix; the active environment when unset.
    pub prefix: Option<PathBuf>,
    /// Conda command, e.g. `conda` or `micromamba`.
    pub conda: String,
    /// Fold in packages from `pip freeze --user`.
    pub include_local_pip: bool,
    /// Keep build strings in the resolved versions.
    pub include_builds: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            prefix: None,
            conda: "conda".to_string(),
            include_local_pip: true,
            include_builds: false,
        }
    }
}

/// Exports a conda environment with history-only packages pinned to their
/// resolved versions.
pub struct CondaExporter<R = ProcessRunner> {
    runner: R,
    options: ExportOptions,
}

impl CondaExporter<ProcessRunner> {
    /// Create an exporter running real processes.
    #[must_use]
    pub const fn new(options: ExportOptions) -> Self {
        Self::with_runner(ProcessRunner, options)
    }
}

impl<R: CommandRunner> CondaExporter<R> {
    /// Create an exporter with a custom runner.
    #[must_use]
    pub const fn with_runner(runner: R, options: ExportOptions) -> Self {
        Self { runner, options }
    }

    /// Run `conda env export`.
    ///
    /// # Errors
    /// Returns error if both flags are set, conda fails, or its output is not
    /// an environment file.
    pub async fn export_env(
        &self,
        history_only: bool,
        include_builds: bool,
    ) -> Result<EnvironmentFile, CondaError> {
        if history_only && include_builds {
            return Err(CondaError::ConflictingOptions);
        }

        let mut params = vec!["env".to_string(), "export".to_string()];
        if let Some(prefix) = &self.options.prefix {
            params.push("-p".to_string());
            params.push(prefix.to_string_lossy().into_owned());
        }
        if history_only {
            params.push("--from-history".to_string());
        }
        if !include_builds {
            params.push("--no-builds".to_string());
        }

        let command = CommandBuilder::new(self.options.conda.as_str())
            .params(params)
            .build()?;
        let stdout = self.runner.run(command).await?;
        Ok(EnvironmentFile::from_yaml(&stdout)?)
    }

    /// Packages installed with `pip install --user`.
    ///
    /// # Errors
    /// Returns error if pip fails.
    pub async fn export_pip_local(&self) -> Result<LocalPackages, CondaError> {
        let command = match self.python() {
            Some(python) => CommandBuilder::for_program(&python)?.params(["-m", "pip"]),
            None => CommandBuilder::new("pip"),
        }
        .extend_params(["freeze", "--user"])
        .build()?;

        let stdout = self.runner.run(command).await?;
        Ok(LocalPackages::parse(stdout.lines()))
    }

    /// Version of the environment's Python interpreter.
    ///
    /// # Errors
    /// Returns error if Python cannot be run or prints something unexpected.
    pub async fn python_version(&self) -> Result<String, CondaError> {
        let command = match self.python() {
            Some(python) => CommandBuilder::for_program(&python)?,
            None => CommandBuilder::new("python"),
        }
        .params(["--version"])
        .build()?;

        let stdout = self.runner.run(command).await?;
        parse_python_version(&stdout).ok_or(CondaError::InvalidVersion(stdout))
    }

    /// Export and combine.
    ///
    /// # Errors
    /// Returns error if any conda or pip command fails.
    pub async fn export(&self) -> Result<EnvironmentFile, CondaError> {
        let full = self.export_env(false, self.options.include_builds).await?;
        let history = self.export_env(true, false).await?;

        let pip_local = if self.options.include_local_pip {
            Some(self.export_pip_local().await?)
        } else {
            None
        };

        let python_version = match self.python_version().await {
            Ok(version) => Some(version),
            Err(e) => {
                tracing::warn!("Could not determine Python version: {e}");
                None
            }
        };

        tracing::info!(
            full = full.dependencies.len(),
            requested = history.dependencies.len(),
            "Combining environment exports"
        );
        Ok(combine_env_data(
            &full,
            &history,
            pip_local.as_ref(),
            python_version.as_deref(),
        ))
    }

    fn python(&self) -> Option<PathBuf> {
        self.options.prefix.as_deref().map(interpreter_in)
    }
}

fn interpreter_in(prefix: &Path) -> PathBuf {
    if cfg!(windows) {
        prefix.join("python.exe")
    } else {
        prefix.join("bin").join("python")
    }
}

/// `Python 3.11.8` -> `3.11.8`.
fn parse_python_version(output: &str) -> Option<String> {
    let version = output.trim().strip_prefix("Python ")?.trim();
    (!version.is_empty()).then(|| version.to_string())
}
