//! Conda environment export.
//!
//! Produces an environment file holding the packages the user explicitly
//! installed (`--from-history`) pinned to their resolved versions, plus pip
//! packages, including ones installed with `pip install --user`.
//!
//! Provides:
//! - `CondaExporter` - Run conda/pip and combine their output
//! - `combine_env_data` - The pure merge step
//! - `CommandBuilder` / `CommandRunner` - Command construction and execution

pub mod combine;
pub mod command;
pub mod env_file;
pub mod export;
pub mod runner;

pub use combine::{LocalPackages, combine_env_data};
pub use command::{CommandBuildError, CommandBuilder, CommandParts};
pub use env_file::{Dependency, EnvironmentFile};
pub use export::{CondaError, CondaExporter, ExportOptions};
pub use runner::{CommandRunner, ProcessRunner};
