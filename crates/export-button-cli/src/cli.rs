use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use export_button_conda::ExportOptions;

#[derive(Parser, Debug)]
#[command(name = "export-button")]
#[command(version, about = "Export notebook kernel environments", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Export the environment a kernel runs in
    export-button conda-export --prefix /opt/conda/envs/lab --output environment.yml

    # Print the active environment without user-site pip packages
    export-button conda-export --no-local-pip
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export a conda environment: requested packages at resolved versions, plus pip packages
    CondaExport(CondaExportArgs),
}

#[derive(Args, Debug)]
pub struct CondaExportArgs {
    /// Environment prefix (defaults to the active environment)
    #[arg(short, long, value_name = "PATH")]
    pub prefix: Option<PathBuf>,

    /// Write to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Conda executable, e.g. micromamba
    #[arg(long, env = "CONDA_EXE", default_value = "conda")]
    pub conda: String,

    /// Skip packages from `pip freeze --user`
    #[arg(long)]
    pub no_local_pip: bool,

    /// Keep build strings in versions
    #[arg(long)]
    pub include_builds: bool,
}

impl CondaExportArgs {
    pub fn options(&self) -> ExportOptions {
        ExportOptions {
            prefix: self.prefix.clone(),
            conda: self.conda.clone(),
            include_local_pip: !self.no_local_pip,
            include_builds: self.include_builds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conda_export_args() {
        let cli = Cli::try_parse_from([
            "export-button",
            "conda-export",
            "--prefix",
            "/opt/conda/envs/lab",
            "--conda",
            "micromamba",
            "--no-local-pip",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        let Commands::CondaExport(args) = cli.command;
        let options = args.options();
        assert_eq!(options.prefix, Some(PathBuf::from("/opt/conda/envs/lab")));
        assert_eq!(options.conda, "micromamba");
        assert!(!options.include_local_pip);
        assert!(!options.include_builds);
    }

    #[test]
    fn test_command_required() {
        assert!(Cli::try_parse_from(["export-button"]).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
