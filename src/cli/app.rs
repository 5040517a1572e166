//! Main CLI application structure

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::{classify_cmd, config_cmd, run_cmd};
use crate::storage::Config;

#[derive(Parser)]
#[command(name = "rebrand")]
#[command(author, version, about = "Rebrand CI workflow files and prune platform jobs")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to ./rebrand.toml, then built-in settings)
    #[arg(long, short = 'c', global = true, env = "REBRAND_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rewrite workflow files in place
    Run {
        /// Workflow files (defaults to the configured list)
        files: Vec<PathBuf>,

        /// Show what would change without writing
        #[arg(long)]
        dry_run: bool,

        /// Fail if any file would change; implies --dry-run
        #[arg(long)]
        check: bool,
    },

    /// Show how job names would be classified
    Classify {
        /// Job names to classify
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Inspect or create the configuration file
    #[command(subcommand)]
    Config(config_cmd::ConfigCommands),
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(cli.format, cli.verbose);

    output.verbose("rebrand starting");

    match cli.command {
        Commands::Run {
            files,
            dry_run,
            check,
        } => {
            let config = load_config(&output, cli.config.as_deref())?;
            let files = if files.is_empty() {
                config.files.clone()
            } else {
                files
            };
            let mode = run_cmd::RunMode::from_flags(dry_run, check);
            output.verbose_ctx("run", &format!("{} file(s), mode={:?}", files.len(), mode));
            run_cmd::run(&output, &config, &files, mode)?
        }

        Commands::Classify { names } => {
            let config = load_config(&output, cli.config.as_deref())?;
            classify_cmd::run(&output, &config, &names)?
        }

        Commands::Config(cmd) => config_cmd::run(cmd, &output, cli.config.as_deref())?,
    }

    Ok(())
}

/// Loads the configuration for commands that act on it
pub(crate) fn load_config(output: &Output, path: Option<&Path>) -> Result<Config> {
    let config = Config::load(path)?;
    match &config.source {
        Some(path) => output.verbose_ctx("config", &format!("Loaded {}", path.display())),
        None => output.verbose_ctx("config", "Using built-in defaults"),
    }
    Ok(config)
}
