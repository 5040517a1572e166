//! Config CLI commands

use std::path::Path;

use anyhow::{bail, Result};
use clap::Subcommand;

use super::app::load_config;
use super::output::Output;
use crate::storage::Config;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// `path` is the `--config` value. `init` never loads it, so a broken file
/// can be replaced.
pub fn run(cmd: ConfigCommands, output: &Output, path: Option<&Path>) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show(output, &load_config(output, path)?),
        ConfigCommands::Init { force } => init(output, path, force),
    }
}

fn show(output: &Output, config: &Config) -> Result<()> {
    if output.is_json() {
        output.data(config);
    } else {
        if let Some(source) = &config.source {
            output.success(&format!("# from {}", source.display()));
        }
        output.success(config.to_toml()?.trim_end());
    }
    Ok(())
}

/// Writes the built-in defaults to `path`, or `./rebrand.toml`
fn init(output: &Output, path: Option<&Path>, force: bool) -> Result<()> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::default_path);

    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    Config::default().save(&path)?;
    output.verbose_ctx("config", &format!("Wrote defaults to {}", path.display()));

    if output.is_json() {
        output.data(&serde_json::json!({
            "success": true,
            "path": path.display().to_string(),
        }));
    } else {
        output.success(&format!("Wrote {}", path.display()));
    }
    Ok(())
}
