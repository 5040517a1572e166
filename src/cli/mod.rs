//! # Command-Line Interface
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `run [FILES...]` | Rewrite workflow files in place (`--dry-run`, `--check`) |
//! | `classify NAMES...` | Show which jobs would be kept or dropped |
//! | `config show` | Print the effective configuration |
//! | `config init` | Write `rebrand.toml` with the built-in defaults |
//!
//! ## Output Formats
//!
//! All commands support `--format`:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! Use `--verbose` (or `-v`) for debug output on stderr.
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod classify_cmd;
mod config_cmd;
mod output;
mod run_cmd;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
pub use run_cmd::RunMode;
