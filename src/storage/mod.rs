//! # Storage Layer
//!
//! File access for workflow-rebrand.
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Workflows | YAML, processed line by line | configured paths (default `.github/workflows/*.yml`) |
//! | Config | TOML | `--config` path or `./rebrand.toml` |
//!
//! ## Key Types
//!
//! - [`Config`] - Rename, classification and marker settings
//! - [`WorkflowFile`] - Read/replace one workflow file

mod config;
mod workflow;

pub use config::{
    ClassifyConfig, Config, ConfigError, MarkersConfig, RenameConfig, CONFIG_FILE_NAME,
};
pub use workflow::{WorkflowFile, WorkflowFileError};
