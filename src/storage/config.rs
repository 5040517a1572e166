//! Configuration handling for workflow-rebrand
//!
//! Configuration is read from an explicit `--config` path, or from
//! `rebrand.toml` in the current directory. Without either, the built-in
//! defaults apply.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{JobClassifier, Renamer, RewritePolicy};

/// File name looked up in the current directory
pub const CONFIG_FILE_NAME: &str = "rebrand.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),
}

/// Product name substitution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenameConfig {
    /// Name to replace
    pub old: String,

    /// Replacement name
    pub new: String,

    /// Lines containing any of these are never renamed
    pub protected: Vec<String>,
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            old: "RustDesk".to_string(),
            new: "BMDesk".to_string(),
            protected: strings(&["uses:", "repository:", "secrets."]),
        }
    }
}

/// Keyword lists for job classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    /// Target platforms; always kept
    pub targets: Vec<String>,

    /// Setup, release and housekeeping jobs; always kept
    pub infrastructure: Vec<String>,

    /// Platforms to drop when no keep keyword matches
    pub exclude: Vec<String>,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            targets: strings(&["windows", "win", "android"]),
            infrastructure: strings(&[
                "setup",
                "prepare",
                "cancel",
                "env",
                "config",
                "release",
                "prerelease",
                "publish",
                "draft",
            ]),
            exclude: strings(&[
                "linux", "mac", "osx", "ios", "web", "flatpak", "appimage", "dmg", "freebsd",
                "suse",
            ]),
        }
    }
}

/// Literal markers recognized in workflow files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkersConfig {
    /// Line that opens the jobs section
    pub jobs: String,

    /// Key of dependency declarations
    pub needs: String,
}

impl Default for MarkersConfig {
    fn default() -> Self {
        Self {
            jobs: "jobs:".to_string(),
            needs: "needs:".to_string(),
        }
    }
}

/// Complete rebrand configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Workflow files processed when none are given on the command line
    pub files: Vec<PathBuf>,

    pub rename: RenameConfig,

    pub classify: ClassifyConfig,

    pub markers: MarkersConfig,

    /// Where this configuration was read from
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            files: vec![
                PathBuf::from(".github/workflows/flutter-nightly.yml"),
                PathBuf::from(".github/workflows/flutter-build.yml"),
            ],
            rename: RenameConfig::default(),
            classify: ClassifyConfig::default(),
            markers: MarkersConfig::default(),
            source: None,
        }
    }
}

impl Config {
    /// Loads configuration from an explicit path, or from the default
    /// location in the current directory
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(ConfigError::NotFound(path.to_path_buf()).into());
            }
            return Self::load_file(path);
        }

        let default_path = Self::default_path();
        if default_path.is_file() {
            Self::load_file(&default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the default config path in the current directory
    pub fn default_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE_NAME)
    }

    /// Loads and validates a config file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let mut config = Self::parse(&content)
            .with_context(|| format!("Failed to load config: {}", path.display()))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parses and validates TOML configuration
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the rewriter cannot act on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rename.old.is_empty() {
            return Err(ConfigError::Invalid("rename.old must not be empty".into()));
        }
        if self.rename.new.is_empty() {
            return Err(ConfigError::Invalid("rename.new must not be empty".into()));
        }
        if self.rename.new.contains(&self.rename.old) {
            return Err(ConfigError::Invalid(format!(
                "rename.new ({}) must not contain rename.old ({}); a second run would rename it again",
                self.rename.new, self.rename.old
            )));
        }
        let old = self.rename.old.to_lowercase();
        let new = self.rename.new.to_lowercase();
        if let Some(keyword) = self
            .classify
            .exclude
            .iter()
            .map(|k| k.trim().to_lowercase())
            .find(|k| !k.is_empty() && new.contains(k.as_str()) && !old.contains(k.as_str()))
        {
            return Err(ConfigError::Invalid(format!(
                "rename.new ({}) contains exclude keyword '{}'; renamed jobs would be dropped on a second run",
                self.rename.new, keyword
            )));
        }
        if self.markers.jobs.trim().is_empty() {
            return Err(ConfigError::Invalid("markers.jobs must not be empty".into()));
        }
        if self.markers.needs.trim().is_empty() {
            return Err(ConfigError::Invalid("markers.needs must not be empty".into()));
        }
        Ok(())
    }

    /// Builds the policy consumed by the rewriter
    pub fn to_policy(&self) -> RewritePolicy {
        RewritePolicy {
            classifier: JobClassifier::from_keywords(
                self.classify.targets.as_slice(),
                self.classify.infrastructure.as_slice(),
                self.classify.exclude.as_slice(),
            ),
            renamer: Renamer::new(
                self.rename.old.clone(),
                self.rename.new.clone(),
                self.rename.protected.iter().cloned(),
            ),
            jobs_marker: self.markers.jobs.trim().to_string(),
            needs_key: self.markers.needs.clone(),
        }
    }

    /// Serializes the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Writes the configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
