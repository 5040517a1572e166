//! Workflow file storage
//!
//! Workflow files are read fully into memory and replaced wholesale. Writes
//! go to a sibling temp file first and are renamed over the original.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowFileError {
    #[error("Workflow file not found: {0}")]
    NotFound(PathBuf),

    #[error("Workflow file is not valid UTF-8: {0}")]
    NotUtf8(PathBuf),
}

/// A workflow definition file on disk
#[derive(Debug, Clone)]
pub struct WorkflowFile {
    path: PathBuf,
}

impl WorkflowFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Reads the whole file
    pub fn read(&self) -> Result<String> {
        if !self.exists() {
            return Err(WorkflowFileError::NotFound(self.path.clone()).into());
        }

        let bytes = fs::read(&self.path)
            .with_context(|| format!("Failed to read workflow: {}", self.path.display()))?;

        String::from_utf8(bytes).map_err(|_| WorkflowFileError::NotUtf8(self.path.clone()).into())
    }

    /// Replaces the file contents. The temp file is removed if any step fails.
    pub fn write(&self, content: &str) -> Result<()> {
        let temp_path = self.temp_path();

        let result = self.write_temp(&temp_path, content).and_then(|()| {
            fs::rename(&temp_path, &self.path).with_context(|| {
                format!(
                    "Failed to rename {} to {}",
                    temp_path.display(),
                    self.path.display()
                )
            })
        });

        if result.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        result
    }

    fn write_temp(&self, temp_path: &Path, content: &str) -> Result<()> {
        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            let mut writer = BufWriter::new(&file);
            writer
                .write_all(content.as_bytes())
                .context("Failed to write workflow")?;
            writer.flush().context("Failed to flush workflow")?;
        }

        // Keep the original permissions
        if let Ok(metadata) = fs::metadata(&self.path) {
            fs::set_permissions(temp_path, metadata.permissions()).with_context(|| {
                format!("Failed to copy permissions to {}", temp_path.display())
            })?;
        }

        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".rebrand.tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn read_missing_file() {
        let dir = TempDir::new().unwrap();
        let file = WorkflowFile::new(dir.path().join("missing.yml"));
        assert!(!file.exists());

        let err = file.read().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WorkflowFileError>(),
            Some(WorkflowFileError::NotFound(_))
        ));
    }

    #[test]
    fn write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("build.yml");
        fs::write(&path, "old\n").unwrap();

        let file = WorkflowFile::new(&path);
        file.write("name: new\r\njobs:\r\n").unwrap();

        assert_eq!(file.read().unwrap(), "name: new\r\njobs:\r\n");
        assert!(!dir.path().join("build.yml.rebrand.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn write_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("build.yml");
        fs::write(&path, "old\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();

        WorkflowFile::new(&path).write("new\n").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn failed_write_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        // renaming a file over a directory fails
        let path = dir.path().join("build.yml");
        fs::create_dir(&path).unwrap();

        let err = WorkflowFile::new(&path).write("new\n").unwrap_err();
        assert!(err.to_string().contains("Failed to rename"));
        assert!(!dir.path().join("build.yml.rebrand.tmp").exists());
        assert!(path.is_dir());
    }

    #[test]
    fn rejects_non_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yml");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let err = WorkflowFile::new(&path).read().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WorkflowFileError>(),
            Some(WorkflowFileError::NotUtf8(_))
        ));
    }
}
