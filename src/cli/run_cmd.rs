//! The `run` command: rewrite workflow files

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use serde::Serialize;

use super::output::Output;
use crate::domain::{RewriteReport, WorkflowRewriter};
use crate::storage::{Config, WorkflowFile};

/// What `run` does with a rewritten document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Write changes back
    Write,
    /// Report only
    DryRun,
    /// Report only, fail if anything would change
    Check,
}

impl RunMode {
    pub fn from_flags(dry_run: bool, check: bool) -> Self {
        if check {
            RunMode::Check
        } else if dry_run {
            RunMode::DryRun
        } else {
            RunMode::Write
        }
    }

    fn writes(&self) -> bool {
        *self == RunMode::Write
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum FileStatus {
    Skipped,
    Unchanged,
    Rewritten,
    WouldChange,
    Failed,
}

#[derive(Debug, Serialize)]
struct FileResult {
    path: PathBuf,
    status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<RewriteReport>,
}

pub fn run(output: &Output, config: &Config, files: &[PathBuf], mode: RunMode) -> Result<()> {
    let rewriter = WorkflowRewriter::new(config.to_policy());
    let mut results = Vec::with_capacity(files.len());

    for path in files {
        let result = match process_file(output, &rewriter, path, mode) {
            Ok(result) => result,
            Err(e) => {
                output.error(&format!("{}: {:#}", path.display(), e));
                FileResult {
                    path: path.clone(),
                    status: FileStatus::Failed,
                    error: Some(format!("{:#}", e)),
                    report: None,
                }
            }
        };
        results.push(result);
    }

    let failed = count(&results, FileStatus::Failed);
    let would_change = count(&results, FileStatus::WouldChange);

    if output.is_json() {
        output.data(&serde_json::json!({
            "success": failed == 0 && !(mode == RunMode::Check && would_change > 0),
            "files": results,
        }));
    } else {
        output.success(&format!(
            "Done: {} rewritten, {} unchanged, {} would change, {} skipped, {} failed",
            count(&results, FileStatus::Rewritten),
            count(&results, FileStatus::Unchanged),
            would_change,
            count(&results, FileStatus::Skipped),
            failed,
        ));
    }

    if failed > 0 {
        bail!("{} workflow file(s) could not be processed", failed);
    }
    if mode == RunMode::Check && would_change > 0 {
        bail!("{} workflow file(s) would change", would_change);
    }

    Ok(())
}

fn count(results: &[FileResult], status: FileStatus) -> usize {
    results.iter().filter(|r| r.status == status).count()
}

fn process_file(
    output: &Output,
    rewriter: &WorkflowRewriter,
    path: &Path,
    mode: RunMode,
) -> Result<FileResult> {
    let file = WorkflowFile::new(path);

    if !file.exists() {
        output.warn(&format!("Workflow file not found: {}. Skipping.", path.display()));
        return Ok(FileResult {
            path: path.to_path_buf(),
            status: FileStatus::Skipped,
            error: None,
            report: None,
        });
    }

    output.success(&format!("Processing: {}", path.display()));

    let text = file.read()?;
    let rewrite = rewriter.rewrite(&text);
    let report = rewrite.report;

    if !report.found_jobs_section {
        output.verbose_ctx("scan", &format!("{}: no jobs section, renaming only", path.display()));
    }

    for job in &report.jobs {
        let tag = if job.is_dropped() { "  [drop]" } else { "  [keep]" };
        let reason = job.decision.to_string();
        output.row(&[tag, job.name.as_str(), reason.as_str()]);
    }

    for edit in &report.dependency_edits {
        let after = edit.after.as_deref().unwrap_or("<removed>");
        output.verbose_ctx(
            "needs",
            &format!("line {}: '{}' -> '{}'", edit.line, edit.before.trim(), after.trim()),
        );
    }

    let status = if !report.changed {
        FileStatus::Unchanged
    } else if mode.writes() {
        file.write(&rewrite.content)?;
        FileStatus::Rewritten
    } else {
        FileStatus::WouldChange
    };

    let summary = format!(
        "{} jobs dropped, {} lines renamed, {} dependency edits",
        report.dropped().count(),
        report.renamed_lines,
        report.dependency_edits.len()
    );
    match status {
        FileStatus::Rewritten => output.success(&format!("  -> updated {} ({})", path.display(), summary)),
        FileStatus::WouldChange => output.success(&format!("  -> would update {} ({})", path.display(), summary)),
        _ => output.success(&format!("  -> {} unchanged", path.display())),
    }
    output.blank();

    Ok(FileResult {
        path: path.to_path_buf(),
        status,
        error: None,
        report: Some(report),
    })
}
