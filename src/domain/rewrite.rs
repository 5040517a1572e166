//! Workflow rewriting
//!
//! Two passes over one document: the first classifies every job block, the
//! second emits the surviving lines with dependency lists repaired and the
//! product name replaced.

use std::borrow::Cow;
use std::collections::BTreeSet;

use serde::Serialize;

use super::classify::{Classification, Decision, JobClassifier};
use super::needs::{bracket_depth, strip_comment, DependencyEditor};
use super::rename::Renamer;
use super::scanner::{LineRole, ScannedDocument, SectionScanner};

/// Everything that controls a rewrite
#[derive(Debug, Clone)]
pub struct RewritePolicy {
    pub classifier: JobClassifier,
    pub renamer: Renamer,
    /// Trimmed line content that opens the jobs section
    pub jobs_marker: String,
    /// Key that introduces a dependency declaration
    pub needs_key: String,
}

/// Classification of one job in a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobOutcome {
    pub name: String,
    /// 1-based line number of the job header
    pub line: usize,
    #[serde(flatten)]
    pub decision: Decision,
}

impl JobOutcome {
    pub fn is_dropped(&self) -> bool {
        self.decision.classification.is_drop()
    }
}

/// A dependency line that was edited or removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyEdit {
    /// 1-based line number in the input
    pub line: usize,
    pub before: String,
    /// `None` when the whole line was removed
    pub after: Option<String>,
}

/// Summary of what a rewrite did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RewriteReport {
    pub found_jobs_section: bool,
    pub jobs: Vec<JobOutcome>,
    pub dependency_edits: Vec<DependencyEdit>,
    pub renamed_lines: usize,
    pub dropped_lines: usize,
    pub changed: bool,
}

impl RewriteReport {
    pub fn kept(&self) -> impl Iterator<Item = &JobOutcome> {
        self.jobs.iter().filter(|j| !j.is_dropped())
    }

    pub fn dropped(&self) -> impl Iterator<Item = &JobOutcome> {
        self.jobs.iter().filter(|j| j.is_dropped())
    }
}

/// A rewritten document
#[derive(Debug, Clone)]
pub struct Rewrite {
    pub content: String,
    pub report: RewriteReport,
}

/// Applies a [`RewritePolicy`] to workflow documents
#[derive(Debug, Clone)]
pub struct WorkflowRewriter {
    classifier: JobClassifier,
    renamer: Renamer,
    scanner: SectionScanner,
    dependencies: DependencyEditor,
}

impl WorkflowRewriter {
    pub fn new(policy: RewritePolicy) -> Self {
        Self {
            classifier: policy.classifier,
            renamer: policy.renamer,
            scanner: SectionScanner::new(policy.jobs_marker),
            dependencies: DependencyEditor::new(policy.needs_key),
        }
    }

    /// Classifies every job block of a scanned document, in document order
    pub fn classify(&self, doc: &ScannedDocument<'_>) -> Vec<JobOutcome> {
        doc.jobs()
            .iter()
            .map(|job| JobOutcome {
                name: job.name.clone(),
                line: job.start + 1,
                decision: self.classifier.decide(&job.name),
            })
            .collect()
    }

    /// Rewrites a whole document
    pub fn rewrite(&self, text: &str) -> Rewrite {
        let doc = self.scanner.scan(text);
        let outcomes = self.classify(&doc);

        let dropped: BTreeSet<String> = outcomes
            .iter()
            .filter(|o| o.is_dropped())
            .map(|o| o.name.clone())
            .collect();

        let mut report = RewriteReport {
            found_jobs_section: doc.found_marker(),
            ..RewriteReport::default()
        };
        let mut content = String::with_capacity(text.len());

        // (job index, indentation of the `needs:` key) while inside a block list
        let mut block_list: Option<(usize, usize)> = None;
        let lines = doc.lines();
        let mut idx = 0;

        while idx < lines.len() {
            let line = lines[idx];
            let LineRole::Job(job) = doc.role(idx) else {
                block_list = None;
                self.emit(line, &mut content, &mut report);
                idx += 1;
                continue;
            };

            if outcomes[job].decision.classification == Classification::Drop {
                report.dropped_lines += 1;
                idx += 1;
                continue;
            }

            if let Some((list_job, key_indent)) = block_list {
                if list_job != job || !continues_block_list(line, key_indent) {
                    block_list = None;
                } else if self.dependencies.item_is_dropped(line, &dropped) {
                    report.dropped_lines += 1;
                    report.dependency_edits.push(DependencyEdit {
                        line: idx + 1,
                        before: line.trim_end().to_string(),
                        after: None,
                    });
                    idx += 1;
                    continue;
                }
            }

            if self.dependencies.opens_flow_list(line) {
                let end = flow_list_end(&doc, idx, job);
                self.rewrite_flow_list(&lines[idx..end], idx, &dropped, &mut content, &mut report);
                idx = end;
                continue;
            }

            let mut emitted: Cow<'_, str> = Cow::Borrowed(line);
            if self.dependencies.is_declaration(line) {
                if let Cow::Owned(after) = self.dependencies.edit(line, &dropped) {
                    report.dependency_edits.push(DependencyEdit {
                        line: idx + 1,
                        before: line.trim_end().to_string(),
                        after: Some(after.trim_end().to_string()),
                    });
                    emitted = Cow::Owned(after);
                }
                if self.dependencies.opens_block_list(line) {
                    block_list = Some((job, indentation(line)));
                }
            }

            self.emit(&emitted, &mut content, &mut report);
            idx += 1;
        }

        report.jobs = outcomes;
        report.changed = content != text;

        Rewrite { content, report }
    }

    /// Edits a flow list spanning `lines`, whose first line is input line
    /// `first`, and emits what remains of it
    fn rewrite_flow_list(
        &self,
        lines: &[&str],
        first: usize,
        dropped: &BTreeSet<String>,
        content: &mut String,
        report: &mut RewriteReport,
    ) {
        let Some(edited) = self.dependencies.edit_flow_lines(lines, dropped) else {
            for line in lines {
                self.emit(line, content, report);
            }
            return;
        };

        for (offset, (before, after)) in lines.iter().zip(edited).enumerate() {
            if after.as_deref() == Some(*before) {
                self.emit(before, content, report);
                continue;
            }
            report.dependency_edits.push(DependencyEdit {
                line: first + offset + 1,
                before: before.trim_end().to_string(),
                after: after.as_deref().map(|a| a.trim_end().to_string()),
            });
            match after {
                Some(after) => self.emit(&after, content, report),
                None => report.dropped_lines += 1,
            }
        }
    }

    /// Renames a surviving line and appends it to the output
    fn emit(&self, line: &str, content: &mut String, report: &mut RewriteReport) {
        let renamed = self.renamer.apply(line);
        if let Cow::Owned(_) = renamed {
            report.renamed_lines += 1;
        }
        content.push_str(&renamed);
    }
}

/// Index one past the line that closes the flow list opened at `start`. An
/// unclosed list ends with its job.
fn flow_list_end(doc: &ScannedDocument<'_>, start: usize, job: usize) -> usize {
    let lines = doc.lines();
    let mut depth = 0;
    let mut idx = start;

    while idx < lines.len() && doc.role(idx) == LineRole::Job(job) {
        let text = if idx == start {
            lines[idx].split_once(':').map_or("", |(_, value)| value)
        } else {
            lines[idx]
        };
        depth += bracket_depth(strip_comment(text));
        idx += 1;
        if depth <= 0 {
            break;
        }
    }
    idx
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Blank lines, comments, and lines indented past the key keep a block list open
fn continues_block_list(line: &str, key_indent: usize) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return true;
    }
    // sequence items may sit at the key's own indentation
    indentation(line) > key_indent || (indentation(line) == key_indent && trimmed.starts_with("- "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn policy() -> RewritePolicy {
        RewritePolicy {
            classifier: JobClassifier::from_keywords(
                &["windows", "win", "android"],
                &["setup", "release", "cancel"],
                &["linux", "mac", "ios", "ubuntu"],
            ),
            renamer: Renamer::new("RustDesk", "BMDesk", ["uses:", "repository:", "secrets."]),
            jobs_marker: "jobs:".to_string(),
            needs_key: "needs:".to_string(),
        }
    }

    fn rewriter() -> WorkflowRewriter {
        WorkflowRewriter::new(policy())
    }

    const WORKFLOW: &str = "\
name: RustDesk Build
env:
  APP: RustDesk

jobs:
  build-windows:
    name: Build RustDesk for Windows
    runs-on: windows-latest
    steps:
      - uses: actions/checkout@v4
        with:
          repository: rustdesk/RustDesk

  build-linux:
    runs-on: ubuntu-latest
    steps:
      - run: echo RustDesk

  build-ubuntu:
    runs-on: ubuntu-latest

  publish-release:
    needs: [build-windows, build-linux, build-ubuntu]
    steps:
      - run: echo ${{ secrets.RustDesk_TOKEN }} RustDesk
";

    #[test]
    fn drops_excluded_jobs() {
        let out = rewriter().rewrite(WORKFLOW);
        assert!(!out.content.contains("build-linux:"));
        assert!(!out.content.contains("build-ubuntu:"));
        assert!(out.content.contains("build-windows:"));
        assert!(out.content.contains("publish-release:"));

        let dropped: Vec<_> = out.report.dropped().map(|j| j.name.as_str()).collect();
        assert_eq!(dropped, vec!["build-linux", "build-ubuntu"]);
        assert_eq!(out.report.kept().count(), 2);
    }

    #[test]
    fn repairs_needs_lists() {
        let out = rewriter().rewrite(WORKFLOW);
        assert!(out.content.contains("    needs: [build-windows]\n"));
        assert_eq!(out.report.dependency_edits.len(), 1);
        assert_eq!(
            out.report.dependency_edits[0].after.as_deref(),
            Some("    needs: [build-windows]")
        );
    }

    #[test]
    fn renames_outside_and_inside_jobs() {
        let out = rewriter().rewrite(WORKFLOW);
        assert!(out.content.starts_with("name: BMDesk Build\nenv:\n  APP: BMDesk\n"));
        assert!(out.content.contains("    name: Build BMDesk for Windows\n"));
    }

    #[test]
    fn protected_lines_keep_old_name() {
        let out = rewriter().rewrite(WORKFLOW);
        assert!(out.content.contains("          repository: rustdesk/RustDesk\n"));
        assert!(out.content.contains("${{ secrets.RustDesk_TOKEN }} RustDesk"));
    }

    #[test]
    fn dropped_job_trailing_blank_lines_go_too() {
        let out = rewriter().rewrite(WORKFLOW);
        assert!(out.content.contains("repository: rustdesk/RustDesk\n\n  publish-release:"));
    }

    #[test]
    fn reports_counts() {
        let out = rewriter().rewrite(WORKFLOW);
        assert!(out.report.found_jobs_section);
        assert!(out.report.changed);
        // build-linux: 5 lines, build-ubuntu: 3 lines
        assert_eq!(out.report.dropped_lines, 8);
        // name, APP, job name
        assert_eq!(out.report.renamed_lines, 3);
    }

    #[test]
    fn missing_jobs_section_only_renames() {
        let text = "name: RustDesk\n  build-linux:\n    needs: [build-linux]\n";
        let out = rewriter().rewrite(text);
        assert_eq!(out.content, "name: BMDesk\n  build-linux:\n    needs: [build-linux]\n");
        assert!(!out.report.found_jobs_section);
        assert!(out.report.jobs.is_empty());
    }

    #[test]
    fn block_list_items_for_dropped_jobs_are_removed() {
        let text = "\
jobs:
  build-linux:
    runs-on: ubuntu-latest
  build-windows:
    runs-on: windows-latest
  release:
    needs:
      - build-windows
      # keep comments
      - build-linux
    runs-on: windows-latest
    steps:
      - run: echo build-linux
";
        let out = rewriter().rewrite(text);
        assert_eq!(
            out.content,
            "\
jobs:
  build-windows:
    runs-on: windows-latest
  release:
    needs:
      - build-windows
      # keep comments
    runs-on: windows-latest
    steps:
      - run: echo build-linux
"
        );
        assert_eq!(out.report.dependency_edits.len(), 1);
        assert_eq!(out.report.dependency_edits[0].after, None);
        assert_eq!(out.report.dependency_edits[0].line, 10);
    }

    #[test]
    fn needs_lines_outside_kept_jobs_are_untouched() {
        let text = "needs: [build-linux]\njobs:\n  build-linux:\n    x: 1\n";
        let out = rewriter().rewrite(text);
        assert_eq!(out.content, "needs: [build-linux]\njobs:\n");
    }

    #[test]
    fn unchanged_document_reports_no_change() {
        let text = "jobs:\n  build-windows:\n    runs-on: windows-latest\n";
        let out = rewriter().rewrite(text);
        assert_eq!(out.content, text);
        assert!(!out.report.changed);
    }

    #[test]
    fn second_run_is_a_no_op() {
        let first = rewriter().rewrite(WORKFLOW);
        let second = rewriter().rewrite(&first.content);
        assert_eq!(second.content, first.content);
        assert_eq!(second.report.dropped().count(), 0);
        assert_eq!(second.report.renamed_lines, 0);
    }

    #[test]
    fn output_is_still_yaml() {
        let out = rewriter().rewrite(WORKFLOW);
        let value: serde_yaml::Value = serde_yaml::from_str(&out.content).unwrap();
        let jobs = value["jobs"].as_mapping().unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(value["env"]["APP"].as_str(), Some("BMDesk"));
    }

    #[test]
    fn multi_line_needs_lists_are_repaired() {
        let text = "\
jobs:
  build-linux:
    x: 1
  build-windows:
    x: 1
  publish:
    needs: [
      build-windows,
      build-linux
    ]
    steps: []
";
        let out = rewriter().rewrite(text);
        assert_eq!(
            out.content,
            "\
jobs:
  build-windows:
    x: 1
  publish:
    needs: [
      build-windows
    ]
    steps: []
"
        );
        assert_eq!(out.report.dependency_edits.len(), 2);
        assert_eq!(out.report.dependency_edits[1].line, 9);
        assert_eq!(out.report.dependency_edits[1].after, None);
        // build-linux block (2 lines) plus its list entry
        assert_eq!(out.report.dropped_lines, 3);

        let value: serde_yaml::Value = serde_yaml::from_str(&out.content).unwrap();
        assert_eq!(value["jobs"]["publish"]["needs"][0].as_str(), Some("build-windows"));
    }

    #[test]
    fn needs_comments_survive_edits() {
        let text = "\
jobs:
  build-linux:
    x: 1
  publish:
    needs: [build-windows, build-linux] # build-linux gone
";
        let out = rewriter().rewrite(text);
        assert!(out
            .content
            .contains("    needs: [build-windows] # build-linux gone\n"));
    }

    proptest! {
        #[test]
        fn surviving_needs_never_reference_dropped_jobs(
            names in prop::collection::btree_set("(build|test)-(windows|linux|mac|android|lint)", 1..6)
        ) {
            let names: Vec<String> = names.into_iter().collect();
            let mut text = String::from("jobs:\n");
            for name in &names {
                text.push_str(&format!("  {}:\n    runs-on: x\n", name));
            }
            text.push_str(&format!("  finalize:\n    needs: [{}]\n", names.join(", ")));

            let out = rewriter().rewrite(&text);
            let needs_line = out
                .content
                .lines()
                .find(|l| l.contains("needs:"))
                .unwrap()
                .to_string();
            for job in out.report.dropped() {
                let tokens: Vec<&str> = needs_line
                    .split(|c: char| c == '[' || c == ']' || c == ',' || c.is_whitespace())
                    .collect();
                prop_assert!(!tokens.contains(&job.name.as_str()));
            }

            let again = rewriter().rewrite(&out.content);
            prop_assert_eq!(again.content, out.content);
        }
    }
}
