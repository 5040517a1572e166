//! Line-oriented job block scanner
//!
//! Assigns every line of a workflow document to a role: outside the jobs
//! section, the `jobs:` marker itself, inside the section but before the
//! first job, or the body of a specific job.
//!
//! Job headers are key lines (`  name:`) at the indentation of the first key
//! found after the marker. A column-0 key after the marker closes the section.

use regex::Regex;
use serde::Serialize;

/// Where a line sits in the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRole {
    /// Before the jobs section, or after it closed
    Outside,
    /// The jobs section marker line
    Marker,
    /// Inside the jobs section, before any job header
    Unassigned,
    /// Header or body line of the job at this index
    Job(usize),
}

/// A job block found in the jobs section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobBlock {
    pub name: String,
    pub indent: usize,
    /// Index of the header line
    pub start: usize,
    /// Index one past the last line of the block
    pub end: usize,
}

impl JobBlock {
    pub fn line_count(&self) -> usize {
        self.end - self.start
    }
}

/// The result of scanning a document
#[derive(Debug, Clone)]
pub struct ScannedDocument<'a> {
    lines: Vec<&'a str>,
    roles: Vec<LineRole>,
    jobs: Vec<JobBlock>,
    found_marker: bool,
}

impl<'a> ScannedDocument<'a> {
    pub fn lines(&self) -> &[&'a str] {
        &self.lines
    }

    pub fn jobs(&self) -> &[JobBlock] {
        &self.jobs
    }

    pub fn role(&self, index: usize) -> LineRole {
        self.roles[index]
    }

    /// Returns true if a jobs section marker was seen
    pub fn found_marker(&self) -> bool {
        self.found_marker
    }
}

/// Scans documents for the jobs section and its job blocks
#[derive(Debug, Clone)]
pub struct SectionScanner {
    marker: String,
    key_line: Regex,
}

impl SectionScanner {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            key_line: Regex::new(r"^(\s+)([\w-]+):").expect("static regex"),
        }
    }

    /// Scans a document. Line terminators stay attached to their lines.
    pub fn scan<'a>(&self, text: &'a str) -> ScannedDocument<'a> {
        let lines: Vec<&str> = text.split_inclusive('\n').collect();
        let mut roles = Vec::with_capacity(lines.len());
        let mut jobs: Vec<JobBlock> = Vec::new();
        let mut found_marker = false;

        let mut in_section = false;
        let mut job_indent: Option<usize> = None;
        let mut current: Option<usize> = None;

        for (idx, line) in lines.iter().enumerate() {
            let trimmed = line.trim();

            if in_section && closes_section(line) {
                in_section = false;
                if let Some(j) = current.take() {
                    jobs[j].end = idx;
                }
            }

            if !in_section {
                if !self.marker.is_empty() && trimmed == self.marker {
                    in_section = true;
                    found_marker = true;
                    job_indent = None;
                    roles.push(LineRole::Marker);
                } else {
                    roles.push(LineRole::Outside);
                }
                continue;
            }

            if let Some(caps) = self.key_line.captures(line) {
                let indent = caps[1].len();
                let frozen = *job_indent.get_or_insert(indent);

                if indent == frozen {
                    if let Some(j) = current {
                        jobs[j].end = idx;
                    }
                    jobs.push(JobBlock {
                        name: caps[2].to_string(),
                        indent,
                        start: idx,
                        end: idx + 1,
                    });
                    current = Some(jobs.len() - 1);
                }
            }

            roles.push(match current {
                Some(j) => LineRole::Job(j),
                None => LineRole::Unassigned,
            });
        }

        if let Some(j) = current {
            jobs[j].end = lines.len();
        }

        ScannedDocument {
            lines,
            roles,
            jobs,
            found_marker,
        }
    }
}

/// A non-blank, non-comment line starting at column 0
fn closes_section(line: &str) -> bool {
    match line.chars().next() {
        Some(c) if !c.is_whitespace() => !line.starts_with('#'),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "\
name: Build
on: [push]

jobs:
  build-windows:
    runs-on: windows-latest
    steps:
      - run: echo hi

  build-linux:
    runs-on: ubuntu-latest
    # comment
  release:
    needs: [build-windows]
";

    #[test]
    fn finds_jobs_and_extents() {
        let doc = SectionScanner::new("jobs:").scan(DOC);
        let names: Vec<_> = doc.jobs().iter().map(|j| j.name.as_str()).collect();
        assert_eq!(names, vec!["build-windows", "build-linux", "release"]);

        let windows = &doc.jobs()[0];
        assert_eq!(windows.indent, 2);
        assert_eq!((windows.start, windows.end), (4, 9));
        assert_eq!(doc.jobs()[1].line_count(), 3);
        assert_eq!(doc.jobs()[2].end, doc.lines().len());
    }

    #[test]
    fn assigns_roles() {
        let doc = SectionScanner::new("jobs:").scan(DOC);
        assert_eq!(doc.role(0), LineRole::Outside);
        assert_eq!(doc.role(2), LineRole::Outside);
        assert_eq!(doc.role(3), LineRole::Marker);
        assert_eq!(doc.role(4), LineRole::Job(0));
        assert_eq!(doc.role(8), LineRole::Job(0));
        assert_eq!(doc.role(11), LineRole::Job(1));
        assert_eq!(doc.role(13), LineRole::Job(2));
        assert!(doc.found_marker());
    }

    #[test]
    fn nested_keys_do_not_start_jobs() {
        let doc = SectionScanner::new("jobs:").scan(DOC);
        assert!(doc.jobs().iter().all(|j| j.name != "runs-on" && j.name != "steps"));
    }

    #[test]
    fn lines_before_first_job_are_unassigned() {
        let text = "jobs:\n  # leading comment\n\n  a:\n    x: 1\n";
        let doc = SectionScanner::new("jobs:").scan(text);
        assert_eq!(doc.role(1), LineRole::Unassigned);
        assert_eq!(doc.role(2), LineRole::Unassigned);
        assert_eq!(doc.role(3), LineRole::Job(0));
    }

    #[test]
    fn column_zero_key_closes_section() {
        let text = "jobs:\n  a:\n    x: 1\nenv:\n  b: 2\n";
        let doc = SectionScanner::new("jobs:").scan(text);
        assert_eq!(doc.jobs().len(), 1);
        assert_eq!(doc.jobs()[0].end, 3);
        assert_eq!(doc.role(3), LineRole::Outside);
        assert_eq!(doc.role(4), LineRole::Outside);
    }

    #[test]
    fn column_zero_comment_does_not_close_section() {
        let text = "jobs:\n  a:\n# note\n    x: 1\n";
        let doc = SectionScanner::new("jobs:").scan(text);
        assert_eq!(doc.role(2), LineRole::Job(0));
        assert_eq!(doc.role(3), LineRole::Job(0));
    }

    #[test]
    fn missing_marker_leaves_everything_outside() {
        let text = "name: x\n  a:\n    b: 1\n";
        let doc = SectionScanner::new("jobs:").scan(text);
        assert!(!doc.found_marker());
        assert!(doc.jobs().is_empty());
        assert!((0..doc.lines().len()).all(|i| doc.role(i) == LineRole::Outside));
    }

    #[test]
    fn preserves_crlf_and_missing_final_newline() {
        let text = "jobs:\r\n  a:\r\n    x: 1";
        let doc = SectionScanner::new("jobs:").scan(text);
        assert_eq!(doc.lines(), &["jobs:\r\n", "  a:\r\n", "    x: 1"]);
        assert_eq!(doc.jobs()[0].name, "a");
    }
}
