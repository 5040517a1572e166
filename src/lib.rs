//! workflow-rebrand - rebrand CI workflow files
//!
//! Renames a product string throughout workflow definitions, removes job
//! blocks for platforms that are no longer built, and repairs `needs:` lists
//! that referenced them.

pub mod cli;
pub mod domain;
pub mod storage;

pub use domain::{Classification, JobClassifier, RewritePolicy, WorkflowRewriter};
pub use storage::Config;
