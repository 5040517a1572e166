//! Domain logic for workflow rebranding
//!
//! Pure text transformations with no I/O. A [`WorkflowRewriter`] is built from
//! a [`RewritePolicy`] and turns one workflow document into its rebranded form.

mod classify;
mod needs;
mod rename;
mod rewrite;
mod scanner;

pub use classify::{Classification, Decision, JobClassifier, Rule};
pub use needs::{block_item, DependencyEditor};
pub use rename::Renamer;
pub use rewrite::{
    DependencyEdit, JobOutcome, Rewrite, RewritePolicy, RewriteReport, WorkflowRewriter,
};
pub use scanner::{JobBlock, LineRole, ScannedDocument, SectionScanner};
