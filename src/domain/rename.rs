//! Product-name substitution
//!
//! Renaming is all-or-nothing per line: a line that mentions a protected
//! marker (an action reference, a repository key, a secrets lookup) is left
//! exactly as written, otherwise every occurrence is replaced.

use std::borrow::Cow;

/// Replaces the old product name with the new one on unprotected lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renamer {
    old: String,
    new: String,
    protected: Vec<String>,
}

impl Renamer {
    pub fn new<I, S>(old: impl Into<String>, new: impl Into<String>, protected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            old: old.into(),
            new: new.into(),
            protected: protected
                .into_iter()
                .map(Into::<String>::into)
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    /// Returns true if the line carries a protected marker
    pub fn is_protected(&self, line: &str) -> bool {
        self.protected.iter().any(|m| line.contains(m.as_str()))
    }

    /// Applies the rename to a single line
    pub fn apply<'a>(&self, line: &'a str) -> Cow<'a, str> {
        if self.old.is_empty() || self.is_protected(line) || !line.contains(self.old.as_str()) {
            return Cow::Borrowed(line);
        }
        Cow::Owned(line.replace(self.old.as_str(), &self.new))
    }
}
