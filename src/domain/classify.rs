//! Job classification
//!
//! Decides whether a job block survives the rewrite. Rules are evaluated in
//! order and the first rule with a matching keyword wins:
//!
//! 1. Target platform keywords (keep)
//! 2. Infrastructure keywords (keep)
//! 3. Excluded platform keywords (drop)
//!
//! Names that match no rule fall back to the default classification (keep).
//! Matching is case-insensitive substring matching, so `win` also matches
//! `darwin`. That is a known imprecision of the heuristic.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a job is kept or dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Keep,
    Drop,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Keep => "keep",
            Classification::Drop => "drop",
        }
    }

    pub fn is_drop(&self) -> bool {
        *self == Classification::Drop
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named keyword list mapped to a classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    name: String,
    keywords: Vec<String>,
    outcome: Classification,
}

impl Rule {
    /// Creates a rule; keywords are lower-cased and empty ones discarded
    pub fn new<I, S>(name: impl Into<String>, keywords: I, outcome: Classification) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            outcome,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn outcome(&self) -> Classification {
        self.outcome
    }

    /// Returns the first keyword contained in an already lower-cased name
    fn first_match(&self, lowered: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|k| lowered.contains(k.as_str()))
            .map(String::as_str)
    }
}

/// The outcome of classifying one job name, with the rule that decided it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub classification: Classification,
    /// Name of the deciding rule, or `"default"`
    pub rule: String,
    /// Keyword that matched, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.keyword {
            Some(k) => write!(f, "{} ({}: '{}')", self.classification, self.rule, k),
            None => write!(f, "{} ({})", self.classification, self.rule),
        }
    }
}

/// Ordered rule list with a default fallback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobClassifier {
    rules: Vec<Rule>,
    default: Classification,
}

impl Default for JobClassifier {
    fn default() -> Self {
        Self::new(Vec::new(), Classification::Keep)
    }
}

impl JobClassifier {
    pub fn new(rules: Vec<Rule>, default: Classification) -> Self {
        Self { rules, default }
    }

    /// Builds the standard three-rule classifier: targets and infrastructure
    /// keep, excluded platforms drop, anything else keeps.
    pub fn from_keywords<S: AsRef<str>>(
        targets: &[S],
        infrastructure: &[S],
        exclude: &[S],
    ) -> Self {
        Self::new(
            vec![
                Rule::new("target", targets, Classification::Keep),
                Rule::new("infrastructure", infrastructure, Classification::Keep),
                Rule::new("exclude", exclude, Classification::Drop),
            ],
            Classification::Keep,
        )
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Classifies a job name, returning the deciding rule
    pub fn decide(&self, job_name: &str) -> Decision {
        let lowered = job_name.to_lowercase();

        for rule in &self.rules {
            if let Some(keyword) = rule.first_match(&lowered) {
                return Decision {
                    classification: rule.outcome,
                    rule: rule.name.clone(),
                    keyword: Some(keyword.to_string()),
                };
            }
        }

        Decision {
            classification: self.default,
            rule: "default".to_string(),
            keyword: None,
        }
    }

    /// Classifies a job name
    pub fn classify(&self, job_name: &str) -> Classification {
        self.decide(job_name).classification
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn classifier() -> JobClassifier {
        JobClassifier::from_keywords(
            &["windows", "win", "android"],
            &["setup", "release", "cancel"],
            &["linux", "mac", "ios", "ubuntu"],
        )
    }

    #[test]
    fn target_platform_wins_over_exclude() {
        let c = classifier();
        assert_eq!(c.classify("build-windows-release"), Classification::Keep);
        assert_eq!(c.classify("android-on-linux"), Classification::Keep);
    }

    #[test]
    fn infrastructure_wins_over_exclude() {
        let c = classifier();
        let decision = c.decide("linux-release");
        assert_eq!(decision.classification, Classification::Keep);
        assert_eq!(decision.rule, "infrastructure");
        assert_eq!(decision.keyword.as_deref(), Some("release"));
    }

    #[test]
    fn exclude_only_drops() {
        let c = classifier();
        let decision = c.decide("build-ubuntu");
        assert_eq!(decision.classification, Classification::Drop);
        assert_eq!(decision.rule, "exclude");
        assert_eq!(decision.keyword.as_deref(), Some("ubuntu"));
    }

    #[test]
    fn unknown_defaults_to_keep() {
        let c = classifier();
        let decision = c.decide("lint");
        assert_eq!(decision.classification, Classification::Keep);
        assert_eq!(decision.rule, "default");
        assert!(decision.keyword.is_none());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let c = classifier();
        assert_eq!(c.classify("Build-MacOS"), Classification::Drop);
        assert_eq!(c.classify("BUILD-WINDOWS"), Classification::Keep);
    }

    #[test]
    fn substring_matches_inside_other_words() {
        // "darwin" contains "win", so the target rule keeps it
        let c = classifier();
        assert_eq!(c.classify("build-darwin"), Classification::Keep);
        // "imac-tools" contains "mac"
        assert_eq!(c.classify("imac-tools"), Classification::Drop);
    }

    #[test]
    fn empty_keywords_are_ignored() {
        let c = JobClassifier::from_keywords(&[""], &["  "], &["linux"]);
        assert_eq!(c.rules()[0].keywords().len(), 0);
        assert_eq!(c.classify("anything"), Classification::Keep);
        assert_eq!(c.classify("linux"), Classification::Drop);
    }

    #[test]
    fn first_rule_wins_in_custom_order() {
        let c = JobClassifier::new(
            vec![
                Rule::new("drop-first", ["test"], Classification::Drop),
                Rule::new("keep-later", ["test"], Classification::Keep),
            ],
            Classification::Keep,
        );
        assert_eq!(c.classify("unit-test"), Classification::Drop);
    }

    #[test]
    fn decision_display() {
        let c = classifier();
        assert_eq!(c.decide("build-ubuntu").to_string(), "drop (exclude: 'ubuntu')");
        assert_eq!(c.decide("lint").to_string(), "keep (default)");
    }

    proptest! {
        #[test]
        fn allow_terms_always_keep(prefix in "[a-z-]{0,8}", suffix in "[a-z-]{0,8}", allow in prop::sample::select(vec!["windows", "android", "setup", "release"])) {
            let name = format!("{}{}-linux{}", prefix, allow, suffix);
            prop_assert_eq!(classifier().classify(&name), Classification::Keep);
        }

        #[test]
        fn names_without_keywords_keep(name in "[b-h0-9_-]{1,12}") {
            // this alphabet cannot spell any keyword
            prop_assert_eq!(classifier().classify(&name), Classification::Keep);
        }
    }
}
