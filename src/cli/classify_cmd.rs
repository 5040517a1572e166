//! The `classify` command: preview job classification

use anyhow::Result;
use serde::Serialize;

use super::output::Output;
use crate::domain::{Decision, JobClassifier};
use crate::storage::Config;

#[derive(Serialize)]
struct ClassifiedName<'a> {
    name: &'a str,
    #[serde(flatten)]
    decision: Decision,
}

pub fn run(output: &Output, config: &Config, names: &[String]) -> Result<()> {
    let policy = config.to_policy();
    let classifier: &JobClassifier = &policy.classifier;

    for rule in classifier.rules() {
        output.verbose_ctx(
            "classify",
            &format!("rule {} -> {}: {:?}", rule.name(), rule.outcome(), rule.keywords()),
        );
    }

    let classified: Vec<_> = names
        .iter()
        .map(|name| ClassifiedName {
            name,
            decision: classifier.decide(name),
        })
        .collect();

    if output.is_json() {
        output.data(&classified);
    } else {
        for item in &classified {
            let reason = item.decision.to_string();
            output.row(&[item.name, reason.as_str()]);
        }
    }

    Ok(())
}
