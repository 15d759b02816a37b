//! Convention rules.
//!
//! Lint rules only detect. Format rules detect and also know how to rewrite the
//! offending lines. Both report through the same [`Violation`] type, so a lint
//! run is simply every lint rule followed by every format rule's check.
//!
//! Rule contracts:
//! - `check` never mutates and is deterministic for a given manifest.
//! - `fix` returns the manifest text unchanged when `check` is empty.
//! - `fix` only touches lines its `check` reported, and `fix(fix(m)) == fix(m)`.

use crate::core::manifest::Manifest;
use crate::core::types::Violation;

pub mod echo_quote;
pub mod exe_ext;
pub mod required;
pub mod self_reference;

pub use echo_quote::EchoQuote;
pub use exe_ext::ExeExt;
pub use required::{RequiredTasks, RequiredVars, StatusBlock};
pub use self_reference::SelfReference;

/// Default placeholder variable for a manifest's own path.
pub const DEFAULT_SELF_PATH_VAR: &str = "TASKFILE";

/// A read-only convention check identified by a stable name.
pub trait Rule {
    fn name(&self) -> &'static str;
    fn check(&self, manifest: &Manifest) -> Vec<Violation>;
}

/// A rule that can also rewrite the manifest text to remove its violations.
pub trait FormatRule: Rule {
    /// Full manifest text with this rule's violations fixed.
    fn fix(&self, manifest: &Manifest) -> String;
}

/// Options that shape rule construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOptions {
    /// Variable used in place of bare self-references (`{{.TASKFILE}}`).
    pub self_path_var: String,
    /// Rule names to leave out of both lists.
    pub disabled: Vec<String>,
}

impl Default for RuleOptions {
    fn default() -> Self {
        Self {
            self_path_var: DEFAULT_SELF_PATH_VAR.to_string(),
            disabled: Vec::new(),
        }
    }
}

/// Immutable, ordered rule lists built once per command.
pub struct RuleSet {
    lint: Vec<Box<dyn Rule>>,
    format: Vec<Box<dyn FormatRule>>,
}

impl RuleSet {
    pub fn new(options: &RuleOptions) -> Self {
        let enabled = |name: &str| !options.disabled.iter().any(|disabled| disabled == name);

        let lint: Vec<Box<dyn Rule>> = vec![
            Box::new(RequiredVars),
            Box::new(RequiredTasks),
            Box::new(StatusBlock),
        ];
        // Order matters for sequential fixing: each fix leaves lines the
        // following rules either ignore or also accept.
        let format: Vec<Box<dyn FormatRule>> = vec![
            Box::new(ExeExt),
            Box::new(SelfReference::new(&options.self_path_var)),
            Box::new(EchoQuote),
        ];

        Self {
            lint: lint.into_iter().filter(|rule| enabled(rule.name())).collect(),
            format: format
                .into_iter()
                .filter(|rule| enabled(rule.name()))
                .collect(),
        }
    }

    pub fn lint_rules(&self) -> &[Box<dyn Rule>] {
        &self.lint
    }

    pub fn format_rules(&self) -> &[Box<dyn FormatRule>] {
        &self.format
    }

    /// Names of every rule in evaluation order (lint first).
    pub fn names(&self) -> Vec<&'static str> {
        self.lint
            .iter()
            .map(|rule| rule.name())
            .chain(self.format.iter().map(|rule| rule.name()))
            .collect()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new(&RuleOptions::default())
    }
}

/// Every known rule name, used to validate configuration.
pub const RULE_NAMES: [&str; 6] = [
    required::REQUIRED_VARS,
    required::REQUIRED_TASKS,
    required::STATUS_BLOCK,
    exe_ext::NAME,
    self_reference::NAME,
    echo_quote::NAME,
];

/// Placeholder spans (`{{ ... }}`) in `text` as byte ranges.
pub(crate) fn template_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut from = 0;
    while let Some(open) = text[from..].find("{{") {
        let start = from + open;
        match text[start + 2..].find("}}") {
            Some(close) => {
                let end = start + 2 + close + 2;
                spans.push((start, end));
                from = end;
            }
            None => {
                spans.push((start, text.len()));
                break;
            }
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rule_order_is_stable() {
        let rules = RuleSet::default();
        assert_eq!(rules.names(), RULE_NAMES.to_vec());
    }

    #[test]
    fn disabled_rules_are_dropped() {
        let rules = RuleSet::new(&RuleOptions {
            disabled: vec!["echo-quote".to_string(), "status-block".to_string()],
            ..RuleOptions::default()
        });
        assert_eq!(
            rules.names(),
            vec!["required-vars", "required-tasks", "exe-ext", "self-reference"]
        );
    }

    #[test]
    fn template_spans_cover_placeholders() {
        let text = "a {{.X | upper}} b {{.Y}}";
        assert_eq!(template_spans(text), vec![(2, 16), (19, 25)]);
        assert_eq!(template_spans("x {{ open"), vec![(2, 9)]);
    }
}
