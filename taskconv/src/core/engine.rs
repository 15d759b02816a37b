//! Rule evaluation over a single manifest.
//!
//! Lint runs every lint rule and then every format rule's check. Fixing walks
//! the format rules in order, re-deriving the manifest after each rewrite so a
//! rule always sees the output of the rules before it.

use tracing::{debug, warn};

use crate::core::error::FixError;
use crate::core::manifest::Manifest;
use crate::core::rules::{FormatRule, RuleSet};
use crate::core::types::{Severity, Violation};

/// Rule id reported when the YAML cannot be structured.
pub const PARSE_RULE: &str = "parse";
/// Rule id reported when a manifest cannot be read at all.
pub const LOAD_RULE: &str = "load";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LintOptions {
    /// Escalate warnings to errors.
    pub strict: bool,
}

/// Evaluate all rules against `manifest`.
///
/// Unstructured manifests get a single `parse` error and only the raw-text
/// format checks, since lint rules need the variable/task map.
pub fn lint_manifest(manifest: &Manifest, rules: &RuleSet, options: LintOptions) -> Vec<Violation> {
    let mut violations = Vec::new();

    match manifest.parse_error() {
        Some(message) => violations.push(Violation::new(
            manifest.path(),
            None,
            PARSE_RULE,
            Severity::Error,
            message,
        )),
        None => {
            for rule in rules.lint_rules() {
                violations.extend(rule.check(manifest));
            }
        }
    }
    for rule in rules.format_rules() {
        violations.extend(rule.check(manifest));
    }

    // Stable sort keeps rule order for violations on the same line.
    violations.sort_by_key(|violation| violation.line().unwrap_or(0));

    if options.strict {
        violations = violations
            .into_iter()
            .map(|violation| match violation.severity() {
                Severity::Warning => violation.escalated(),
                Severity::Error => violation,
            })
            .collect();
    }
    debug!(
        path = %manifest.path().display(),
        count = violations.len(),
        "lint finished"
    );
    violations
}

/// Apply one format rule. `Ok(None)` means the rule had nothing to fix.
pub fn apply_fix(rule: &dyn FormatRule, manifest: &Manifest) -> Result<Option<Manifest>, FixError> {
    if rule.check(manifest).is_empty() {
        return Ok(None);
    }
    let fixed = rule.fix(manifest);
    let next = Manifest::from_source(manifest.path(), fixed);
    let remaining = rule.check(&next).len();
    if remaining > 0 {
        return Err(FixError::Unconverged {
            rule: rule.name(),
            path: manifest.path().to_path_buf(),
            remaining,
        });
    }
    Ok(Some(next))
}

/// A format rule that changed the manifest, with the lines it flagged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedFix {
    pub rule: &'static str,
    pub lines: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct FixOutcome {
    /// Manifest derived from the final content.
    pub manifest: Manifest,
    pub applied: Vec<AppliedFix>,
    /// Rules whose fix was rejected; the pipeline continued without them.
    pub errors: Vec<FixError>,
}

impl FixOutcome {
    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// Run every format rule in order, threading the content forward.
pub fn fix_manifest(manifest: Manifest, rules: &RuleSet) -> FixOutcome {
    let mut current = manifest;
    let mut applied = Vec::new();
    let mut errors = Vec::new();

    for rule in rules.format_rules() {
        let lines = rule
            .check(&current)
            .iter()
            .filter_map(Violation::line)
            .collect::<Vec<_>>();
        match apply_fix(rule.as_ref(), &current) {
            Ok(Some(next)) => {
                debug!(rule = rule.name(), lines = ?lines, "fix applied");
                applied.push(AppliedFix {
                    rule: rule.name(),
                    lines,
                });
                current = next;
            }
            Ok(None) => {}
            Err(err) => {
                warn!(err = %err, "fix rejected");
                errors.push(err);
            }
        }
    }

    FixOutcome {
        manifest: current,
        applied,
        errors,
    }
}
