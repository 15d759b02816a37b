//! `taskconv lint`: evaluate every rule over a batch of manifests.

use std::path::PathBuf;

use tracing::{info, instrument, warn};

use crate::core::engine::{LOAD_RULE, LintOptions, lint_manifest};
use crate::core::report::Report;
use crate::core::rules::RuleSet;
use crate::core::types::{Severity, Violation};
use crate::io::discover::collect_manifests;
use crate::io::manifest_store::load_manifest;

/// Lint `inputs` (files or directories) sequentially, in input order.
///
/// A manifest that cannot be read becomes a single `load` error; the batch
/// always visits every input.
#[instrument(skip_all, fields(inputs = inputs.len(), strict = options.strict))]
pub fn lint_paths(inputs: &[PathBuf], rules: &RuleSet, options: LintOptions) -> Report {
    let mut report = Report::new();
    for path in collect_manifests(inputs) {
        let violations = match load_manifest(&path) {
            Ok(manifest) => lint_manifest(&manifest, rules, options),
            Err(err) => {
                warn!(path = %path.display(), err = %err, "manifest not loaded");
                vec![Violation::new(
                    &path,
                    None,
                    LOAD_RULE,
                    Severity::Error,
                    err.to_string(),
                )]
            }
        };
        report.add_file(&path, &violations);
    }
    info!(
        files = report.total_files,
        errors = report.errors,
        warnings = report.warnings,
        "lint complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes;
    use crate::test_support::TestRepo;

    #[test]
    fn missing_file_does_not_stop_the_batch() {
        let repo = TestRepo::new();
        let good = repo.write("taskfiles/Taskfile.ok.yml", "version: '3'\ntasks:\n  hello:\n    cmds:\n      - echo hi\n");
        let missing = repo.path().join("taskfiles/Taskfile.gone.yml");

        let report = lint_paths(
            &[missing.clone(), good.clone()],
            &RuleSet::default(),
            LintOptions::default(),
        );
        assert_eq!(report.total_files, 2);
        assert_eq!(report.errors, 1);
        assert_eq!(report.results[0].file, missing);
        assert_eq!(report.results[0].violations[0].rule, LOAD_RULE);
        assert!(report.results[0].violations[0].line.is_none());
        assert_eq!(report.results[1].file, good);
        assert!(report.results[1].violations.is_empty());
        assert_eq!(report.exit_code(false), exit_codes::FAILED);
    }

    #[test]
    fn directory_input_is_expanded() {
        let repo = TestRepo::new();
        repo.write(
            "taskfiles/tools/Taskfile.jq.yml",
            "vars:\n  JQ_BIN: jq\n  JQ_VERSION: '1.7'\n  JQ_REPO: jqlang/jq\ntasks:\n  check:deps:\n    cmds:\n      - which jq\n",
        );
        repo.write("Taskfile.yml", "includes:\n  jq: ./taskfiles/tools/Taskfile.jq.yml\n");

        let report = lint_paths(
            &[repo.path().to_path_buf()],
            &RuleSet::default(),
            LintOptions::default(),
        );
        assert_eq!(report.total_files, 2);
        let jq = &report.results[1];
        let rules: Vec<&str> = jq.violations.iter().map(|v| v.rule.as_str()).collect();
        assert_eq!(
            rules,
            vec!["exe-ext", "required-tasks", "required-tasks", "status-block"]
        );
    }
}
