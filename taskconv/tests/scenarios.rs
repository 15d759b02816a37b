//! End-to-end library scenarios: classification, requirement rules, and fixes
//! on realistic manifests.

use taskconv::core::classifier::classify;
use taskconv::core::engine::{LintOptions, fix_manifest, lint_manifest};
use taskconv::core::manifest::Manifest;
use taskconv::core::rules::RuleSet;
use taskconv::core::types::{Affinity, Archetype, Severity};
use taskconv::test_support::manifest_with;

const TOOL_TASKS: [&str; 3] = ["check:deps", "release:build", "release:test"];

#[test]
fn tool_manifest_defaults_to_cross_affinity() {
    let manifest = manifest_with(
        &[
            ("DUMMY_BIN", "dummy"),
            ("DUMMY_VERSION", "1.0.0"),
            ("DUMMY_REPO", "org/dummy"),
        ],
        &TOOL_TASKS,
    );
    let info = classify(&manifest);
    assert_eq!(info.archetype, Archetype::Tool);
    assert_eq!(info.affinity, Some(Affinity::Cross));
}

#[test]
fn cgo_marker_makes_tool_native() {
    let manifest = manifest_with(
        &[
            ("DUMMY_BIN", "dummy"),
            ("DUMMY_VERSION", "1.0.0"),
            ("DUMMY_REPO", "org/dummy"),
            ("DUMMY_CGO", "1"),
        ],
        &TOOL_TASKS,
    );
    let info = classify(&manifest);
    assert_eq!(info.archetype, Archetype::Tool);
    assert_eq!(info.affinity, Some(Affinity::Native));
}

#[test]
fn includes_only_manifest_is_aggregation_without_requirements() {
    let manifest = Manifest::from_source(
        "Taskfile.yml",
        "version: '3'\n\nincludes:\n  golang: ./taskfiles/toolchain/Taskfile.golang.yml\n  bun: ./taskfiles/toolchain/Taskfile.bun.yml\n",
    );
    assert_eq!(classify(&manifest).archetype, Archetype::Aggregation);
    let violations = lint_manifest(&manifest, &RuleSet::default(), LintOptions::default());
    assert!(violations.is_empty(), "{violations:?}");
}

#[test]
fn bin_and_version_without_repo_is_external() {
    let manifest = manifest_with(&[("PC_BIN", "pc"), ("PC_VERSION", "2.1")], &["check:deps"]);
    let info = classify(&manifest);
    assert_eq!(info.archetype, Archetype::External);
    assert_eq!(info.affinity, None);
}

#[test]
fn exe_ext_fix_is_applied_once() {
    let source = "version: '3'\nvars:\n  DUMMY_BIN: 'dummy'\n  DUMMY_VERSION: 1.0.0\n";
    let rules = RuleSet::default();

    let first = fix_manifest(Manifest::from_source("Taskfile.dummy.yml", source), &rules);
    assert_eq!(
        first.manifest.raw(),
        "version: '3'\nvars:\n  DUMMY_BIN: 'dummy{{exeExt}}'\n  DUMMY_VERSION: 1.0.0\n"
    );

    let second = fix_manifest(first.manifest.clone(), &rules);
    assert!(!second.changed());
    assert_eq!(second.manifest.raw(), first.manifest.raw());
}

#[test]
fn strict_lint_turns_style_warnings_into_errors() {
    let manifest = manifest_with(
        &[("PC_BIN", "pc"), ("PC_VERSION", "2.1")],
        &["check:deps"],
    );
    let rules = RuleSet::default();

    let relaxed = lint_manifest(&manifest, &rules, LintOptions::default());
    let severities: Vec<(&str, Severity)> =
        relaxed.iter().map(|v| (v.rule(), v.severity())).collect();
    assert_eq!(
        severities,
        vec![
            ("exe-ext", Severity::Warning),
            ("status-block", Severity::Warning),
        ]
    );

    let strict = lint_manifest(&manifest, &rules, LintOptions { strict: true });
    assert!(strict.iter().all(|v| v.severity() == Severity::Error));
}
