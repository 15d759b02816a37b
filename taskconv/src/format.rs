//! `taskconv fmt`: apply format-rule fixes to a batch of manifests.

use std::path::PathBuf;

use tracing::{info, instrument, warn};

use crate::core::engine::{AppliedFix, fix_manifest};
use crate::core::error::FixError;
use crate::core::rules::RuleSet;
use crate::exit_codes;
use crate::io::discover::collect_manifests;
use crate::io::manifest_store::{load_manifest, write_manifest};

/// What happened to one manifest.
#[derive(Debug)]
pub struct FileFormat {
    pub path: PathBuf,
    pub applied: Vec<AppliedFix>,
    pub fix_errors: Vec<FixError>,
    /// Load or write failure; the file was left untouched.
    pub error: Option<String>,
}

impl FileFormat {
    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct FormatSummary {
    pub dry_run: bool,
    pub files: Vec<FileFormat>,
}

impl FormatSummary {
    pub fn changed_files(&self) -> usize {
        self.files.iter().filter(|file| file.changed()).count()
    }

    pub fn failed_files(&self) -> usize {
        self.files
            .iter()
            .filter(|file| file.error.is_some() || !file.fix_errors.is_empty())
            .count()
    }

    pub fn render_text(&self) -> String {
        let verb = if self.dry_run { "would fix" } else { "fixed" };
        let mut out = String::new();
        for file in &self.files {
            let path = file.path.display();
            if let Some(err) = &file.error {
                out.push_str(&format!("{path}: error: {err}\n"));
                continue;
            }
            for fix in &file.applied {
                let lines = fix
                    .lines
                    .iter()
                    .map(usize::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                out.push_str(&format!("{path}: {verb} {} (lines {lines})\n", fix.rule));
            }
            for err in &file.fix_errors {
                out.push_str(&format!("{path}: error: {err}\n"));
            }
        }
        out.push_str(&format!(
            "{} of {} file(s) {}\n",
            self.changed_files(),
            self.files.len(),
            if self.dry_run { "would change" } else { "changed" }
        ));
        out
    }

    /// Dry runs always succeed; otherwise any per-file failure is reported.
    pub fn exit_code(&self) -> i32 {
        if !self.dry_run && self.failed_files() > 0 {
            exit_codes::FAILED
        } else {
            exit_codes::OK
        }
    }
}

/// Fix every manifest under `inputs`, writing changed files unless `dry_run`.
///
/// Each file is computed fully in memory and written once.
#[instrument(skip_all, fields(inputs = inputs.len(), dry_run))]
pub fn format_paths(inputs: &[PathBuf], rules: &RuleSet, dry_run: bool) -> FormatSummary {
    let mut summary = FormatSummary {
        dry_run,
        files: Vec::new(),
    };
    for path in collect_manifests(inputs) {
        let manifest = match load_manifest(&path) {
            Ok(manifest) => manifest,
            Err(err) => {
                warn!(path = %path.display(), err = %err, "manifest not loaded");
                summary.files.push(FileFormat {
                    path,
                    applied: Vec::new(),
                    fix_errors: Vec::new(),
                    error: Some(err.to_string()),
                });
                continue;
            }
        };

        let outcome = fix_manifest(manifest, rules);
        let mut error = None;
        if outcome.changed()
            && !dry_run
            && let Err(err) = write_manifest(&outcome.manifest)
        {
            warn!(path = %path.display(), err = %err, "manifest not written");
            error = Some(format!("{err:#}"));
        }
        summary.files.push(FileFormat {
            path,
            applied: outcome.applied,
            fix_errors: outcome.errors,
            error,
        });
    }
    info!(
        files = summary.files.len(),
        changed = summary.changed_files(),
        "format complete"
    );
    summary
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::test_support::TestRepo;

    const DIRTY: &str = "vars:\n  DUMMY_BIN: 'dummy'\ntasks:\n  hi:\n    cmds:\n      - echo Installing: x\n";

    #[test]
    fn writes_fixed_content() {
        let repo = TestRepo::new();
        let path = repo.write("taskfiles/Taskfile.dummy.yml", DIRTY);

        let summary = format_paths(&[path.clone()], &RuleSet::default(), false);
        assert_eq!(summary.changed_files(), 1);
        assert_eq!(summary.exit_code(), exit_codes::OK);
        assert_eq!(
            fs::read_to_string(&path).expect("read"),
            "vars:\n  DUMMY_BIN: 'dummy{{exeExt}}'\ntasks:\n  hi:\n    cmds:\n      - 'echo \"Installing: x\"'\n"
        );

        let again = format_paths(&[path], &RuleSet::default(), false);
        assert_eq!(again.changed_files(), 0);
    }

    #[test]
    fn dry_run_leaves_files_alone() {
        let repo = TestRepo::new();
        let path = repo.write("Taskfile.dummy.yml", DIRTY);

        let summary = format_paths(&[path.clone()], &RuleSet::default(), true);
        assert_eq!(summary.changed_files(), 1);
        assert_eq!(fs::read_to_string(&path).expect("read"), DIRTY);
        let text = summary.render_text();
        assert!(text.contains("would fix exe-ext (lines 2)"), "{text}");
        assert!(text.contains("would fix echo-quote (lines 6)"), "{text}");
        assert!(text.ends_with("1 of 1 file(s) would change\n"), "{text}");
    }

    #[test]
    fn load_failure_is_reported_per_file() {
        let repo = TestRepo::new();
        let missing = repo.path().join("Taskfile.none.yml");
        let summary = format_paths(&[missing], &RuleSet::default(), false);
        assert_eq!(summary.failed_files(), 1);
        assert_eq!(summary.exit_code(), exit_codes::FAILED);
    }
}
