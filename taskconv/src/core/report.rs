//! Aggregation and rendering of violations across many manifests.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::types::{Severity, Violation};
use crate::exit_codes;

/// Violations of one manifest, in the order the engine produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub file: PathBuf,
    pub violations: Vec<ViolationRecord>,
}

/// Serialized shape of a [`Violation`]; field names are part of the JSON contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViolationRecord {
    pub rule: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

impl From<&Violation> for ViolationRecord {
    fn from(violation: &Violation) -> Self {
        Self {
            rule: violation.rule().to_string(),
            severity: violation.severity(),
            line: violation.line(),
            message: violation.message().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub results: Vec<FileReport>,
    pub total_files: usize,
    pub errors: usize,
    pub warnings: usize,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one visited manifest. Files are kept in call order.
    pub fn add_file(&mut self, file: impl AsRef<Path>, violations: &[Violation]) {
        self.total_files += 1;
        for violation in violations {
            match violation.severity() {
                Severity::Error => self.errors += 1,
                Severity::Warning => self.warnings += 1,
            }
        }
        self.results.push(FileReport {
            file: file.as_ref().to_path_buf(),
            violations: violations.iter().map(ViolationRecord::from).collect(),
        });
    }

    pub fn files_with_violations(&self) -> usize {
        self.results
            .iter()
            .filter(|result| !result.violations.is_empty())
            .count()
    }

    /// `path:line: [SEVERITY] rule: message` lines followed by a summary.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for result in &self.results {
            let path = result.file.display();
            for record in &result.violations {
                let location = match record.line {
                    Some(line) => format!("{path}:{line}"),
                    None => path.to_string(),
                };
                out.push_str(&format!(
                    "{location}: [{}] {}: {}\n",
                    record.severity.label(),
                    record.rule,
                    record.message
                ));
            }
        }
        out.push_str(&format!(
            "{} error(s), {} warning(s) in {} of {} file(s)\n",
            self.errors,
            self.warnings,
            self.files_with_violations(),
            self.total_files
        ));
        out
    }

    pub fn render_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Non-zero exactly when errors exist, or warnings exist under `strict`.
    pub fn exit_code(&self, strict: bool) -> i32 {
        if self.errors > 0 || (strict && self.warnings > 0) {
            exit_codes::FAILED
        } else {
            exit_codes::OK
        }
    }
}
