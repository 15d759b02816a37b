//! Error taxonomy for manifest loading, fixing, resolution, and test runs.

use std::path::PathBuf;

use crate::core::plan::Phase;

/// Failure to turn a path into a [`Manifest`](crate::core::manifest::Manifest).
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read manifest '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Content could not be minimally structured. Raw-text rules still apply;
    /// operations that need the variable/task map fail with this.
    #[error("failed to parse manifest '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

/// A format rule produced content it would still flag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FixError {
    #[error("rule {rule} left {remaining} violation(s) in {} after fixing", path.display())]
    Unconverged {
        rule: &'static str,
        path: PathBuf,
        remaining: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("no manifest found for '{name}' (searched: {})", format_searched(.searched))]
    NotFound {
        name: String,
        searched: Vec<PathBuf>,
    },
}

fn format_searched(searched: &[PathBuf]) -> String {
    searched
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failures raised while executing a test plan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TestError {
    /// A required task is not defined for the namespace.
    #[error("required task '{task}' is not defined (phase {phase})")]
    TaskNotFound { task: String, phase: Phase },
}
