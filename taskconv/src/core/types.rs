//! Shared deterministic types for the convention engine.
//!
//! These types define stable contracts between core components. They should not
//! depend on external state or I/O and must remain deterministic across runs.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Structural role of a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Archetype {
    Tool,
    External,
    Builder,
    Aggregation,
    Bootstrap,
    Unknown,
}

impl Archetype {
    pub fn as_str(self) -> &'static str {
        match self {
            Archetype::Tool => "tool",
            Archetype::External => "external",
            Archetype::Builder => "builder",
            Archetype::Aggregation => "aggregation",
            Archetype::Bootstrap => "bootstrap",
            Archetype::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build strategy for `Tool` manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Affinity {
    /// Cross-compiled from any host (no native toolchain required).
    Cross,
    /// Requires a native C toolchain (a `*_CGO` marker is set).
    Native,
}

impl Affinity {
    pub fn as_str(self) -> &'static str {
        match self {
            Affinity::Cross => "cross",
            Affinity::Native => "native",
        }
    }
}

impl fmt::Display for Affinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier output for a single manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchetypeInfo {
    pub archetype: Archetype,
    /// Only set for `Tool`.
    pub affinity: Option<Affinity>,
    /// Variable prefix `P` that matched the `P_BIN`/`P_VERSION` pattern
    /// (`Tool` and `External` only).
    pub prefix: Option<String>,
}

impl ArchetypeInfo {
    pub fn new(archetype: Archetype) -> Self {
        Self {
            archetype,
            affinity: None,
            prefix: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    /// Uppercase label used by the text report (`[ERROR]`).
    pub fn label(self) -> &'static str {
        match self {
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

/// One reported convention breach.
///
/// Fields are private so a violation cannot change after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    file: PathBuf,
    line: Option<usize>,
    rule: &'static str,
    severity: Severity,
    message: String,
}

impl Violation {
    pub fn new(
        file: impl Into<PathBuf>,
        line: Option<usize>,
        rule: &'static str,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            rule,
            severity,
            message: message.into(),
        }
    }

    pub fn file(&self) -> &std::path::Path {
        &self.file
    }

    /// 1-based line number, if the breach is tied to a line.
    pub fn line(&self) -> Option<usize> {
        self.line
    }

    pub fn rule(&self) -> &'static str {
        self.rule
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Copy of this violation with `Warning` raised to `Error`.
    pub fn escalated(&self) -> Self {
        Self {
            severity: Severity::Error,
            ..self.clone()
        }
    }
}
