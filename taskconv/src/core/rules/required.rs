//! Archetype requirements: variables and tasks every manifest of a role needs.

use crate::core::classifier::{BOOTSTRAP_IDENTITY, classify};
use crate::core::manifest::{Manifest, VarValue};
use crate::core::rules::Rule;
use crate::core::types::{Archetype, ArchetypeInfo, Severity, Violation};

pub const REQUIRED_VARS: &str = "required-vars";
pub const REQUIRED_TASKS: &str = "required-tasks";
pub const STATUS_BLOCK: &str = "status-block";

/// Variables the archetype needs, each with a non-empty value.
pub fn required_vars(info: &ArchetypeInfo) -> Vec<String> {
    let family = |suffixes: &[&str]| -> Vec<String> {
        match &info.prefix {
            Some(prefix) => suffixes
                .iter()
                .map(|suffix| format!("{prefix}_{suffix}"))
                .collect(),
            None => Vec::new(),
        }
    };
    match info.archetype {
        Archetype::Tool => family(&["BIN", "VERSION", "REPO"]),
        Archetype::External => family(&["BIN", "VERSION"]),
        Archetype::Bootstrap => BOOTSTRAP_IDENTITY.iter().map(|s| s.to_string()).collect(),
        Archetype::Builder | Archetype::Aggregation | Archetype::Unknown => Vec::new(),
    }
}

/// Tasks the archetype needs.
pub fn required_tasks(archetype: Archetype) -> &'static [&'static str] {
    match archetype {
        Archetype::Tool => &["check:deps", "release:build", "release:test"],
        Archetype::External => &["check:deps"],
        Archetype::Builder => &["build"],
        Archetype::Bootstrap => &["install"],
        Archetype::Aggregation | Archetype::Unknown => &[],
    }
}

/// Task that must carry a `status:` block so it is skipped once satisfied.
pub fn status_task(archetype: Archetype) -> Option<&'static str> {
    match archetype {
        Archetype::Tool | Archetype::External => Some("check:deps"),
        Archetype::Bootstrap => Some("install"),
        Archetype::Builder | Archetype::Aggregation | Archetype::Unknown => None,
    }
}

fn is_blank(value: &VarValue) -> bool {
    match value {
        VarValue::Str(s) => s.trim().is_empty(),
        VarValue::Template(_) | VarValue::Bool(_) | VarValue::Int(_) | VarValue::Dynamic => false,
    }
}

pub struct RequiredVars;

impl Rule for RequiredVars {
    fn name(&self) -> &'static str {
        REQUIRED_VARS
    }

    fn check(&self, manifest: &Manifest) -> Vec<Violation> {
        let info = classify(manifest);
        required_vars(&info)
            .into_iter()
            .filter_map(|name| match manifest.var(&name) {
                None => Some(Violation::new(
                    manifest.path(),
                    manifest.section_line("vars"),
                    REQUIRED_VARS,
                    Severity::Error,
                    format!("{} manifest is missing variable {name}", info.archetype),
                )),
                Some(value) if is_blank(value) => Some(Violation::new(
                    manifest.path(),
                    manifest.var_line(&name),
                    REQUIRED_VARS,
                    Severity::Error,
                    format!("variable {name} must not be empty"),
                )),
                Some(_) => None,
            })
            .collect()
    }
}

pub struct RequiredTasks;

impl Rule for RequiredTasks {
    fn name(&self) -> &'static str {
        REQUIRED_TASKS
    }

    fn check(&self, manifest: &Manifest) -> Vec<Violation> {
        let archetype = classify(manifest).archetype;
        required_tasks(archetype)
            .iter()
            .filter(|task| !manifest.has_task(task))
            .map(|task| {
                Violation::new(
                    manifest.path(),
                    manifest.section_line("tasks"),
                    REQUIRED_TASKS,
                    Severity::Error,
                    format!("{archetype} manifest is missing task {task}"),
                )
            })
            .collect()
    }
}

pub struct StatusBlock;

impl Rule for StatusBlock {
    fn name(&self) -> &'static str {
        STATUS_BLOCK
    }

    fn check(&self, manifest: &Manifest) -> Vec<Violation> {
        let Some(task) = status_task(classify(manifest).archetype) else {
            return Vec::new();
        };
        if !manifest.has_task(task) || manifest.task_has_status(task) {
            return Vec::new();
        }
        vec![Violation::new(
            manifest.path(),
            manifest.task_line(task),
            STATUS_BLOCK,
            Severity::Warning,
            format!("task {task} should declare a status: block"),
        )]
    }
}
