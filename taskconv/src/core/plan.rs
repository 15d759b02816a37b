//! Archetype-specific test phases.
//!
//! Each archetype maps to an ordered subset of `deps -> build -> release ->
//! validate`. A plan is pure data; `orchestrate` executes it.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::core::namespace::qualify;
use crate::core::types::{Archetype, ArchetypeInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Deps,
    Build,
    Release,
    Validate,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Deps, Phase::Build, Phase::Release, Phase::Validate];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Deps => "deps",
            Phase::Build => "build",
            Phase::Release => "release",
            Phase::Validate => "validate",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|phase| phase.as_str() == s)
            .ok_or_else(|| format!("unknown phase '{s}' (expected deps, build, release, or validate)"))
    }
}

/// A task the plan invokes, before namespace qualification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpec {
    pub task: &'static str,
    pub required: bool,
}

const fn required(task: &'static str) -> TaskSpec {
    TaskSpec {
        task,
        required: true,
    }
}

const fn optional(task: &'static str) -> TaskSpec {
    TaskSpec {
        task,
        required: false,
    }
}

/// Tasks for `phase` of `archetype`; empty when the archetype lacks the phase.
pub fn phase_tasks(archetype: Archetype, phase: Phase) -> &'static [TaskSpec] {
    const TOOL_DEPS: [TaskSpec; 1] = [required("check:deps")];
    const TOOL_BUILD: [TaskSpec; 1] = [optional("build")];
    const TOOL_RELEASE: [TaskSpec; 2] = [required("release:build"), required("release:test")];
    const RUN: [TaskSpec; 1] = [optional("run")];
    const BUILDER_DEPS: [TaskSpec; 1] = [optional("check:deps")];
    const BUILDER_BUILD: [TaskSpec; 1] = [required("build")];
    const BUILDER_VALIDATE: [TaskSpec; 1] = [optional("test")];
    const AGG_BUILD: [TaskSpec; 1] = [optional("build")];
    const AGG_VALIDATE: [TaskSpec; 1] = [optional("check")];
    const BOOT_DEPS: [TaskSpec; 1] = [required("install")];
    const BOOT_VALIDATE: [TaskSpec; 1] = [optional("version")];

    match (archetype, phase) {
        (Archetype::Tool | Archetype::External, Phase::Deps) => &TOOL_DEPS,
        (Archetype::Tool, Phase::Build) => &TOOL_BUILD,
        (Archetype::Tool, Phase::Release) => &TOOL_RELEASE,
        (Archetype::Tool | Archetype::External, Phase::Validate) => &RUN,
        (Archetype::Builder, Phase::Deps) => &BUILDER_DEPS,
        (Archetype::Builder, Phase::Build) => &BUILDER_BUILD,
        (Archetype::Builder, Phase::Validate) => &BUILDER_VALIDATE,
        (Archetype::Aggregation, Phase::Build) => &AGG_BUILD,
        (Archetype::Aggregation, Phase::Validate) => &AGG_VALIDATE,
        (Archetype::Bootstrap, Phase::Deps) => &BOOT_DEPS,
        (Archetype::Bootstrap, Phase::Validate) => &BOOT_VALIDATE,
        _ => &[],
    }
}

/// Phases the archetype defines, in execution order.
pub fn phases_for(archetype: Archetype) -> Vec<Phase> {
    Phase::ALL
        .into_iter()
        .filter(|phase| !phase_tasks(archetype, *phase).is_empty())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedTask {
    /// Namespace-qualified task name.
    pub task: String,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhasePlan {
    pub phase: Phase,
    pub tasks: Vec<PlannedTask>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestPlan {
    pub namespace: String,
    pub archetype: Archetype,
    /// Phases to execute, in order.
    pub phases: Vec<PhasePlan>,
    /// Archetype phases left out by the phase filter.
    pub skipped: Vec<Phase>,
}

impl TestPlan {
    pub fn task_count(&self) -> usize {
        self.phases.iter().map(|phase| phase.tasks.len()).sum()
    }

    /// Human-readable plan for `--dry-run`.
    pub fn render(&self) -> String {
        let mut out = format!(
            "test plan for '{}' ({})\n",
            display_namespace(&self.namespace),
            self.archetype
        );
        if self.phases.is_empty() {
            out.push_str("  no phases to run\n");
        }
        for phase in &self.phases {
            out.push_str(&format!("  {}:\n", phase.phase));
            for task in &phase.tasks {
                let marker = if task.required { "" } else { " (optional)" };
                out.push_str(&format!("    task {}{marker}\n", task.task));
            }
        }
        for phase in &self.skipped {
            out.push_str(&format!("  {phase}: skipped\n"));
        }
        out
    }
}

fn display_namespace(namespace: &str) -> &str {
    if namespace.is_empty() { "<root>" } else { namespace }
}

/// Build the plan for a classified manifest, optionally restricted to `filter`.
///
/// A filter naming a phase the archetype lacks yields an empty plan.
pub fn build_plan(info: &ArchetypeInfo, namespace: &str, filter: Option<Phase>) -> TestPlan {
    let mut phases = Vec::new();
    let mut skipped = Vec::new();
    for phase in phases_for(info.archetype) {
        if filter.is_some_and(|selected| selected != phase) {
            skipped.push(phase);
            continue;
        }
        let tasks = phase_tasks(info.archetype, phase)
            .iter()
            .map(|spec| PlannedTask {
                task: qualify(namespace, spec.task),
                required: spec.required,
            })
            .collect();
        phases.push(PhasePlan { phase, tasks });
    }
    TestPlan {
        namespace: namespace.to_string(),
        archetype: info.archetype,
        phases,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(archetype: Archetype) -> ArchetypeInfo {
        ArchetypeInfo::new(archetype)
    }

    #[test]
    fn phase_parsing() {
        assert_eq!("release".parse::<Phase>(), Ok(Phase::Release));
        assert!("ship".parse::<Phase>().is_err());
    }

    #[test]
    fn phase_sets_per_archetype() {
        use Phase::{Build, Deps, Release, Validate};
        assert_eq!(phases_for(Archetype::Tool), vec![Deps, Build, Release, Validate]);
        assert_eq!(phases_for(Archetype::External), vec![Deps, Validate]);
        assert_eq!(phases_for(Archetype::Builder), vec![Deps, Build, Validate]);
        assert_eq!(phases_for(Archetype::Aggregation), vec![Build, Validate]);
        assert_eq!(phases_for(Archetype::Bootstrap), vec![Deps, Validate]);
        assert!(phases_for(Archetype::Unknown).is_empty());
    }

    #[test]
    fn tool_release_phase_qualifies_tasks() {
        let plan = build_plan(&info(Archetype::Tool), "jq", Some(Phase::Release));
        assert_eq!(
            plan.phases,
            vec![PhasePlan {
                phase: Phase::Release,
                tasks: vec![
                    PlannedTask {
                        task: "jq:release:build".to_string(),
                        required: true,
                    },
                    PlannedTask {
                        task: "jq:release:test".to_string(),
                        required: true,
                    },
                ],
            }]
        );
        assert_eq!(plan.skipped, vec![Phase::Deps, Phase::Build, Phase::Validate]);
    }

    #[test]
    fn filter_outside_archetype_runs_nothing() {
        let plan = build_plan(&info(Archetype::External), "gh", Some(Phase::Build));
        assert_eq!(plan.task_count(), 0);
        assert_eq!(plan.skipped, vec![Phase::Deps, Phase::Validate]);
    }

    #[test]
    fn root_namespace_keeps_bare_task_names() {
        let plan = build_plan(&info(Archetype::Aggregation), "", None);
        let tasks: Vec<&str> = plan
            .phases
            .iter()
            .flat_map(|phase| phase.tasks.iter().map(|task| task.task.as_str()))
            .collect();
        assert_eq!(tasks, vec!["build", "check"]);
        assert!(plan.render().starts_with("test plan for '<root>' (aggregation)\n"));
    }
}
