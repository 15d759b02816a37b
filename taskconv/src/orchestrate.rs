//! `taskconv test`: run a manifest's archetype phases through the task engine.
//!
//! Phases run strictly in order and each task runs synchronously. The first
//! failing task aborts the remaining phases; its output is kept verbatim.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::core::classifier::classify;
use crate::core::error::TestError;
use crate::core::manifest::Manifest;
use crate::core::plan::{Phase, TestPlan, build_plan};
use crate::info::TestInfo;
use crate::io::task_runner::{TaskRun, TaskRunner};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestOptions {
    pub phase: Option<Phase>,
    pub dry_run: bool,
    pub info: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Passed,
    /// Optional task not defined for the namespace.
    Skipped,
    Failed,
    /// Required task not defined for the namespace.
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub phase: Phase,
    pub task: String,
    pub status: TaskStatus,
}

/// Why the run stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// The task ran and failed; its output is kept verbatim.
    Run(TaskRun),
    Missing(TestError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestFailure {
    pub phase: Phase,
    pub task: String,
    pub cause: FailureCause,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    pub records: Vec<TaskRecord>,
    pub failure: Option<TestFailure>,
}

impl TestOutcome {
    pub fn success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            let status = match record.status {
                TaskStatus::Passed => "ok",
                TaskStatus::Skipped => "skipped (not defined)",
                TaskStatus::Failed => "FAILED",
                TaskStatus::NotFound => "NOT FOUND",
            };
            out.push_str(&format!("[{}] {}: {status}\n", record.phase, record.task));
        }
        let Some(failure) = &self.failure else {
            return out;
        };
        match &failure.cause {
            FailureCause::Missing(err) => out.push_str(&format!("{err}\n")),
            FailureCause::Run(run) => {
                let reason = if run.timed_out {
                    "timed out".to_string()
                } else {
                    match run.exit_code {
                        Some(code) => format!("exit code {code}"),
                        None => "terminated by signal".to_string(),
                    }
                };
                out.push_str(&format!("task {} failed ({reason})\n", failure.task));
                if !run.stdout.is_empty() {
                    out.push_str(&format!("--- stdout ---\n{}\n", run.stdout));
                }
                if !run.stderr.is_empty() {
                    out.push_str(&format!("--- stderr ---\n{}\n", run.stderr));
                }
            }
        }
        out
    }
}

/// What a `test` invocation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestReport {
    Info(TestInfo),
    Plan(TestPlan),
    Ran { plan: TestPlan, outcome: TestOutcome },
}

/// Plan and, unless in info or dry-run mode, execute the tests for `manifest`.
///
/// Info and dry-run modes never touch `runner`.
#[instrument(skip_all, fields(namespace = %namespace, phase = ?options.phase))]
pub fn test_manifest<R: TaskRunner + ?Sized>(
    root: &Path,
    manifest: &Manifest,
    namespace: &str,
    runner: &R,
    options: TestOptions,
) -> Result<TestReport> {
    if options.info {
        return Ok(TestReport::Info(TestInfo::new(root, manifest, namespace)));
    }
    let plan = build_plan(&classify(manifest), namespace, options.phase);
    if options.dry_run {
        return Ok(TestReport::Plan(plan));
    }
    let outcome = run_plan(&plan, runner)?;
    Ok(TestReport::Ran { plan, outcome })
}

/// Execute `plan` sequentially.
///
/// Tasks are checked against the runner's listing first: a missing optional
/// task is skipped, a missing required task stops the run with
/// [`TestError::TaskNotFound`] as its cause. Records of earlier tasks are kept
/// either way.
pub fn run_plan<R: TaskRunner + ?Sized>(plan: &TestPlan, runner: &R) -> Result<TestOutcome> {
    let mut outcome = TestOutcome {
        records: Vec::new(),
        failure: None,
    };
    if plan.task_count() == 0 {
        info!(archetype = %plan.archetype, "no tasks to run");
        return Ok(outcome);
    }

    let listed: BTreeSet<String> = runner.list_tasks().context("list available tasks")?;
    debug!(count = listed.len(), "task listing loaded");

    for phase in &plan.phases {
        for planned in &phase.tasks {
            if !listed.contains(&planned.task) {
                if planned.required {
                    warn!(task = %planned.task, "required task not defined");
                    outcome.records.push(TaskRecord {
                        phase: phase.phase,
                        task: planned.task.clone(),
                        status: TaskStatus::NotFound,
                    });
                    outcome.failure = Some(TestFailure {
                        phase: phase.phase,
                        task: planned.task.clone(),
                        cause: FailureCause::Missing(TestError::TaskNotFound {
                            task: planned.task.clone(),
                            phase: phase.phase,
                        }),
                    });
                    return Ok(outcome);
                }
                info!(task = %planned.task, "optional task not defined, skipping");
                outcome.records.push(TaskRecord {
                    phase: phase.phase,
                    task: planned.task.clone(),
                    status: TaskStatus::Skipped,
                });
                continue;
            }

            let run = runner
                .run_task(&planned.task)
                .with_context(|| format!("run task {}", planned.task))?;
            if run.success {
                outcome.records.push(TaskRecord {
                    phase: phase.phase,
                    task: planned.task.clone(),
                    status: TaskStatus::Passed,
                });
                continue;
            }

            warn!(task = %planned.task, exit_code = ?run.exit_code, "task failed");
            outcome.records.push(TaskRecord {
                phase: phase.phase,
                task: planned.task.clone(),
                status: TaskStatus::Failed,
            });
            outcome.failure = Some(TestFailure {
                phase: phase.phase,
                task: planned.task.clone(),
                cause: FailureCause::Run(run),
            });
            return Ok(outcome);
        }
    }
    Ok(outcome)
}
