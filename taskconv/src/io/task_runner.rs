//! Task-execution collaborator.
//!
//! The [`TaskRunner`] trait decouples the test orchestrator from the actual
//! task engine binary. Tests use scripted runners that return predetermined
//! results without spawning processes.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::io::process::run_command_with_timeout;

pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 1_000_000;

/// Result of one task invocation. Output is kept verbatim for failure reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRun {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl TaskRun {
    pub fn passed() -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
            timed_out: false,
        }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.into(),
            timed_out: false,
        }
    }
}

/// Abstraction over the external task engine.
pub trait TaskRunner {
    /// Every task name the engine can run from the repository root.
    fn list_tasks(&self) -> Result<BTreeSet<String>>;

    /// Run one fully qualified task and wait for it.
    fn run_task(&self, task: &str) -> Result<TaskRun>;
}

/// Runner that spawns the task engine CLI (default `task`).
#[derive(Debug, Clone)]
pub struct TaskCli {
    /// Program followed by leading arguments.
    pub command: Vec<String>,
    pub workdir: PathBuf,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

#[derive(Debug, Deserialize)]
struct TaskListing {
    #[serde(default)]
    tasks: Vec<ListedTask>,
}

#[derive(Debug, Deserialize)]
struct ListedTask {
    name: String,
    #[serde(default)]
    aliases: Vec<String>,
}

impl TaskCli {
    fn base_command(&self) -> Result<Command> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| anyhow!("task command is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(&self.workdir);
        Ok(cmd)
    }
}

impl TaskRunner for TaskCli {
    #[instrument(skip_all, fields(workdir = %self.workdir.display()))]
    fn list_tasks(&self) -> Result<BTreeSet<String>> {
        let mut cmd = self.base_command()?;
        cmd.arg("--list-all").arg("--json");
        let output = run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes)
            .context("list tasks")?;
        if !output.status.success() {
            return Err(anyhow!(
                "task listing failed (exit {:?}):\n{}",
                output.status.code(),
                output.stderr_text()
            ));
        }
        let names = parse_task_listing(&output.stdout.bytes)?;
        debug!(count = names.len(), "listed tasks");
        Ok(names)
    }

    #[instrument(skip(self))]
    fn run_task(&self, task: &str) -> Result<TaskRun> {
        info!(task, "running task");
        let mut cmd = self.base_command()?;
        cmd.arg(task);
        let output = run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes)
            .with_context(|| format!("run task {task}"))?;
        Ok(TaskRun {
            success: output.status.success() && !output.timed_out,
            exit_code: output.status.code(),
            stdout: output.stdout_text(),
            stderr: output.stderr_text(),
            timed_out: output.timed_out,
        })
    }
}

/// Task names (and aliases) from `--list-all --json` output.
pub fn parse_task_listing(stdout: &[u8]) -> Result<BTreeSet<String>> {
    let listing: TaskListing =
        serde_json::from_slice(stdout).context("parse task listing json")?;
    Ok(listing
        .tasks
        .into_iter()
        .flat_map(|task| std::iter::once(task.name).chain(task.aliases))
        .collect())
}
