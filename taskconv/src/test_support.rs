//! Test-only helpers: manifest builders, a temporary repository, and a
//! scripted task runner.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::manifest::Manifest;
use crate::io::task_runner::{TaskRun, TaskRunner};

/// Build a manifest with single-quoted `vars` and tasks that only echo their
/// name. Tasks carry no `status:` block.
pub fn manifest_with(vars: &[(&str, &str)], tasks: &[&str]) -> Manifest {
    Manifest::from_source("Taskfile.test.yml", manifest_source(vars, tasks))
}

/// Source text used by [`manifest_with`].
pub fn manifest_source(vars: &[(&str, &str)], tasks: &[&str]) -> String {
    let mut src = String::from("version: '3'\n");
    if !vars.is_empty() {
        src.push_str("vars:\n");
        for (name, value) in vars {
            src.push_str(&format!("  {name}: '{}'\n", value.replace('\'', "''")));
        }
    }
    if !tasks.is_empty() {
        src.push_str("tasks:\n");
        for task in tasks {
            src.push_str(&format!("  {task}:\n    cmds:\n      - echo {task}\n"));
        }
    }
    src
}

/// A throwaway repository root.
pub struct TestRepo {
    dir: tempfile::TempDir,
}

impl TestRepo {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `rel` under the root, creating parent directories.
    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.dir.path().join(rel)).expect("read file")
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}

/// Task runner with a fixed task listing and scripted results.
///
/// Listed tasks pass unless a failure was scripted for them. Every call is
/// recorded so tests can assert on what ran.
#[derive(Default)]
pub struct ScriptedTaskRunner {
    tasks: BTreeSet<String>,
    results: BTreeMap<String, TaskRun>,
    calls: RefCell<Vec<String>>,
    list_calls: Cell<usize>,
}

impl ScriptedTaskRunner {
    pub fn new<I, S>(tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tasks: tasks.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Script the result of running `task`.
    pub fn with_result(mut self, task: &str, run: TaskRun) -> Self {
        self.results.insert(task.to_string(), run);
        self
    }

    /// Tasks passed to `run_task`, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.get()
    }
}

impl TaskRunner for ScriptedTaskRunner {
    fn list_tasks(&self) -> Result<BTreeSet<String>> {
        self.list_calls.set(self.list_calls.get() + 1);
        Ok(self.tasks.clone())
    }

    fn run_task(&self, task: &str) -> Result<TaskRun> {
        self.calls.borrow_mut().push(task.to_string());
        Ok(self
            .results
            .get(task)
            .cloned()
            .unwrap_or_else(TaskRun::passed))
    }
}
