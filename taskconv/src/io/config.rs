//! Repository configuration stored in `.taskconv.toml` at the repo root.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::core::namespace::Layout;
use crate::core::rules::{DEFAULT_SELF_PATH_VAR, RULE_NAMES, RuleOptions};
use crate::io::task_runner::{DEFAULT_OUTPUT_LIMIT_BYTES, DEFAULT_TASK_TIMEOUT};

pub const CONFIG_FILE: &str = ".taskconv.toml";

static VAR_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid variable regex"));

/// taskconv configuration (TOML).
///
/// Every field is optional; a missing file means all defaults.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TaskconvConfig {
    /// Treat warnings as errors in `lint`. `--strict` can only turn this on.
    pub strict: bool,
    pub layout: Layout,
    pub rules: RulesConfig,
    pub task: TaskConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RulesConfig {
    /// Variable substituted for bare self-references (`{{.TASKFILE}}`).
    pub self_path_var: String,
    /// Rule names to skip entirely.
    pub disabled: Vec<String>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            self_path_var: DEFAULT_SELF_PATH_VAR.to_string(),
            disabled: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TaskConfig {
    /// Task engine command (e.g. `["task"]` or `["go-task", "--silent"]`).
    pub command: Vec<String>,
    /// Per-task wall-clock limit in seconds.
    pub timeout_secs: u64,
    /// Truncate captured task stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            command: vec!["task".to_string()],
            timeout_secs: DEFAULT_TASK_TIMEOUT.as_secs(),
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
        }
    }
}

impl TaskConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl TaskconvConfig {
    pub fn validate(&self) -> Result<()> {
        for (field, dir) in [
            ("layout.taskfiles_dir", &self.layout.taskfiles_dir),
            ("layout.tools_dir", &self.layout.tools_dir),
            ("layout.toolchain_dir", &self.layout.toolchain_dir),
        ] {
            if dir.as_os_str().is_empty() || dir.is_absolute() {
                return Err(anyhow!("{field} must be a non-empty relative path"));
            }
        }
        if !VAR_NAME_RE.is_match(&self.rules.self_path_var) {
            return Err(anyhow!(
                "rules.self_path_var '{}' is not a valid variable name",
                self.rules.self_path_var
            ));
        }
        if let Some(unknown) = self
            .rules
            .disabled
            .iter()
            .find(|name| !RULE_NAMES.contains(&name.as_str()))
        {
            return Err(anyhow!(
                "rules.disabled names unknown rule '{unknown}' (known: {})",
                RULE_NAMES.join(", ")
            ));
        }
        if self.task.command.is_empty() || self.task.command[0].trim().is_empty() {
            return Err(anyhow!("task.command must be a non-empty array"));
        }
        if self.task.timeout_secs == 0 {
            return Err(anyhow!("task.timeout_secs must be > 0"));
        }
        if self.task.output_limit_bytes == 0 {
            return Err(anyhow!("task.output_limit_bytes must be > 0"));
        }
        Ok(())
    }

    pub fn rule_options(&self) -> RuleOptions {
        RuleOptions {
            self_path_var: self.rules.self_path_var.clone(),
            disabled: self.rules.disabled.clone(),
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `TaskconvConfig::default()`.
pub fn load_config(path: &Path) -> Result<TaskconvConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        let cfg = TaskconvConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: TaskconvConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
