//! Taskfile convention engine CLI.
//!
//! Lints and formats Taskfile manifests against archetype conventions, and
//! runs archetype-specific test phases through the `task` engine.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use taskconv::core::engine::LintOptions;
use taskconv::core::plan::Phase;
use taskconv::core::rules::RuleSet;
use taskconv::exit_codes;
use taskconv::format::format_paths;
use taskconv::io::config::{CONFIG_FILE, TaskconvConfig, load_config};
use taskconv::io::manifest_store::{load_manifest, require_structured};
use taskconv::io::resolver::Resolver;
use taskconv::io::task_runner::TaskCli;
use taskconv::lint::lint_paths;
use taskconv::logging;
use taskconv::orchestrate::{TestOptions, TestReport, test_manifest};

#[derive(Parser)]
#[command(
    name = "taskconv",
    version,
    about = "Convention engine for Taskfile manifests"
)]
struct Cli {
    /// Repository root (holds `.taskconv.toml` and the `taskfiles/` tree).
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report convention violations. Exits 1 on errors (or warnings with --strict).
    Lint {
        /// Treat warnings as errors.
        #[arg(long)]
        strict: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Manifests or directories to lint (default: the repository root).
        paths: Vec<PathBuf>,
    },
    /// Apply format-rule fixes in place.
    Fmt {
        /// Show what would change without writing.
        #[arg(long)]
        dry_run: bool,
        /// Manifests or directories to format (default: the repository root).
        paths: Vec<PathBuf>,
    },
    /// Run the archetype test phases for a manifest.
    Test {
        /// Namespace (`jq`, `toolchain:golang`) or manifest path.
        target: String,
        /// Only run this phase (deps, build, release, validate).
        #[arg(long)]
        phase: Option<Phase>,
        /// Print the plan without running tasks.
        #[arg(long)]
        dry_run: bool,
        /// Print the test-info document and exit.
        #[arg(long)]
        info: bool,
    },
    /// Print the test-info document for a manifest.
    Info {
        /// Namespace or manifest path.
        target: String,
    },
    /// Print the manifest path and namespace for a name.
    Resolve { name: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = load_config(&cli.root.join(CONFIG_FILE))?;
    match cli.command {
        Command::Lint {
            strict,
            format,
            paths,
        } => cmd_lint(&cli.root, &config, strict, format, paths),
        Command::Fmt { dry_run, paths } => Ok(cmd_fmt(&cli.root, &config, dry_run, paths)),
        Command::Test {
            target,
            phase,
            dry_run,
            info,
        } => cmd_test(
            &cli.root,
            &config,
            &target,
            TestOptions {
                phase,
                dry_run,
                info,
            },
        ),
        Command::Info { target } => cmd_test(
            &cli.root,
            &config,
            &target,
            TestOptions {
                info: true,
                ..TestOptions::default()
            },
        ),
        Command::Resolve { name } => cmd_resolve(&cli.root, &config, &name),
    }
}

fn default_paths(root: &Path, paths: Vec<PathBuf>) -> Vec<PathBuf> {
    if paths.is_empty() {
        vec![root.to_path_buf()]
    } else {
        paths
    }
}

fn cmd_lint(
    root: &Path,
    config: &TaskconvConfig,
    strict: bool,
    format: OutputFormat,
    paths: Vec<PathBuf>,
) -> Result<i32> {
    let strict = strict || config.strict;
    let rules = RuleSet::new(&config.rule_options());
    let report = lint_paths(&default_paths(root, paths), &rules, LintOptions { strict });
    match format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => println!("{}", report.render_json().context("render json report")?),
    }
    Ok(report.exit_code(strict))
}

fn cmd_fmt(root: &Path, config: &TaskconvConfig, dry_run: bool, paths: Vec<PathBuf>) -> i32 {
    let rules = RuleSet::new(&config.rule_options());
    let summary = format_paths(&default_paths(root, paths), &rules, dry_run);
    print!("{}", summary.render_text());
    summary.exit_code()
}

fn cmd_test(
    root: &Path,
    config: &TaskconvConfig,
    target: &str,
    options: TestOptions,
) -> Result<i32> {
    let resolver = Resolver::new(root, config.layout.clone());
    let resolved = resolver.resolve_target(target)?;
    let manifest = load_manifest(&resolved.path)?;
    require_structured(&manifest)?;

    let runner = TaskCli {
        command: config.task.command.clone(),
        workdir: root.to_path_buf(),
        timeout: config.task.timeout(),
        output_limit_bytes: config.task.output_limit_bytes,
    };
    match test_manifest(root, &manifest, &resolved.namespace, &runner, options)? {
        TestReport::Info(info) => {
            println!("{}", info.to_json().context("render test info")?);
            Ok(exit_codes::OK)
        }
        TestReport::Plan(plan) => {
            print!("{}", plan.render());
            Ok(exit_codes::OK)
        }
        TestReport::Ran { plan, outcome } => {
            print!("{}", plan.render());
            print!("{}", outcome.render_text());
            if outcome.success() {
                Ok(exit_codes::OK)
            } else {
                Ok(exit_codes::FAILED)
            }
        }
    }
}

#[derive(Serialize)]
struct ResolveOutput {
    path: String,
    namespace: String,
}

fn cmd_resolve(root: &Path, config: &TaskconvConfig, name: &str) -> Result<i32> {
    let resolver = Resolver::new(root, config.layout.clone());
    let resolved = resolver.resolve_to_path(name)?;
    let path = resolved.path.strip_prefix(root).unwrap_or(&resolved.path);
    let output = ResolveOutput {
        path: path.display().to_string(),
        namespace: resolved.namespace,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("render resolve output")?
    );
    Ok(exit_codes::OK)
}
