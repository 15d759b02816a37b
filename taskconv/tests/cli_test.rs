//! CLI tests for `taskconv test`, `taskconv info`, and `taskconv resolve`.

use std::process::{Command, Output};

use taskconv::exit_codes;
use taskconv::test_support::{TestRepo, manifest_source};

fn taskconv(repo: &TestRepo, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_taskconv"))
        .current_dir(repo.path())
        .args(args)
        .output()
        .expect("run taskconv")
}

fn tool_repo() -> TestRepo {
    let repo = TestRepo::new();
    repo.write(
        "taskfiles/tools/Taskfile.jq.yml",
        &manifest_source(
            &[("JQ_BIN", "jq"), ("JQ_VERSION", "1.7"), ("JQ_REPO", "jqlang/jq")],
            &["check:deps", "release:build", "release:test"],
        ),
    );
    repo.write(
        "taskfiles/toolchain/Taskfile.golang.yml",
        &manifest_source(&[("GO_BUILD_FLAGS", "-trimpath")], &["build"]),
    );
    repo
}

#[test]
fn info_prints_test_info_document() {
    let repo = tool_repo();
    let output = taskconv(&repo, &["info", "jq"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["path"], "taskfiles/tools/Taskfile.jq.yml");
    assert_eq!(json["namespace"], "jq");
    assert_eq!(json["archetype"], "tool");
    assert_eq!(json["affinity"], "cross");

    let builder = taskconv(&repo, &["test", "toolchain:golang", "--info"]);
    assert_eq!(builder.status.code(), Some(exit_codes::OK));
    let json: serde_json::Value = serde_json::from_slice(&builder.stdout).expect("json");
    assert_eq!(json["namespace"], "toolchain:golang");
    assert_eq!(json["archetype"], "builder");
    assert_eq!(json["affinity"], "");
}

#[test]
fn dry_run_prints_plan_without_task_engine() {
    let repo = tool_repo();
    repo.write(".taskconv.toml", "[task]\ncommand = [\"taskconv-missing-engine\"]\n");

    let output = taskconv(&repo, &["test", "jq", "--dry-run", "--phase", "release"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert_eq!(
        stdout,
        "test plan for 'jq' (tool)\n  release:\n    task jq:release:build\n    task jq:release:test\n  deps: skipped\n  build: skipped\n  validate: skipped\n"
    );
}

#[test]
fn resolve_reports_path_and_namespace() {
    let repo = tool_repo();
    let output = taskconv(&repo, &["resolve", "toolchain:golang"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["path"], "taskfiles/toolchain/Taskfile.golang.yml");
    assert_eq!(json["namespace"], "toolchain:golang");

    let missing = taskconv(&repo, &["resolve", "nope"]);
    assert_eq!(missing.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8(missing.stderr).expect("utf8");
    assert!(stderr.contains("no manifest found for 'nope'"), "{stderr}");
}

#[cfg(unix)]
const FAKE_ENGINE: &str = r#"
if [ "$1" = "--list-all" ]; then
  echo '{"tasks":[{"name":"jq:check:deps"},{"name":"jq:release:build"},{"name":"jq:release:test"}]}'
  exit 0
fi
echo "ran $1"
if [ "$1" = "jq:release:test" ]; then
  echo "release test broke" >&2
  exit 3
fi
"#;

#[cfg(unix)]
#[test]
fn failing_task_surfaces_output_and_fails() {
    let repo = tool_repo();
    repo.write("engine.sh", FAKE_ENGINE);
    repo.write(".taskconv.toml", "[task]\ncommand = [\"sh\", \"engine.sh\"]\n");

    let output = taskconv(&repo, &["test", "jq"]);
    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert!(stdout.contains("[deps] jq:check:deps: ok"), "{stdout}");
    assert!(stdout.contains("[build] jq:build: skipped (not defined)"), "{stdout}");
    assert!(stdout.contains("[release] jq:release:test: FAILED"), "{stdout}");
    assert!(stdout.contains("task jq:release:test failed (exit code 3)"), "{stdout}");
    assert!(stdout.contains("release test broke"), "{stdout}");
    assert!(!stdout.contains("[validate] jq:run"), "{stdout}");
}

#[cfg(unix)]
#[test]
fn missing_required_task_fails_after_reporting_earlier_tasks() {
    let repo = tool_repo();
    repo.write(
        "engine.sh",
        "if [ \"$1\" = \"--list-all\" ]; then echo '{\"tasks\":[{\"name\":\"jq:check:deps\"}]}'; fi\n",
    );
    repo.write(".taskconv.toml", "[task]\ncommand = [\"sh\", \"engine.sh\"]\n");

    let output = taskconv(&repo, &["test", "jq"]);
    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert!(stdout.contains("[deps] jq:check:deps: ok"), "{stdout}");
    assert!(stdout.contains("[release] jq:release:build: NOT FOUND"), "{stdout}");
    assert!(
        stdout.contains("required task 'jq:release:build' is not defined (phase release)"),
        "{stdout}"
    );
}

#[test]
fn absolute_manifest_path_keeps_its_namespace() {
    let repo = tool_repo();
    let absolute = repo.path().join("taskfiles/tools/Taskfile.jq.yml");

    let output = taskconv(&repo, &["test", absolute.to_str().expect("utf8 path"), "--info"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["namespace"], "jq");
    assert_eq!(json["path"], "taskfiles/tools/Taskfile.jq.yml");
}
