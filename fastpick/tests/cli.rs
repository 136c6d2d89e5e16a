//! Binary-level tests for the `fastpick` executable.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::NamedTempFile;

fn fastpick(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fastpick"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .output()
        .unwrap()
}

fn module_file(json: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

const SORT_MODULE: &str = r#"{
  "implementations": {
    "Original": "function sortNums(xs) { return [...xs].sort((a, b) => a - b); }",
    "Alt1": "function sortNums(xs) { const out = xs.slice(); out.sort((a, b) => a - b); return out; }",
    "Broken": "function sortNums(xs) { return xs.nope(); }"
  },
  "testData": [5, 3, 9, 1, 7],
  "entryPointName": "sortNums"
}"#;

#[test]
fn test_run_prints_protocol() {
    let file = module_file(SORT_MODULE);
    let out = fastpick(&["run", path_str(file.path()), "-n", "10"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8_lossy(&out.stdout);
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stdout.lines().any(|l| l.starts_with("cycle: Name: Original, Ops: ")));
    assert!(stdout.lines().any(|l| l.starts_with("RESULTS_JSON: ")));
    assert!(stdout.lines().last().unwrap().starts_with("complete: Fastest is "));
    assert!(stderr.contains("BENCHMARK_EXECUTION_ERROR [Broken]:"));

    let comparison = fastpick::parse_output(&format!("{stdout}{stderr}")).unwrap();
    assert_eq!(comparison.results.len(), 2);
    assert!(["Original", "Alt1"].contains(&comparison.fastest.as_str()));
}

#[test]
fn test_missing_module_is_fatal() {
    let out = fastpick(&["run", "/definitely/not/here.json"]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("BENCHMARK_ERROR: module file not found"));
    assert!(out.stdout.is_empty());
}

#[test]
fn test_empty_implementations_is_fatal() {
    let file = module_file(r#"{"implementations": {}, "testData": []}"#);
    let out = fastpick(&[path_str(file.path())]);
    assert_eq!(out.status.code(), Some(1));
    assert!(
        String::from_utf8_lossy(&out.stderr)
            .contains("BENCHMARK_ERROR: no implementations found")
    );
}

#[test]
fn test_required_entry_point() {
    let file = module_file(r#"{"implementations": {"A": "function f() {}"}, "testData": 1}"#);
    let out = fastpick(&["check", path_str(file.path()), "--require-entry-point"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("BENCHMARK_ERROR: missing entryPointName"));
}

#[test]
fn test_check_lists_candidates() {
    let file = module_file(SORT_MODULE);
    let out = fastpick(&["check", path_str(file.path()), "--filter", "^(Original|Alt1)$"]);
    assert!(out.status.success());

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Original [function declaration]"));
    assert!(stdout.contains("Alt1 [function declaration]"));
    assert!(!stdout.contains("Broken"));
    assert!(stdout.contains("2 candidates found."));
}

#[test]
fn test_parse_command() {
    let mut captured = NamedTempFile::new().unwrap();
    writeln!(captured, "cycle: Name: Original, Ops: 500000").unwrap();
    writeln!(captured, "complete: Fastest is Original").unwrap();

    let out = fastpick(&["parse", path_str(captured.path()), "--format", "json"]);
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(value["fastest"], "Original");
    assert_eq!(value["results"][0]["ops"], 500000.0);
}

#[test]
fn test_json_report_to_file() {
    let file = module_file(SORT_MODULE);
    let report_file = NamedTempFile::new().unwrap();
    let out = fastpick(&[
        path_str(file.path()),
        "-n",
        "5",
        "--format",
        "json",
        "-o",
        path_str(report_file.path()),
    ]);
    assert!(out.status.success());
    assert!(out.stdout.is_empty());

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(report_file.path()).unwrap()).unwrap();
    assert_eq!(report["summary"]["total_candidates"], 3);
    assert_eq!(report["summary"]["failed"], 1);
    assert_eq!(report["candidates"][2]["failure"]["kind"], "invocation");
}

#[cfg(unix)]
#[test]
fn test_isolated_runs_in_child() {
    let file = module_file(SORT_MODULE);
    let out = fastpick(&["isolated", path_str(file.path()), "-n", "5", "--format", "json"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(value["results"].as_array().unwrap().len(), 2);
}

#[cfg(unix)]
#[test]
fn test_harness_against_binary() {
    use fastpick::{BenchmarkModule, Harness, LoadRequirements};
    use std::time::Duration;

    let file = module_file(SORT_MODULE);
    let module = BenchmarkModule::load(Some(file.path()), &LoadRequirements::default()).unwrap();

    let comparison = Harness::with_program(env!("CARGO_BIN_EXE_fastpick"), Duration::from_secs(60))
        .child_args(["-n", "5"])
        .run(&module)
        .unwrap();
    assert_eq!(comparison.results.len(), 2);
    assert!(comparison.get("Broken").is_none());
}

#[test]
fn test_init_writes_config_once() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("fastpick.toml");

    let out = fastpick(&["init", path_str(&target)]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let text = std::fs::read_to_string(&target).unwrap();
    assert!(text.contains("[runner]"));
    assert!(text.contains("call_timeout = \"1s\""));

    let out = fastpick(&["init", path_str(&target)]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("already exists"));
}
