//! CLI smoke tests for apkrule.
//!
//! These tests verify that all CLI commands run without panicking and
//! return appropriate exit codes.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serial_test::serial;
use tempfile::TempDir;

/// Get a Command for the apkrule binary.
fn apkrule_cmd() -> Command {
  let mut cmd = cargo_bin_cmd!("apkrule");
  cmd.env_remove("APKRULE_GEN_DIR");
  cmd
}

/// Create a project directory with a manifest and the directories it names.
fn temp_project(manifest: &str) -> TempDir {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("apkrule.json"), manifest).unwrap();
  for dir in ["res/a/res", "res/b/res", "res/c/assets"] {
    std::fs::create_dir_all(temp.path().join(dir)).unwrap();
  }
  std::fs::create_dir_all(temp.path().join("src")).unwrap();
  std::fs::write(temp.path().join("src/greeting.txt"), "hello\n").unwrap();
  temp
}

const MANIFEST: &str = r#"{
  "rules": [
    { "target": "//res/a:res", "type": "resource", "res_dir": "res/a/res", "package": "com.a" },
    { "target": "//res/b:res", "type": "resource", "res_dir": "res/b/res", "package": "com.b",
      "exclude_from_merge": true },
    { "target": "//res/c:assets", "type": "resource", "assets_dir": "res/c/assets" },
    { "target": "//java:lib", "type": "library", "deps": ["//res/b:res", "//res/a:res", "//res/c:assets"] },
    { "target": "//apps:app", "type": "binary", "deps": ["//java:lib"], "output": "build-out/app.apk" }
  ],
  "genrules": [
    { "target": "//src:copy", "bash": "cat ../copy__srcs/greeting.txt > \"$OUT\"",
      "cmd_exe": "type ..\\copy__srcs\\greeting.txt > \"%OUT%\"",
      "srcs": ["src/greeting.txt"], "out": "greeting.txt" },
    { "target": "//src:sign", "cmd": "echo $APP > $OUT", "out": "signed.txt",
      "tokens": { "APP": "//apps:app" } }
  ]
}"#;

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  apkrule_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  apkrule_cmd()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("apkrule"));
}

#[test]
fn subcommand_help_works() {
  for cmd in &["resolve", "plan", "run"] {
    apkrule_cmd()
      .arg(cmd)
      .arg("--help")
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

// =============================================================================
// resolve
// =============================================================================

#[test]
fn resolve_lists_resources_in_discovery_order() {
  let temp = temp_project(MANIFEST);

  apkrule_cmd()
    .arg("resolve")
    .arg(temp.path().join("apkrule.json"))
    .args(["--root", "//java:lib"])
    .assert()
    .success()
    .stdout(predicate::str::contains("2 resource dependencies"))
    .stdout(predicate::str::is_match(r"(?s)//res/b:res.*//res/a:res").unwrap())
    .stdout(predicate::str::contains("res/c/assets"));
}

#[test]
fn resolve_for_binary_rule_can_exclude_flagged() {
  let temp = temp_project(MANIFEST);

  apkrule_cmd()
    .arg("resolve")
    .arg(temp.path().join("apkrule.json"))
    .args(["--rule", "//apps:app", "--exclude-flagged"])
    .assert()
    .success()
    .stdout(predicate::str::contains("1 resource dependencies"))
    .stdout(predicate::str::contains("//res/b:res").not());
}

#[test]
fn resolve_json_output() {
  let temp = temp_project(MANIFEST);

  let output = apkrule_cmd()
    .arg("resolve")
    .arg(temp.path().join("apkrule.json"))
    .args(["--root", "//apps:app", "--json"])
    .output()
    .unwrap();

  assert!(output.status.success());
  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["packages"], serde_json::json!(["com.b", "com.a"]));
  assert_eq!(json["resources"].as_array().unwrap().len(), 2);
}

#[test]
fn resolve_json_excluding_flagged_is_consistent() {
  let temp = temp_project(MANIFEST);

  let output = apkrule_cmd()
    .arg("resolve")
    .arg(temp.path().join("apkrule.json"))
    .args(["--root", "//apps:app", "--exclude-flagged", "--json"])
    .output()
    .unwrap();

  assert!(output.status.success());
  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["resources"].as_array().unwrap().len(), 1);
  assert_eq!(json["packages"], serde_json::json!(["com.a"]));
  assert_eq!(json["res_dirs"], serde_json::json!(["res/a/res"]));
}

#[test]
fn resolve_missing_resource_directory_fails() {
  let temp = temp_project(MANIFEST);
  std::fs::remove_dir_all(temp.path().join("res/a/res")).unwrap();

  apkrule_cmd()
    .arg("resolve")
    .arg(temp.path().join("apkrule.json"))
    .args(["--root", "//apps:app"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("res/a/res"));
}

#[test]
fn resolve_requires_a_root() {
  let temp = temp_project(MANIFEST);

  apkrule_cmd()
    .arg("resolve")
    .arg(temp.path().join("apkrule.json"))
    .assert()
    .failure();
}

// =============================================================================
// plan
// =============================================================================

#[test]
fn plan_shows_steps() {
  let temp = temp_project(MANIFEST);

  apkrule_cmd()
    .arg("plan")
    .arg(temp.path().join("apkrule.json"))
    .arg("//src:copy")
    .assert()
    .success()
    .stdout(predicate::str::contains("6 steps"))
    .stdout(predicate::str::contains("symlink"))
    .stdout(predicate::str::contains("build-out/gen/src/greeting.txt"));
}

#[test]
fn plan_json_binds_tokens() {
  let temp = temp_project(MANIFEST);

  let output = apkrule_cmd()
    .arg("plan")
    .arg(temp.path().join("apkrule.json"))
    .arg("//src:sign")
    .arg("--json")
    .output()
    .unwrap();

  assert!(output.status.success());
  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let steps = json["plan"]["steps"].as_array().unwrap();
  assert_eq!(steps.len(), 5);
  let app = steps[4]["env"]["APP"].as_str().unwrap();
  assert!(app.ends_with("app.apk"));
  assert_eq!(json["hash"].as_str().unwrap().len(), 20);
}

#[test]
fn plan_for_other_platform_uses_its_shell() {
  let temp = temp_project(MANIFEST);

  let output = apkrule_cmd()
    .arg("plan")
    .arg(temp.path().join("apkrule.json"))
    .arg("//src:copy")
    .args(["--platform", "windows", "--json"])
    .output()
    .unwrap();

  assert!(output.status.success());
  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let argv = json["plan"]["steps"][5]["argv"].as_array().unwrap();
  assert_eq!(argv[0], "cmd.exe");
  assert_eq!(argv[1], "/c");
}

#[test]
fn plan_unknown_genrule_fails() {
  let temp = temp_project(MANIFEST);

  apkrule_cmd()
    .arg("plan")
    .arg(temp.path().join("apkrule.json"))
    .arg("//apps:app")
    .assert()
    .failure()
    .stderr(predicate::str::contains("No genrule named //apps:app"));
}

#[test]
fn plan_nonexistent_manifest_fails() {
  apkrule_cmd()
    .arg("plan")
    .arg("/nonexistent/path/apkrule.json")
    .arg("//src:copy")
    .assert()
    .failure();
}

// =============================================================================
// run
// =============================================================================

#[test]
#[serial]
fn run_builds_selected_genrule() {
  let temp = temp_project(MANIFEST);

  apkrule_cmd()
    .arg("run")
    .arg(temp.path().join("apkrule.json"))
    .args(["--target", "//src:copy", "--jobs", "2"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Built 1 genrule(s)"));

  let out = std::fs::read_to_string(temp.path().join("build-out/gen/src/greeting.txt")).unwrap();
  assert_eq!(out.trim(), "hello");
}

#[test]
#[serial]
fn run_honors_gen_dir_override() {
  let temp = temp_project(MANIFEST);

  apkrule_cmd()
    .arg("run")
    .arg(temp.path().join("apkrule.json"))
    .args(["--target", "//src:copy"])
    .env("APKRULE_GEN_DIR", "out/generated")
    .assert()
    .success();

  assert!(temp.path().join("out/generated/src/greeting.txt").exists());
}

#[test]
#[serial]
#[cfg(unix)]
fn run_reports_failing_command() {
  let temp = temp_project(
    r#"{ "genrules": [ { "target": "//src:boom", "cmd": "exit 3", "out": "boom.txt" } ] }"#,
  );

  apkrule_cmd()
    .arg("run")
    .arg(temp.path().join("apkrule.json"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("exit code 3"));
}

#[test]
fn run_unknown_target_fails() {
  let temp = temp_project(MANIFEST);

  apkrule_cmd()
    .arg("run")
    .arg(temp.path().join("apkrule.json"))
    .args(["--target", "//src:nope"])
    .assert()
    .failure();
}
