//! CLI surface tests: flags, exit codes, diagnostics on stderr.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn routc() -> Command {
    Command::cargo_bin("routc").expect("routc binary builds")
}

#[test]
fn test_help_lists_compile() {
    routc()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("compile"));
}

#[test]
fn test_version() {
    routc()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("routc"));
}

#[test]
fn test_missing_input_file() {
    let temp = TempDir::new().unwrap();
    routc()
        .arg("compile")
        .arg(temp.path().join("nope.rout"))
        .arg(temp.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn test_syntax_error_reports_location_and_fails() {
    let temp = TempDir::new().unwrap();
    routc()
        .arg("compile")
        .arg(fixture("bad_syntax.rout"))
        .arg(temp.path())
        .arg("--wat-only")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("expected an expression"))
        .stderr(predicate::str::contains("3:1"));
}

#[test]
fn test_semantic_error_fails() {
    let temp = TempDir::new().unwrap();
    routc()
        .arg("compile")
        .arg(fixture("undeclared.rout"))
        .arg(temp.path())
        .arg("--wat-only")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Variable ghost is not declared"));
}

#[test]
fn test_warnings_on_stderr_do_not_fail() {
    let temp = TempDir::new().unwrap();
    routc()
        .arg("compile")
        .arg(fixture("unused.rout"))
        .arg(temp.path())
        .arg("--wat-only")
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "warning: Variable 'idle' declared at 2:5 is never used",
        ));
}

#[test]
fn test_emit_tokens() {
    routc()
        .arg("compile")
        .arg(fixture("arithmetic.rout"))
        .arg("--emit-tokens")
        .assert()
        .success()
        .stdout(predicate::str::contains("routine"))
        .stdout(predicate::str::contains("print"))
        .stdout(predicate::str::contains("end of input"));
}

#[test]
fn test_emit_ast() {
    routc()
        .arg("compile")
        .arg(fixture("arithmetic.rout"))
        .arg("--emit-ast")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Program"))
        .stdout(predicate::str::contains("RoutineDecl"));
}

#[test]
fn test_emit_stages_write_no_artifacts() {
    let temp = TempDir::new().unwrap();
    routc()
        .arg("compile")
        .arg(fixture("arithmetic.rout"))
        .arg(temp.path())
        .arg("--emit-tokens")
        .assert()
        .success();
    assert!(std::fs::read_dir(temp.path()).unwrap().next().is_none());
}

#[test]
fn test_unknown_flag_fails() {
    routc()
        .arg("compile")
        .arg(fixture("arithmetic.rout"))
        .arg("--frobnicate")
        .assert()
        .failure();
}
