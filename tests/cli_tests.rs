//! Integration tests for the boa-sema CLI
//!
//! Tests the CLI commands: check, schema, aggregators

use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};

use boa_sema::ast::{ComparisonOp, Program};
use boa_sema::builder::TreeBuilder;

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Helper to run boa-sema and capture output
fn run_sema(args: &[&str], envs: &[(&str, &str)]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_boa-sema"))
        .args(args)
        .env_remove("BOA_SEMA_CONFIG")
        .envs(envs.iter().copied())
        .env("NO_COLOR", "1")
        .env("CLICOLOR", "0")
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .output()
        .expect("Failed to execute boa-sema");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn unique_test_file(extension: &str) -> PathBuf {
    let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    std::env::temp_dir().join(format!(
        "boa_sema_cli_test_{}_{}.{}",
        std::process::id(),
        counter,
        extension
    ))
}

fn write_program(program: &Program) -> PathBuf {
    let path = unique_test_file("json");
    std::fs::write(&path, serde_json::to_string(program).unwrap()).unwrap();
    path
}

fn write_config(text: &str) -> PathBuf {
    let path = unique_test_file("toml");
    std::fs::write(&path, text).unwrap();
    path
}

/// `counts: output sum[string] of int; counts[input.id] << 1;`
fn valid_program() -> Program {
    let b = TreeBuilder::new();
    let table = b.decl(
        "counts",
        Some(b.output("sum", vec![], vec![b.ty("string")], b.ty("int"), None)),
        None,
    );
    let emit = b.emit("counts", vec![b.select(b.var("input"), "id")], b.int(1), None);
    b.program(vec![table, emit])
}

/// `x: int = 5.0;`
fn narrowing_program() -> Program {
    let b = TreeBuilder::new();
    b.program(vec![b.decl("x", Some(b.ty("int")), Some(b.float(5.0)))])
}

// ============================================================================
// boa-sema check tests
// ============================================================================

#[test]
fn test_check_valid_program() {
    let path = write_program(&valid_program());
    let (stdout, _, code) = run_sema(&["check", path.to_str().unwrap()], &[]);
    std::fs::remove_file(&path).ok();

    assert_eq!(code, 0, "check should succeed for a valid program");
    assert!(stdout.contains("No type errors found"));
}

#[test]
fn test_check_json_output() {
    let b = TreeBuilder::new();
    let cmp = b.cmp(b.int(1), ComparisonOp::Lt, b.float(2.0));
    let cmp_id = cmp.id;
    let program = b.program(vec![b.expr_stmt(cmp)]);
    let path = write_program(&program);
    let (stdout, _, code) = run_sema(&["check", path.to_str().unwrap(), "--json"], &[]);
    std::fs::remove_file(&path).ok();

    assert_eq!(code, 0);
    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("check --json should output valid JSON");
    assert_eq!(json["types"][cmp_id.0.to_string()], serde_json::json!("Bool"));
    assert!(json["scopes"].as_object().unwrap().len() >= 2);
}

#[test]
fn test_check_reports_first_error() {
    let path = write_program(&narrowing_program());
    let (_, stderr, code) = run_sema(&["check", path.to_str().unwrap()], &[]);
    std::fs::remove_file(&path).ok();

    assert_eq!(code, 1, "check should fail for an ill-typed program");
    assert!(stderr.contains("IncompatibleTypes error at node"));
    assert!(stderr.contains("incorrect type 'float' for assignment to 'x: int'"));
}

#[test]
fn test_check_nonexistent_file() {
    let (_, stderr, code) = run_sema(&["check", "no/such/program.json"], &[]);
    assert_ne!(code, 0, "check should fail for nonexistent file");
    assert!(stderr.contains("Error"));
}

#[test]
fn test_check_malformed_json() {
    let path = unique_test_file("json");
    std::fs::write(&path, "{\"id\": 0, \"statements\": [").unwrap();
    let (_, _, code) = run_sema(&["check", path.to_str().unwrap()], &[]);
    std::fs::remove_file(&path).ok();

    assert_eq!(code, 1);
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_check_with_config_cast() {
    let program = write_program(&narrowing_program());
    let config = write_config("[[cast]]\nfrom = \"float\"\nto = \"int\"\n");
    let (stdout, stderr, code) = run_sema(
        &[
            "check",
            program.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ],
        &[],
    );
    std::fs::remove_file(&program).ok();
    std::fs::remove_file(&config).ok();

    assert_eq!(code, 0, "cast from config should admit the program: {}", stderr);
    assert!(stdout.contains("No type errors found"));
}

#[test]
fn test_check_config_from_environment() {
    let program = write_program(&narrowing_program());
    let config = write_config("[[cast]]\nfrom = \"float\"\nto = \"int\"\n");
    let (_, _, code) = run_sema(
        &["check", program.to_str().unwrap()],
        &[("BOA_SEMA_CONFIG", config.to_str().unwrap())],
    );
    std::fs::remove_file(&program).ok();
    std::fs::remove_file(&config).ok();

    assert_eq!(code, 0);
}

#[test]
fn test_check_with_invalid_config() {
    let program = write_program(&valid_program());
    let config = write_config("[[cast]]\nfrom = \"complex\"\nto = \"int\"\n");
    let (_, stderr, code) = run_sema(
        &[
            "check",
            program.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ],
        &[],
    );
    std::fs::remove_file(&program).ok();
    std::fs::remove_file(&config).ok();

    assert_eq!(code, 1);
    assert!(stderr.contains("unknown type name 'complex'"));
}

// ============================================================================
// boa-sema schema / aggregators tests
// ============================================================================

#[test]
fn test_schema_lists_type_names() {
    let (stdout, _, code) = run_sema(&["schema"], &[]);
    assert_eq!(code, 0);
    for name in ["Project", "Revision", "ChangeKind", "int", "string"] {
        assert!(stdout.lines().any(|l| l == name), "missing type name {}", name);
    }
}

#[test]
fn test_schema_shows_record_attributes() {
    let (stdout, _, code) = run_sema(&["schema", "Revision"], &[]);
    assert_eq!(code, 0);
    assert!(stdout.contains("record Revision"));
    assert!(stdout.contains("log: string"));
}

#[test]
fn test_schema_shows_enum_values() {
    let (stdout, _, code) = run_sema(&["schema", "ChangeKind"], &[]);
    assert_eq!(code, 0);
    assert!(stdout.contains("enum ChangeKind"));
    assert!(stdout.contains("ADDED"));
}

#[test]
fn test_schema_unknown_name() {
    let (_, stderr, code) = run_sema(&["schema", "Frob"], &[]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown type name 'Frob'"));
}

#[test]
fn test_aggregators_listing() {
    let (stdout, _, code) = run_sema(&["aggregators"], &[]);
    assert_eq!(code, 0);
    assert!(stdout.contains("sum[int]()"));
    assert!(stdout.contains("top[any](int) weight float"));
    assert!(stdout.contains("set[any](int) optional 1"));
}

// ============================================================================
// Help
// ============================================================================

#[test]
fn test_help_lists_commands() {
    let (stdout, _, code) = run_sema(&["--help"], &[]);
    assert_eq!(code, 0);
    for command in ["check", "schema", "aggregators"] {
        assert!(stdout.contains(command), "help should list {}", command);
    }
}
