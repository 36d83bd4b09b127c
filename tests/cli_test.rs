//! End-to-end runs of the `tkgen` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_config(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

fn tkgen() -> Command {
    Command::cargo_bin("tkgen").unwrap()
}

#[test]
fn test_generates_dct_kernel() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        "dct16.json",
        r#"{ "N": 16, "orthogon": true, "output": "dct16.rs" }"#,
    );

    tkgen()
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("OK! Mul/Add="));

    let source = fs::read_to_string(dir.path().join("dct16.rs")).unwrap();
    assert!(source.starts_with("// Generated by tkgen. Do not edit."));
    assert!(source.contains("pub fn dct2_forward_16("));
    assert!(source.contains("pub fn dct2_forward_16_in_place("));
}

#[test]
fn test_generates_subroutine_fft_with_stats() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("fft60.rs");
    let body = format!(
        r#"{{ "N": 60, "transform": "fft", "strategy": "subroutine", "max_function_lines": 20, "output": {} }}"#,
        serde_json::to_string(&out).unwrap()
    );
    let config = write_config(dir.path(), "fft60.json", &body);

    tkgen()
        .arg(&config)
        .arg("--stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("OK! Mul/Add="))
        .stderr(predicate::str::contains("Butterflies:"));

    let source = fs::read_to_string(&out).unwrap();
    assert!(source.contains("use tkgen::fft::baseop::{"));
    assert!(source.contains("fn fft_mixed_radix_60_part0("));
    assert!(source.contains("pub fn fft_mixed_radix_60("));
}

#[test]
fn test_bad_size_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        "fft7.json",
        r#"{ "N": 7, "transform": "fft", "output": "fft7.rs" }"#,
    );

    tkgen()
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error:"));
    assert!(!dir.path().join("fft7.rs").exists());
}

#[test]
fn test_invalid_configs_fail() {
    let dir = TempDir::new().unwrap();
    let cases = [
        ("missing_output.json", r#"{ "N": 16 }"#),
        ("not_json.json", "N = 16"),
        ("dct_subroutine.json", r#"{ "N": 16, "strategy": "subroutine", "output": "x.rs" }"#),
        ("misspelled_key.json", r#"{ "N": 16, "orthgon": true, "output": "x.rs" }"#),
    ];
    for (name, body) in cases {
        let config = write_config(dir.path(), name, body);
        tkgen().arg(&config).assert().code(1);
    }
    assert!(!dir.path().join("x.rs").exists());

    tkgen().arg(dir.path().join("does_not_exist.json")).assert().code(1);
}

#[test]
fn test_usage() {
    tkgen().assert().code(1);
    tkgen()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}
