//! End-to-end tests for the `td-inspect` binary and manifest loading.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;
use typedispatch::DispatchConfig;
use typedispatch_inspect::{Inspector, Manifest, ManifestError};

const SHAPES: &str = r#"
prelude = true

[[types]]
name = "Drawable"
kind = "category"

[[types]]
name = "Canvas"

[[types]]
name = "Layer"
bases = ["Canvas"]

[[virtual]]
category = "Drawable"
types = ["Canvas"]

[dispatch]
default = "plain"

[[dispatch.handlers]]
key = "Drawable"
label = "draw"

[[dispatch.handlers]]
key = "Sized"
label = "measure"

[[dispatch.handlers]]
key = "int | str"
label = "scalar"
"#;

fn write_manifest(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("dispatch.toml");
    fs::write(&path, content).expect("write manifest");
    path
}

fn run(manifest: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_td-inspect"))
        .arg("--manifest")
        .arg(manifest)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run td-inspect")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = write_manifest(&dir, SHAPES);

    let manifest = Manifest::load(&path).unwrap();
    let mut inspector = Inspector::from_manifest(&manifest, &DispatchConfig::default()).unwrap();
    let report = inspector.check();
    assert!(report.is_clean(), "{:?}", report.problems);
}

#[test]
fn test_missing_manifest_file() {
    let dir = TempDir::new().unwrap();
    let err = Manifest::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ManifestError::Io { .. }));
}

#[test]
fn test_cli_resolve() {
    let dir = TempDir::new().unwrap();
    let path = write_manifest(&dir, SHAPES);

    let output = run(&path, &["resolve", "Layer", "int", "tuple", "object"]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "Layer: draw\nint: scalar\ntuple: measure\nobject: plain\n"
    );
}

#[test]
fn test_cli_mro() {
    let dir = TempDir::new().unwrap();
    let path = write_manifest(&dir, SHAPES);

    let output = run(&path, &["mro", "Layer"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "Layer -> Canvas -> Drawable -> object\n");

    let output = run(&path, &["mro", "Nope"]);
    assert!(!output.status.success());
}

#[test]
fn test_cli_table_json() {
    let dir = TempDir::new().unwrap();
    let path = write_manifest(&dir, SHAPES);

    let output = run(&path, &["--json", "table"]);
    assert!(output.status.success());
    let bindings: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let keys: Vec<&str> = bindings
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["object", "Drawable", "Sized", "int", "str"]);
}

#[test]
fn test_cli_check_fails_on_ambiguity() {
    let dir = TempDir::new().unwrap();
    let clean = write_manifest(&dir, SHAPES);
    assert!(run(&clean, &["check"]).status.success());

    let ambiguous = format!(
        "{SHAPES}\n[[types]]\nname = \"Tray\"\n\n[[virtual]]\ncategory = \"Drawable\"\ntypes = [\"Tray\"]\n\n[[virtual]]\ncategory = \"Sized\"\ntypes = [\"Tray\"]\n"
    );
    let path = write_manifest(&dir, &ambiguous);
    let output = run(&path, &["check"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_cli_config_disables_cache() {
    let dir = TempDir::new().unwrap();
    let path = write_manifest(&dir, SHAPES);
    let config = dir.path().join("config.toml");
    fs::write(&config, "[cache]\nenabled = false\n").unwrap();

    let output = run(&path, &["--config", config.to_str().unwrap(), "resolve", "Layer"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "Layer: draw\n");
}
