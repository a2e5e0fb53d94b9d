//! Smoke tests that drive the `nml-tools` binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn fixture_dir() -> PathBuf {
    let mut dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    dir.pop(); // crates/
    dir.pop(); // repo root
    dir.join("fixtures").join("01_simple")
}

fn nml_tools(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_nml-tools"))
        .args(args)
        .output()
        .unwrap()
}

/// Copy the fixture project into a scratch directory.
fn scratch_project() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    for name in ["nml-config.toml", "optimization.yml"] {
        std::fs::copy(fixture_dir().join(name), dir.path().join(name)).unwrap();
    }
    let config = dir.path().join("nml-config.toml");
    (dir, config)
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn help_lists_subcommands() {
    let out = nml_tools(&["--help"]);
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    for sub in ["generate", "validate", "gen-fortran", "gen-docs", "gen-template"] {
        assert!(stdout.contains(sub), "missing {sub} in:\n{stdout}");
    }
}

#[test]
fn generate_then_validate_the_filled_template() {
    let (dir, config) = scratch_project();
    let out = nml_tools(&["--config", path_str(&config), "generate"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    for file in [
        "out/nml_helper.f90",
        "out/nml_optimization.f90",
        "docs/optimization.md",
        "out/optimization.nml",
    ] {
        assert!(dir.path().join(file).is_file(), "{file} was not generated");
    }
    let module = std::fs::read_to_string(dir.path().join("out/nml_optimization.f90")).unwrap();
    assert!(module.contains("use mo_kind, only:"));
    assert!(module.contains("Generated by nml-tools."));
    let docs = std::fs::read_to_string(dir.path().join("docs/optimization.md")).unwrap();
    assert!(docs.lines().next().unwrap().ends_with("{#optimization}"));

    let template = dir.path().join("out/optimization.nml");
    let out = nml_tools(&["--config", path_str(&config), "validate", path_str(&template)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
}

#[test]
fn gen_template_prints_to_stdout() {
    let (_dir, config) = scratch_project();
    let out = nml_tools(&[
        "--config",
        path_str(&config),
        "gen-template",
        "--doc-mode",
        "plain",
        "--value-mode",
        "empty",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.starts_with("&optimization\n"));
    assert!(stdout.trim_end().ends_with('/'));
}

#[test]
fn invalid_namelist_exits_with_one() {
    let (dir, config) = scratch_project();
    let bad = dir.path().join("bad.nml");
    std::fs::write(&bad, "&optimization\n  no_such_field = 1\n/\n").unwrap();
    let out = nml_tools(&["--config", path_str(&config), "validate", path_str(&bad)]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("no_such_field: unknown property"), "{stderr}");
}

#[test]
fn missing_config_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("absent.toml");
    let out = nml_tools(&["--config", path_str(&config), "gen-docs"]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("failed to read config"), "{stderr}");
}
