//! # Validate Subcommand
//!
//! `nml-tools validate <FILE>...` checks namelist files against the
//! configured schemas. Every group in a file must match the
//! `x-fortran-namelist` name of a configured schema. Problems from all
//! files are collected and reported together; any problem makes the exit
//! code 1.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;

use nml_core::Constants;
use nml_schema::{read_namelist_file, validate_namelist};

use crate::config::Config;
use crate::project::{find_schema, load_schemas, LoadedSchema};

/// Arguments for the `validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Namelist files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Outcome for one namelist file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    /// Groups that were checked, in file order.
    pub groups: Vec<String>,
    /// One message per problem.
    pub errors: Vec<String>,
}

impl FileReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check one namelist file. Never fails; problems land in the report.
pub fn validate_file(path: &Path, schemas: &[LoadedSchema], constants: &Constants) -> FileReport {
    let mut report = FileReport {
        path: path.to_path_buf(),
        groups: Vec::new(),
        errors: Vec::new(),
    };

    let groups = match read_namelist_file(path) {
        Ok(groups) => groups,
        Err(e) => {
            report.errors.push(e.to_string());
            return report;
        }
    };
    if groups.is_empty() {
        report.errors.push("no namelist groups found".to_string());
        return report;
    }

    for group in &groups {
        report.groups.push(group.name.clone());
        let Some(loaded) = find_schema(schemas, &group.name) else {
            report
                .errors
                .push(format!("&{}: no configured schema defines this namelist", group.name));
            continue;
        };
        if let Err(e) = validate_namelist(&loaded.raw, &group.values, constants) {
            report.errors.push(format!("&{}: {e}", group.name));
        }
    }
    report
}

/// Execute the `validate` subcommand.
pub fn run_validate(args: &ValidateArgs, config: &Config) -> Result<u8> {
    let schemas = load_schemas(config)?;
    let constants = config.constants();

    let mut failed = 0usize;
    for path in &args.files {
        let report = validate_file(path, &schemas, &constants);
        if report.is_ok() {
            tracing::debug!(path = %path.display(), groups = report.groups.len(), "valid");
            println!("OK: {} ({})", path.display(), report.groups.join(", "));
        } else {
            failed += 1;
            for error in &report.errors {
                eprintln!("FAIL: {}: {error}", path.display());
            }
        }
    }

    if failed > 0 {
        tracing::error!("{failed} of {} namelist file(s) failed validation", args.files.len());
        return Ok(1);
    }
    println!("All {} namelist file(s) are valid", args.files.len());
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
x-fortran-namelist: layers
type: object
required: [nlayers]
properties:
  nlayers:
    type: integer
    minimum: 1
    maximum: 10
  mode:
    type: string
    x-fortran-len: 8
    enum: [fast, slow]
"#;

    fn setup() -> (tempfile::TempDir, Config, Vec<LoadedSchema>) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("layers.yml"), SCHEMA).unwrap();
        let config = Config::from_toml_str("[[nml-files]]\nschema = \"layers.yml\"\n", dir.path()).unwrap();
        let schemas = load_schemas(&config).unwrap();
        (dir, config, schemas)
    }

    fn check(dir: &Path, schemas: &[LoadedSchema], name: &str, text: &str) -> FileReport {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        validate_file(&path, schemas, &Constants::new())
    }

    #[test]
    fn valid_file_passes() {
        let (dir, _config, schemas) = setup();
        let report = check(dir.path(), &schemas, "ok.nml", "&layers\n  nlayers = 3\n  mode = 'fast'\n/\n");
        assert!(report.is_ok(), "{:?}", report.errors);
        assert_eq!(report.groups, vec!["layers"]);
    }

    #[test]
    fn group_names_match_case_insensitively() {
        let (dir, _config, schemas) = setup();
        let report = check(dir.path(), &schemas, "upper.nml", "&LAYERS NLAYERS = 2 /\n");
        assert!(report.is_ok(), "{:?}", report.errors);
    }

    #[test]
    fn errors_from_every_group_are_collected() {
        let (dir, _config, schemas) = setup();
        let report = check(
            dir.path(),
            &schemas,
            "bad.nml",
            "&layers\n  nlayers = 11\n/\n&layers\n  nlayers = 2\n  mode = 'medium'\n/\n&other\n  x = 1\n/\n",
        );
        assert_eq!(report.errors.len(), 3, "{:?}", report.errors);
        assert!(report.errors[0].starts_with("&layers: nlayers"));
        assert!(report.errors[1].starts_with("&layers: mode"));
        assert!(report.errors[2].contains("no configured schema"));
    }

    #[test]
    fn missing_required_value_is_reported() {
        let (dir, _config, schemas) = setup();
        let report = check(dir.path(), &schemas, "missing.nml", "&layers\n  mode = 'slow'\n/\n");
        assert_eq!(report.errors, vec!["&layers: nlayers: required property is missing".to_string()]);
    }

    #[test]
    fn file_without_groups_fails() {
        let (dir, _config, schemas) = setup();
        let report = check(dir.path(), &schemas, "empty.nml", "! nothing here\n");
        assert_eq!(report.errors, vec!["no namelist groups found".to_string()]);
    }

    #[test]
    fn run_validate_returns_one_on_failure() {
        let (dir, config, _schemas) = setup();
        let good = dir.path().join("good.nml");
        let bad = dir.path().join("bad.nml");
        std::fs::write(&good, "&layers nlayers = 1 /\n").unwrap();
        std::fs::write(&bad, "&layers nlayers = 0 /\n").unwrap();

        let args = ValidateArgs { files: vec![good.clone()] };
        assert_eq!(run_validate(&args, &config).unwrap(), 0);

        let args = ValidateArgs { files: vec![good, bad] };
        assert_eq!(run_validate(&args, &config).unwrap(), 1);
    }

    #[test]
    fn unreadable_file_is_reported() {
        let (dir, _config, schemas) = setup();
        let report = validate_file(&dir.path().join("absent.nml"), &schemas, &Constants::new());
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("absent.nml"));
    }
}
