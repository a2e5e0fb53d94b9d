//! # Generate Subcommands
//!
//! - `nml-tools generate`: every output configured per `[[nml-files]]`
//!   entry (module, docs, template) plus the helper module.
//! - `nml-tools gen-fortran`: the helper module and the Fortran modules.
//! - `nml-tools gen-docs`: the Markdown documents.
//!
//! Entries without the relevant path are skipped.

use std::path::Path;

use anyhow::{Context, Result};

use nml_codegen::{write_docs, write_fortran, write_helper, write_template, HandlebarsRenderer};

use crate::config::Config;
use crate::project::{load_schemas, LoadedSchema};

/// Which outputs a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outputs {
    pub fortran: bool,
    pub docs: bool,
    pub templates: bool,
}

impl Outputs {
    pub const ALL: Self = Self {
        fortran: true,
        docs: true,
        templates: true,
    };
    pub const FORTRAN: Self = Self {
        fortran: true,
        docs: false,
        templates: false,
    };
    pub const DOCS: Self = Self {
        fortran: false,
        docs: true,
        templates: false,
    };
}

/// Execute `generate`.
pub fn run_generate(config: &Config) -> Result<u8> {
    run_outputs(config, Outputs::ALL)
}

/// Execute `gen-fortran`.
pub fn run_gen_fortran(config: &Config) -> Result<u8> {
    run_outputs(config, Outputs::FORTRAN)
}

/// Execute `gen-docs`.
pub fn run_gen_docs(config: &Config) -> Result<u8> {
    run_outputs(config, Outputs::DOCS)
}

/// Generate the selected outputs. Written paths are listed on stdout.
pub fn run_outputs(config: &Config, outputs: Outputs) -> Result<u8> {
    let schemas = load_schemas(config)?;
    let renderer = HandlebarsRenderer::new()?;
    let mut written = 0usize;

    if outputs.fortran {
        if let Some(path) = &config.helper_path {
            write_helper(&config.helper_module, &config.constants, path, &renderer)
                .with_context(|| format!("failed to generate helper module: {}", path.display()))?;
            report(path);
            written += 1;
        }
    }

    let fortran_options = config.fortran_options();
    for loaded in &schemas {
        let LoadedSchema { file, schema, .. } = loaded;
        if outputs.fortran {
            if let Some(path) = &file.mod_path {
                write_fortran(schema, path, &fortran_options, &renderer)
                    .with_context(|| context_for("Fortran module", &schema.name, path))?;
                report(path);
                written += 1;
            }
        }
        if outputs.docs {
            if let Some(path) = &file.doc_path {
                write_docs(schema, path, &config.markdown, &renderer)
                    .with_context(|| context_for("Markdown docs", &schema.name, path))?;
                report(path);
                written += 1;
            }
        }
        if outputs.templates {
            if let Some(path) = &file.temp_path {
                write_template(
                    std::slice::from_ref(schema),
                    path,
                    &config.template,
                    &config.overrides,
                    &renderer,
                )
                .with_context(|| context_for("template", &schema.name, path))?;
                report(path);
                written += 1;
            }
        }
    }

    if written == 0 {
        tracing::warn!("no output paths configured for this command");
    }
    println!("OK: generated {written} file(s) from {} schema(s)", schemas.len());
    Ok(0)
}

fn context_for(what: &str, namelist: &str, path: &Path) -> String {
    format!("failed to generate {what} for '{namelist}': {}", path.display())
}

fn report(path: &Path) {
    tracing::info!(path = %path.display(), "wrote");
    println!("  {}", path.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
title: Layers
x-fortran-namelist: layers
type: object
required: [nlayers]
properties:
  nlayers:
    type: integer
    minimum: 1
    maximum: 10
"#;

    fn project(dir: &Path, body: &str) -> Config {
        std::fs::write(dir.join("layers.yml"), body).unwrap();
        let toml = r#"
helper_path = "out/nml_helper.f90"

[constants]
max_layers = { value = 3, doc = "maximum number of layers" }

[[nml-files]]
schema = "layers.yml"
mod_path = "out/nml_layers.f90"
doc_path = "docs/layers.md"
temp_path = "out/layers.nml"
"#;
        Config::from_toml_str(toml, dir).unwrap()
    }

    #[test]
    fn generate_writes_every_configured_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = project(dir.path(), SCHEMA);
        assert_eq!(run_generate(&config).unwrap(), 0);

        let helper = std::fs::read_to_string(dir.path().join("out/nml_helper.f90")).unwrap();
        assert!(helper.contains("integer, parameter, public :: max_layers = 3"));
        let module = std::fs::read_to_string(dir.path().join("out/nml_layers.f90")).unwrap();
        assert!(module.contains("module nml_layers"));
        let docs = std::fs::read_to_string(dir.path().join("docs/layers.md")).unwrap();
        assert!(docs.starts_with("# Layers"));
        let template = std::fs::read_to_string(dir.path().join("out/layers.nml")).unwrap();
        assert!(template.contains("&layers"));
    }

    #[test]
    fn gen_docs_writes_only_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let config = project(dir.path(), SCHEMA);
        run_gen_docs(&config).unwrap();
        assert!(dir.path().join("docs/layers.md").exists());
        assert!(!dir.path().join("out/nml_layers.f90").exists());
        assert!(!dir.path().join("out/nml_helper.f90").exists());
    }

    #[test]
    fn gen_fortran_writes_module_and_helper() {
        let dir = tempfile::tempdir().unwrap();
        let config = project(dir.path(), SCHEMA);
        run_gen_fortran(&config).unwrap();
        assert!(dir.path().join("out/nml_layers.f90").exists());
        assert!(dir.path().join("out/nml_helper.f90").exists());
        assert!(!dir.path().join("docs/layers.md").exists());
    }

    #[test]
    fn invalid_schema_fails_without_writing_its_module() {
        let dir = tempfile::tempdir().unwrap();
        let config = project(dir.path(), &SCHEMA.replace("maximum: 10", "maximum: 'ten'"));
        let err = run_generate(&config).unwrap_err();
        assert!(format!("{err:#}").contains("invalid schema"));
        assert!(!dir.path().join("out/nml_layers.f90").exists());
    }
}
