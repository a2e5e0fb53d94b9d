//! # Template Subcommand
//!
//! `nml-tools gen-template` writes one combined namelist template for all
//! configured schemas, to `--output` or stdout. `--doc-mode` and
//! `--value-mode` override the `[template]` table of the config.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use nml_codegen::{render_template, write_output, DocMode, HandlebarsRenderer, TemplateOptions, ValueMode};
use nml_schema::NamelistSchema;

use crate::config::Config;
use crate::project::load_schemas;

/// Arguments for the `gen-template` subcommand.
#[derive(Args, Debug)]
pub struct GenTemplateArgs {
    /// Output file. Prints to stdout when omitted.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Comment style: plain or documented.
    #[arg(long)]
    pub doc_mode: Option<DocMode>,

    /// Values written: empty, filled, minimal-empty or minimal-filled.
    #[arg(long)]
    pub value_mode: Option<ValueMode>,
}

impl GenTemplateArgs {
    /// Command-line modes layered over the configured ones.
    pub fn options(&self, config: &Config) -> TemplateOptions {
        TemplateOptions {
            doc_mode: self.doc_mode.unwrap_or(config.template.doc_mode),
            value_mode: self.value_mode.unwrap_or(config.template.value_mode),
        }
    }
}

/// Execute the `gen-template` subcommand.
pub fn run_gen_template(args: &GenTemplateArgs, config: &Config) -> Result<u8> {
    let schemas: Vec<NamelistSchema> = load_schemas(config)?.into_iter().map(|l| l.schema).collect();
    let options = args.options(config);
    let renderer = HandlebarsRenderer::new()?;
    let text = render_template(&schemas, &options, &config.overrides, &renderer)
        .context("failed to generate namelist template")?;
    tracing::debug!(
        doc_mode = %options.doc_mode,
        value_mode = %options.value_mode,
        groups = schemas.len(),
        "rendered template"
    );

    match &args.output {
        Some(path) => {
            write_output(path, &text)
                .with_context(|| format!("failed to write template: {}", path.display()))?;
            println!("OK: wrote {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn project(dir: &Path) -> Config {
        std::fs::write(
            dir.join("a.yml"),
            "x-fortran-namelist: alpha\ntype: object\nproperties:\n  n:\n    type: integer\n    default: 3\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("b.yml"),
            "x-fortran-namelist: beta\ntype: object\nproperties:\n  x:\n    type: number\n",
        )
        .unwrap();
        let toml = "[template]\ndoc_mode = \"plain\"\n\n[[nml-files]]\nschema = \"a.yml\"\n\n[[nml-files]]\nschema = \"b.yml\"\n";
        Config::from_toml_str(toml, dir).unwrap()
    }

    #[test]
    fn combined_template_is_written_to_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = project(dir.path());
        let args = GenTemplateArgs {
            output: Some(dir.path().join("out/all.nml")),
            doc_mode: None,
            value_mode: None,
        };
        assert_eq!(run_gen_template(&args, &config).unwrap(), 0);
        let text = std::fs::read_to_string(dir.path().join("out/all.nml")).unwrap();
        assert_eq!(text, "&alpha\n  n =\n/\n\n&beta\n  x =\n/\n");
    }

    #[test]
    fn command_line_modes_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = project(dir.path());
        let args = GenTemplateArgs {
            output: Some(dir.path().join("filled.nml")),
            doc_mode: None,
            value_mode: Some(ValueMode::Filled),
        };
        let options = args.options(&config);
        assert_eq!(options.doc_mode, DocMode::Plain);
        assert_eq!(options.value_mode, ValueMode::Filled);
        run_gen_template(&args, &config).unwrap();
        let text = std::fs::read_to_string(dir.path().join("filled.nml")).unwrap();
        assert!(text.contains("  n = 3\n"));
    }
}
