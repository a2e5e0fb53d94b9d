//! # nml-tools CLI entry point
//!
//! Parses command-line arguments, loads the config and dispatches to the
//! subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use nml_cli::config::{Config, DEFAULT_CONFIG};
use nml_cli::gen_template::{run_gen_template, GenTemplateArgs};
use nml_cli::generate::{run_gen_docs, run_gen_fortran, run_generate};
use nml_cli::validate::{run_validate, ValidateArgs};

/// nml-tools: Fortran namelist code generator
///
/// Generates Fortran modules, Markdown documentation and namelist templates
/// from JSON/YAML namelist schemas, and validates namelist files.
#[derive(Parser, Debug)]
#[command(name = "nml-tools", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate every configured output and the helper module.
    Generate,

    /// Generate the Fortran modules and the helper module.
    GenFortran,

    /// Generate the Markdown documentation.
    GenDocs,

    /// Generate one namelist template for all configured schemas.
    GenTemplate(GenTemplateArgs),

    /// Validate namelist files against the configured schemas.
    Validate(ValidateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(config = %cli.config.display(), "nml-tools starting");

    let result = Config::load(&cli.config).and_then(|config| match &cli.command {
        Commands::Generate => run_generate(&config),
        Commands::GenFortran => run_gen_fortran(&config),
        Commands::GenDocs => run_gen_docs(&config),
        Commands::GenTemplate(args) => run_gen_template(args, &config),
        Commands::Validate(args) => run_validate(args, &config),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
