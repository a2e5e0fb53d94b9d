//! # nml-cli — CLI Tool for nml-tools
//!
//! Provides the `nml-tools` command-line interface. All subcommands read
//! `nml-config.toml` (or the file given with `--config`); schema and output
//! paths inside it are relative to the config file.
//!
//! ## Subcommands
//!
//! - `nml-tools generate`: Fortran modules, docs, templates and the helper
//!   module, as configured per `[[nml-files]]` entry.
//! - `nml-tools gen-fortran`: Fortran modules and the helper module.
//! - `nml-tools gen-docs`: Markdown documentation.
//! - `nml-tools gen-template`: one combined namelist template.
//! - `nml-tools validate`: check namelist files against the schemas.
//!
//! ```bash
//! nml-tools generate
//! nml-tools gen-template --value-mode filled --output run.nml
//! nml-tools validate run.nml
//! ```

pub mod config;
pub mod gen_template;
pub mod generate;
pub mod project;
pub mod validate;
