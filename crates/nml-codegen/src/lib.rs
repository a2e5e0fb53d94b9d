//! # nml-codegen — Emitters for nml-tools
//!
//! Turns resolved [`NamelistSchema`]s into text:
//!
//! - **Fortran module** ([`fortran`]): a derived type per namelist with
//!   `set_default`, `init`, `from_file`, `is_set` and `is_valid`, plus the
//!   enum/bounds check functions and default/pad/enum parameters.
//!
//! - **Fortran helper module** ([`fortran::helper`]): status codes, the
//!   namelist file reader and the config constants.
//!
//! - **Markdown** ([`markdown`]): summary table, per-field sections and a
//!   filled example block.
//!
//! - **Namelist templates** ([`template`]): `&group ... /` blocks in four
//!   value modes.
//!
//! Every emitter builds a flat serializable context and hands it to a
//! [`Renderer`]; [`HandlebarsRenderer`] is the embedded backend.
//!
//! ## Crate Policy
//!
//! - Depends on `nml-core` and `nml-schema` internally.
//! - Output is byte-deterministic: property order follows the schema and
//!   no timestamps are written.
//! - File writes happen only in the `write_*` functions.
//!
//! [`NamelistSchema`]: nml_schema::NamelistSchema

mod describe;
pub mod fortran;
pub mod markdown;
pub mod output;
pub mod render;
pub mod template;

pub use fortran::helper::{generate_helper, write_helper, HelperConstant};
pub use fortran::{generate_fortran, write_fortran, FortranOptions};
pub use markdown::{generate_docs, write_docs, MarkdownOptions};
pub use output::write_output;
pub use render::{render_with, HandlebarsRenderer, Renderer};
pub use template::{render_template, write_template, DocMode, Overrides, TemplateOptions, ValueMode};
