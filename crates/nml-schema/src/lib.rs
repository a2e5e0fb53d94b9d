//! # nml-schema — Schema Model for nml-tools
//!
//! Turns a namelist schema document into the resolved model every emitter
//! consumes, and checks actual namelist files against a schema.
//!
//! ## Pipeline
//!
//! 1. [`load_schema`] reads `.json`/`.yml`/`.yaml` into a JSON value tree,
//!    preserving property order.
//! 2. [`resolve_type`] turns one property into a [`TypeDescriptor`],
//!    resolving named dimensions and lengths against [`Constants`].
//! 3. The [`normalize`] module converts `default`, `enum`, bounds and
//!    `examples` into typed literals, including reshape metadata for
//!    array defaults.
//! 4. [`NamelistSchema::resolve`] combines both per property and enforces
//!    every cross-field rule.
//!
//! The [`validate`] module re-derives shape, enum, bounds and length rules
//! independently of code generation, and [`reader`] parses namelist text
//! into the value trees it checks.
//!
//! ## Crate Policy
//!
//! - Depends only on `nml-core` internally.
//! - Resolution is a pure function of `(schema, constants)`; the only I/O
//!   is in [`load_schema`] and [`read_namelist_file`].
//!
//! [`Constants`]: nml_core::Constants

pub mod load;
pub mod model;
pub mod normalize;
pub mod reader;
pub mod types;
pub mod validate;

pub use load::{load_schema, yaml_to_json_value};
pub use model::{NamelistSchema, Property};
pub use normalize::{ArrayDefault, Bound, Bounds, DefaultOrder, DefaultSpec, EnumSpec, ExampleValue, Padding};
pub use reader::{parse_namelist, read_namelist_file, NamelistGroup};
pub use types::{resolve_type, Dim, LenExpr, ScalarType, ShapeMode, TypeDescriptor, MAX_RANK};
pub use validate::validate_namelist;
