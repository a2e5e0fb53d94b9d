//! # nml-core — Foundational Types for nml-tools
//!
//! This crate is the leaf of the nml-tools workspace. It defines the pieces
//! every other crate shares:
//!
//! 1. **Error taxonomy.** [`SchemaError`], [`ConfigError`] and
//!    [`ValidationError`] carry an optional property tag that is attached
//!    at most once; [`NmlError`] aggregates them with IO, parse and render
//!    failures.
//!
//! 2. **Identifier rules.** A single pattern gates every token that is
//!    written into generated Fortran source.
//!
//! 3. **Named constants.** The [`Constants`] table resolves dimension and
//!    length tokens to positive integers.
//!
//! 4. **Literals.** [`ScalarValue`] renders Fortran source literals (with
//!    kind suffix) and namelist input literals.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `nml-*` crates.
//! - No `unsafe` code.
//! - No I/O.

pub mod constants;
pub mod error;
pub mod ident;
pub mod value;

pub use constants::{ConstantValue, Constants};
pub use error::{ConfigError, NmlError, NmlResult, SchemaError, ValidationError};
pub use ident::{check_identifier, is_identifier};
pub use value::{format_real, quote_string, ScalarCategory, ScalarValue};
