//! # Fortran Helper Module
//!
//! The companion module every generated namelist module imports from:
//! status codes, the `nml_file_t` reader (open / find group / close),
//! `to_lower`, `idx_check`, buffer lengths, and one public parameter per
//! configured constant.

use std::path::Path;

use nml_core::{format_real, is_identifier, ConfigError, ConstantValue, NmlResult};
use serde::Serialize;

use crate::output::write_output;
use crate::render::{render_with, Renderer, FORTRAN_HELPER};

/// Status codes returned by generated procedures, in value order.
pub const STATUS_CODES: &[(&str, &str)] = &[
    ("NML_OK", "success"),
    ("NML_ERR_FILE_NOT_FOUND", "namelist file does not exist"),
    ("NML_ERR_OPEN", "namelist file could not be opened"),
    ("NML_ERR_NOT_OPEN", "reader used before open"),
    ("NML_ERR_NML_NOT_FOUND", "namelist group not found in file"),
    ("NML_ERR_READ", "namelist read failed"),
    ("NML_ERR_CLOSE", "namelist file could not be closed"),
    ("NML_ERR_REQUIRED", "required field not set"),
    ("NML_ERR_ENUM", "value not in enum"),
    ("NML_ERR_BOUNDS", "value out of bounds"),
    ("NML_ERR_NOT_SET", "field or element not set"),
    ("NML_ERR_INVALID_NAME", "unknown field name"),
    ("NML_ERR_INVALID_INDEX", "index or shape does not fit the field"),
    ("NML_ERR_PARTLY_SET", "required array only partly set"),
];

/// Length of the line buffer used when scanning for a group.
pub const LINE_BUFFER: u32 = 1024;
/// Length of `iomsg` buffers.
pub const MAX_IOMSG_LEN: u32 = 512;

/// A config constant exported by the helper module.
#[derive(Debug, Clone, PartialEq)]
pub struct HelperConstant {
    pub name: String,
    pub value: ConstantValue,
    pub doc: Option<String>,
}

#[derive(Debug, Serialize)]
struct StatusContext {
    name: &'static str,
    value: usize,
    doc: &'static str,
}

#[derive(Debug, Serialize)]
struct ConstantContext {
    declaration: String,
    doc: Option<String>,
}

#[derive(Debug, Serialize)]
struct HelperContext {
    file_name: String,
    module: String,
    uses_real64: bool,
    status_codes: Vec<StatusContext>,
    line_buffer: u32,
    max_iomsg_len: u32,
    constants: Vec<ConstantContext>,
}

fn reserved(name: &str) -> bool {
    const FIXED: &[&str] = &[
        "nml_file_t", "nml_line_buffer", "max_iomsg_len", "to_lower", "idx_check", "real64",
        "iso_fortran_env",
    ];
    STATUS_CODES.iter().any(|(s, _)| s.eq_ignore_ascii_case(name))
        || FIXED.iter().any(|s| s.eq_ignore_ascii_case(name))
}

fn constant_context(c: &HelperConstant) -> Result<ConstantContext, ConfigError> {
    if !is_identifier(&c.name) {
        return Err(ConfigError::new(format!(
            "constant '{}' is not a valid Fortran identifier",
            c.name
        )));
    }
    if reserved(&c.name) {
        return Err(ConfigError::new(format!(
            "constant '{}' collides with a helper module symbol",
            c.name
        )));
    }
    let declaration = match c.value {
        ConstantValue::Integer(v) => format!("integer, parameter, public :: {} = {v}", c.name),
        ConstantValue::Real(v) if v.is_finite() => format!(
            "real(real64), parameter, public :: {} = {}_real64",
            c.name,
            format_real(v)
        ),
        ConstantValue::Real(_) => {
            return Err(ConfigError::new(format!("constant '{}' must be finite", c.name)));
        }
    };
    Ok(ConstantContext {
        declaration,
        doc: c.doc.as_deref().map(str::trim).filter(|d| !d.is_empty()).map(str::to_string),
    })
}

/// Render the helper module `module`.
///
/// # Errors
///
/// `ConfigError` for an invalid module name, invalid or colliding constant
/// names and non-finite reals; `NmlError::Render` if the backend fails.
pub fn generate_helper<R: Renderer + ?Sized>(
    module: &str,
    constants: &[HelperConstant],
    renderer: &R,
) -> NmlResult<String> {
    if !is_identifier(module) {
        return Err(ConfigError::new(format!(
            "helper module '{module}' is not a valid Fortran identifier"
        ))
        .into());
    }
    let context = HelperContext {
        file_name: format!("{module}.f90"),
        module: module.to_string(),
        uses_real64: constants
            .iter()
            .any(|c| matches!(c.value, ConstantValue::Real(_))),
        status_codes: STATUS_CODES
            .iter()
            .enumerate()
            .map(|(value, &(name, doc))| StatusContext { name, value, doc })
            .collect(),
        line_buffer: LINE_BUFFER,
        max_iomsg_len: MAX_IOMSG_LEN,
        constants: constants
            .iter()
            .map(constant_context)
            .collect::<Result<_, _>>()?,
    };
    let text = render_with(renderer, FORTRAN_HELPER, &context)?;
    tracing::debug!(module, constants = constants.len(), "generated helper module");
    Ok(text)
}

/// Render the helper module and write it to `path`.
pub fn write_helper<R: Renderer + ?Sized>(
    module: &str,
    constants: &[HelperConstant],
    path: &Path,
    renderer: &R,
) -> NmlResult<()> {
    let text = generate_helper(module, constants, renderer)?;
    write_output(path, &text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fortran::HELPER_IMPORTS;
    use crate::render::HandlebarsRenderer;
    use nml_core::NmlError;

    fn constant(name: &str, value: ConstantValue, doc: Option<&str>) -> HelperConstant {
        HelperConstant {
            name: name.to_string(),
            value,
            doc: doc.map(str::to_string),
        }
    }

    #[test]
    fn exports_every_imported_symbol() {
        let out = generate_helper("nml_helper", &[], &HandlebarsRenderer::new().unwrap()).unwrap();
        assert!(out.contains("module nml_helper"));
        for symbol in HELPER_IMPORTS {
            assert!(out.contains(symbol), "{symbol}");
        }
        assert!(out.contains("integer, parameter, public :: NML_OK = 0"));
        assert!(out.contains("integer, parameter, public :: NML_ERR_PARTLY_SET = 13"));
        assert!(!out.contains("iso_fortran_env"));
    }

    #[test]
    fn constants_become_parameters() {
        let out = generate_helper(
            "nml_helper",
            &[
                constant("max_layers", ConstantValue::Integer(3), Some("maximum number of layers")),
                constant("gravity", ConstantValue::Real(9.81), None),
            ],
            &HandlebarsRenderer::new().unwrap(),
        )
        .unwrap();
        assert!(out.contains("!> maximum number of layers"));
        assert!(out.contains("integer, parameter, public :: max_layers = 3"));
        assert!(out.contains("real(real64), parameter, public :: gravity = 9.81_real64"));
        assert!(out.contains("use, intrinsic :: iso_fortran_env, only: real64"));
    }

    #[test]
    fn colliding_constant_is_a_config_error() {
        let err = generate_helper(
            "nml_helper",
            &[constant("NML_OK", ConstantValue::Integer(1), None)],
            &HandlebarsRenderer::new().unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, NmlError::Config(_)));
    }

    #[test]
    fn invalid_module_name_is_rejected() {
        let err = generate_helper("1helper", &[], &HandlebarsRenderer::new().unwrap()).unwrap_err();
        assert!(err.to_string().contains("not a valid Fortran identifier"));
    }
}
