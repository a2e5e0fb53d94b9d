//! # Fortran Identifiers
//!
//! Every name that ends up inside generated Fortran source (namelist
//! names, property names, dimension/length constants, kind names, module
//! names) is gated by a single identifier pattern.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::SchemaError;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

/// Whether `s` is a valid Fortran identifier.
pub fn is_identifier(s: &str) -> bool {
    IDENTIFIER.is_match(s)
}

/// Check that `s` is a valid Fortran identifier, naming `what` in the error.
pub fn check_identifier(s: &str, what: &str) -> Result<(), SchemaError> {
    if is_identifier(s) {
        Ok(())
    } else {
        Err(SchemaError::new(format!(
            "{what} '{s}' is not a valid Fortran identifier"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_fortran_names() {
        for name in ["a", "count", "max_layers", "X1_y2", "nml_helper"] {
            assert!(is_identifier(name), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_non_identifiers() {
        for name in ["", "1abc", "_x", "a-b", "a b", ":", "ä"] {
            assert!(!is_identifier(name), "{name:?} should be invalid");
        }
    }

    #[test]
    fn check_identifier_names_the_context() {
        let err = check_identifier("3d", "dimension constant").unwrap_err();
        assert_eq!(
            err.message(),
            "dimension constant '3d' is not a valid Fortran identifier"
        );
    }
}
