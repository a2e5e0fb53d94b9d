//! # Scalar Values and Literals
//!
//! Normalized scalar values and their Fortran source / namelist text
//! representations. Output is always plain ASCII.

use std::fmt;

use serde::Serialize;

/// Element category of a resolved field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarCategory {
    /// Fortran `integer`, JSON-Schema `integer`.
    Integer,
    /// Fortran `real`, JSON-Schema `number`.
    Real,
    /// Fortran `character(len=...)`.
    String,
    /// Fortran `logical`.
    Boolean,
}

impl ScalarCategory {
    /// Parse a JSON-Schema `type` keyword for a scalar.
    pub fn from_schema_type(t: &str) -> Option<Self> {
        match t {
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Real),
            "string" => Some(Self::String),
            "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    /// Whether `minimum`/`maximum` apply to this category.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Real)
    }

    /// Whether `enum` applies to this category.
    pub fn supports_enum(self) -> bool {
        matches!(self, Self::Integer | Self::String)
    }
}

impl fmt::Display for ScalarCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Integer => "integer",
            Self::Real => "real",
            Self::String => "string",
            Self::Boolean => "boolean",
        };
        f.write_str(s)
    }
}

/// A normalized scalar literal.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Integer(i64),
    Real(f64),
    String(String),
    Boolean(bool),
}

impl ScalarValue {
    /// Category of this value.
    pub fn category(&self) -> ScalarCategory {
        match self {
            Self::Integer(_) => ScalarCategory::Integer,
            Self::Real(_) => ScalarCategory::Real,
            Self::String(_) => ScalarCategory::String,
            Self::Boolean(_) => ScalarCategory::Boolean,
        }
    }

    /// Numeric view used for bounds checks.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Real(v) => Some(*v),
            _ => None,
        }
    }

    /// Fortran source literal, with `_kind` suffix for numeric kinds.
    pub fn fortran_literal(&self, kind: Option<&str>) -> String {
        match (self, kind) {
            (Self::Integer(v), Some(k)) => format!("{v}_{k}"),
            (Self::Integer(v), None) => v.to_string(),
            (Self::Real(v), Some(k)) => format!("{}_{k}", format_real(*v)),
            (Self::Real(v), None) => format_real(*v),
            (Self::String(s), _) => quote_string(s),
            (Self::Boolean(b), _) => logical_literal(*b).to_string(),
        }
    }

    /// Namelist input literal (no kind suffix).
    pub fn namelist_literal(&self) -> String {
        self.fortran_literal(None)
    }

    /// Value equality with Fortran blank-padding semantics for strings.
    pub fn matches(&self, other: &ScalarValue) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a.trim_end() == b.trim_end(),
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Real(a), Self::Real(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.namelist_literal())
    }
}

/// Shortest round-trip decimal for `v`, always containing a decimal point
/// or an exponent. Callers reject non-finite values beforehand.
pub fn format_real(v: f64) -> String {
    let mut s = format!("{v:?}");
    if !s.contains(['.', 'e', 'E']) {
        s.push_str(".0");
    }
    s
}

/// Single-quoted Fortran string with embedded quotes doubled.
pub fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// `.true.` / `.false.`
pub fn logical_literal(b: bool) -> &'static str {
    if b {
        ".true."
    } else {
        ".false."
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Real literals round-trip and are recognisable as reals.
        #[test]
        fn real_literal_round_trips(v in any::<f64>().prop_filter("finite", |v| v.is_finite())) {
            let s = format_real(v);
            prop_assert!(s.contains('.') || s.contains('e'));
            let parsed: f64 = s.parse().unwrap();
            prop_assert_eq!(parsed, v);
        }

        /// Quoted strings never contain a lone quote.
        #[test]
        fn quoted_strings_are_balanced(s in "[a-zA-Z' ]{0,20}") {
            let q = quote_string(&s);
            let inner = &q[1..q.len() - 1];
            prop_assert_eq!(inner.replace("''", "").contains('\''), false);
        }
    }
}
