//! # Type Resolver
//!
//! Turns one schema property into a [`TypeDescriptor`]: either a scalar or
//! a single array node whose dimensions come from `x-fortran-shape`.
//! Named dimension and length tokens are resolved against the constant
//! table; the descriptor keeps both the token (for generated source) and
//! its value (for size checks).
//!
//! Arrays of arrays are rejected. Multi-dimensionality is expressed with a
//! multi-valued `x-fortran-shape` on one array node, listed in Fortran
//! dimension order.

use nml_core::{check_identifier, is_identifier, Constants, NmlResult, ScalarCategory, SchemaError};
use serde_json::{Map, Value};

/// Maximum array rank accepted by Fortran 2008.
pub const MAX_RANK: usize = 15;

/// Where deferred (`":"`) dimensions are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeMode {
    /// Code generation: every dimension must have a known extent.
    Declared,
    /// Namelist validation: `":"` leaves an axis unconstrained.
    Validation,
}

/// One array dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dim {
    /// Integer literal extent.
    Literal(u64),
    /// Named constant and its resolved extent.
    Named { name: String, value: u64 },
    /// Assumed extent, validation only.
    Deferred,
}

impl Dim {
    /// Expression written into Fortran source.
    pub fn expr(&self) -> String {
        match self {
            Self::Literal(n) => n.to_string(),
            Self::Named { name, .. } => name.clone(),
            Self::Deferred => ":".to_string(),
        }
    }

    /// Resolved extent, `None` when deferred.
    pub fn extent(&self) -> Option<u64> {
        match self {
            Self::Literal(n) => Some(*n),
            Self::Named { value, .. } => Some(*value),
            Self::Deferred => None,
        }
    }

    /// Constant name, if the dimension is named.
    pub fn constant(&self) -> Option<&str> {
        match self {
            Self::Named { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// String length expression from `x-fortran-len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LenExpr {
    Literal(u64),
    Named { name: String, value: u64 },
}

impl LenExpr {
    /// Expression written into Fortran source.
    pub fn expr(&self) -> String {
        match self {
            Self::Literal(n) => n.to_string(),
            Self::Named { name, .. } => name.clone(),
        }
    }

    /// Resolved length.
    pub fn value(&self) -> u64 {
        match self {
            Self::Literal(n) => *n,
            Self::Named { value, .. } => *value,
        }
    }

    /// Constant name, if the length is named.
    pub fn constant(&self) -> Option<&str> {
        match self {
            Self::Named { name, .. } => Some(name),
            Self::Literal(_) => None,
        }
    }
}

/// A resolved scalar (or array element) type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarType {
    pub category: ScalarCategory,
    pub kind: Option<String>,
    pub len: Option<LenExpr>,
}

impl ScalarType {
    /// Declaration type, e.g. `integer(i4)`, `character(len=8)`.
    pub fn type_spec(&self) -> String {
        match self.category {
            ScalarCategory::Integer => with_kind("integer", self.kind.as_deref()),
            ScalarCategory::Real => with_kind("real", self.kind.as_deref()),
            ScalarCategory::Boolean => "logical".to_string(),
            ScalarCategory::String => match &self.len {
                Some(len) => format!("character(len={})", len.expr()),
                None => "character(len=*)".to_string(),
            },
        }
    }

    /// Dummy-argument type: strings are passed assumed-length.
    pub fn arg_type_spec(&self) -> String {
        match self.category {
            ScalarCategory::String => "character(len=*)".to_string(),
            _ => self.type_spec(),
        }
    }
}

fn with_kind(base: &str, kind: Option<&str>) -> String {
    match kind {
        Some(k) => format!("{base}({k})"),
        None => base.to_string(),
    }
}

/// Fully resolved type of one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    Scalar(ScalarType),
    Array { element: ScalarType, dims: Vec<Dim> },
}

impl TypeDescriptor {
    /// Element type (the scalar itself for scalar properties).
    pub fn element(&self) -> &ScalarType {
        match self {
            Self::Scalar(s) => s,
            Self::Array { element, .. } => element,
        }
    }

    /// `"array"` for arrays, otherwise the element category name.
    pub fn category_name(&self) -> String {
        match self {
            Self::Scalar(s) => s.category.to_string(),
            Self::Array { .. } => "array".to_string(),
        }
    }

    /// Element category; never "array".
    pub fn element_category(&self) -> ScalarCategory {
        self.element().category
    }

    pub fn kind(&self) -> Option<&str> {
        self.element().kind.as_deref()
    }

    pub fn length_expr(&self) -> Option<&LenExpr> {
        self.element().len.as_ref()
    }

    pub fn type_spec(&self) -> String {
        self.element().type_spec()
    }

    pub fn arg_type_spec(&self) -> String {
        self.element().arg_type_spec()
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array { .. })
    }

    /// Dimensions in Fortran order; empty for scalars.
    pub fn dims(&self) -> &[Dim] {
        match self {
            Self::Scalar(_) => &[],
            Self::Array { dims, .. } => dims,
        }
    }

    /// Dimension expressions in Fortran order.
    pub fn dimensions(&self) -> Vec<String> {
        self.dims().iter().map(Dim::expr).collect()
    }

    pub fn rank(&self) -> usize {
        self.dims().len()
    }

    /// Resolved extents, `None` if any axis is deferred.
    pub fn extents(&self) -> Option<Vec<u64>> {
        self.dims().iter().map(Dim::extent).collect()
    }

    /// Total element count (1 for scalars), `None` if any axis is deferred.
    pub fn total_size(&self) -> Option<u64> {
        self.extents().map(|e| e.iter().product())
    }

    /// Full declaration type, e.g. `integer(i4), dimension(3, max_layers)`.
    pub fn declaration(&self) -> String {
        match self {
            Self::Scalar(s) => s.type_spec(),
            Self::Array { element, .. } => {
                format!("{}, dimension({})", element.type_spec(), self.dimensions().join(", "))
            }
        }
    }

    /// Named constants referenced by dimensions or string length.
    pub fn constants(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.dims().iter().filter_map(Dim::constant).collect();
        if let Some(name) = self.length_expr().and_then(LenExpr::constant) {
            names.push(name);
        }
        names
    }
}

/// Resolve one property schema against `constants`.
///
/// # Errors
///
/// `SchemaError` for unknown types, missing `items`, nested arrays, bad
/// kinds, lengths or shapes. `ConfigError` when a named dimension or
/// length does not resolve to a positive integer constant.
pub fn resolve_type(prop: &Value, constants: &Constants, mode: ShapeMode) -> NmlResult<TypeDescriptor> {
    let obj = as_mapping(prop, "property schema")?;
    let type_name = schema_type(obj)?;

    if type_name != "array" {
        if obj.contains_key("x-fortran-shape") {
            return Err(SchemaError::new("x-fortran-shape is only valid on array properties").into());
        }
        return Ok(TypeDescriptor::Scalar(resolve_scalar(obj, type_name, constants)?));
    }

    let items = obj
        .get("items")
        .ok_or_else(|| SchemaError::new("array property requires 'items'"))?;
    let items = as_mapping(items, "items")?;
    let item_type = schema_type(items)?;
    if item_type == "array" {
        return Err(SchemaError::new(
            "nested array properties are not supported; list every dimension in x-fortran-shape",
        )
        .into());
    }
    if items.contains_key("x-fortran-shape") {
        return Err(SchemaError::new("x-fortran-shape must be set on the array property, not on items").into());
    }

    let dims = resolve_shape(obj.get("x-fortran-shape"), constants, mode)?;
    let element = resolve_scalar(items, item_type, constants)?;
    Ok(TypeDescriptor::Array { element, dims })
}

/// Parse `x-fortran-flex-tail-dims` for a property of the given rank.
pub fn flex_tail_dims(obj: &Map<String, Value>, rank: usize) -> Result<usize, SchemaError> {
    let Some(raw) = obj.get("x-fortran-flex-tail-dims") else {
        return Ok(0);
    };
    let k = raw
        .as_u64()
        .ok_or_else(|| SchemaError::new("x-fortran-flex-tail-dims must be a non-negative integer"))?;
    if rank == 0 && k > 0 {
        return Err(SchemaError::new("x-fortran-flex-tail-dims is only valid on array properties"));
    }
    let k = usize::try_from(k).unwrap_or(usize::MAX);
    if k > rank {
        return Err(SchemaError::new(format!(
            "x-fortran-flex-tail-dims ({k}) exceeds array rank ({rank})"
        )));
    }
    Ok(k)
}

fn as_mapping<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>, SchemaError> {
    value
        .as_object()
        .ok_or_else(|| SchemaError::new(format!("{what} must be a mapping")))
}

fn schema_type(obj: &Map<String, Value>) -> Result<&str, SchemaError> {
    match obj.get("type") {
        Some(Value::String(t)) => Ok(t),
        Some(other) => Err(SchemaError::new(format!("'type' must be a string, got {other}"))),
        None => Err(SchemaError::new("missing 'type'")),
    }
}

fn resolve_scalar(obj: &Map<String, Value>, type_name: &str, constants: &Constants) -> NmlResult<ScalarType> {
    let category = ScalarCategory::from_schema_type(type_name)
        .ok_or_else(|| SchemaError::new(format!("unknown type '{type_name}'")))?;

    let kind = match obj.get("x-fortran-kind") {
        None => None,
        Some(_) if !category.is_numeric() => {
            return Err(SchemaError::new(format!(
                "x-fortran-kind is only supported for integer and number, not {type_name}"
            ))
            .into())
        }
        Some(Value::String(k)) if !k.trim().is_empty() => {
            let k = k.trim();
            check_identifier(k, "kind")?;
            Some(k.to_string())
        }
        Some(_) => return Err(SchemaError::new("x-fortran-kind must be a non-empty identifier").into()),
    };

    let len = match (category, obj.get("x-fortran-len")) {
        (ScalarCategory::String, None) => {
            return Err(SchemaError::new("string property requires x-fortran-len").into())
        }
        (ScalarCategory::String, Some(raw)) => Some(resolve_len(raw, constants)?),
        (_, Some(_)) => {
            return Err(SchemaError::new("x-fortran-len is only valid for string properties").into())
        }
        (_, None) => None,
    };

    Ok(ScalarType { category, kind, len })
}

fn resolve_len(raw: &Value, constants: &Constants) -> NmlResult<LenExpr> {
    match raw {
        Value::Number(n) => match n.as_u64() {
            Some(v) if v > 0 => Ok(LenExpr::Literal(v)),
            _ => Err(SchemaError::new(format!("x-fortran-len must be a positive integer, got {n}")).into()),
        },
        Value::String(s) => {
            let s = s.trim();
            if let Ok(v) = s.parse::<u64>() {
                if v > 0 {
                    return Ok(LenExpr::Literal(v));
                }
                return Err(SchemaError::new(format!("x-fortran-len must be positive, got {v}")).into());
            }
            check_identifier(s, "length constant")?;
            let value = constants.resolve_positive(s, "length constant")?;
            Ok(LenExpr::Named {
                name: s.to_string(),
                value,
            })
        }
        other => Err(SchemaError::new(format!(
            "x-fortran-len must be an integer or a constant name, got {other}"
        ))
        .into()),
    }
}

fn resolve_shape(raw: Option<&Value>, constants: &Constants, mode: ShapeMode) -> NmlResult<Vec<Dim>> {
    let raw = raw.ok_or_else(|| SchemaError::new("array property requires x-fortran-shape"))?;
    let tokens: Vec<&Value> = match raw {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    if tokens.is_empty() {
        return Err(SchemaError::new("x-fortran-shape must not be empty").into());
    }
    if tokens.len() > MAX_RANK {
        return Err(SchemaError::new(format!(
            "x-fortran-shape has {} dimensions; at most {MAX_RANK} are supported",
            tokens.len()
        ))
        .into());
    }
    tokens
        .into_iter()
        .map(|token| resolve_dim(token, constants, mode))
        .collect()
}

fn resolve_dim(token: &Value, constants: &Constants, mode: ShapeMode) -> NmlResult<Dim> {
    match token {
        Value::Number(n) => match n.as_u64() {
            Some(v) if v > 0 => Ok(Dim::Literal(v)),
            _ => Err(SchemaError::new(format!("x-fortran-shape entries must be positive integers, got {n}")).into()),
        },
        Value::String(s) => {
            let s = s.trim();
            if s == ":" {
                return match mode {
                    ShapeMode::Validation => Ok(Dim::Deferred),
                    ShapeMode::Declared => Err(SchemaError::new(
                        "deferred dimension ':' is not supported for generated fields",
                    )
                    .into()),
                };
            }
            if let Ok(v) = s.parse::<u64>() {
                if v > 0 {
                    return Ok(Dim::Literal(v));
                }
            }
            if !is_identifier(s) {
                return Err(SchemaError::new(format!("invalid x-fortran-shape entry '{s}'")).into());
            }
            let value = constants.resolve_positive(s, "dimension constant")?;
            Ok(Dim::Named {
                name: s.to_string(),
                value,
            })
        }
        other => Err(SchemaError::new(format!(
            "x-fortran-shape entries must be integers or constant names, got {other}"
        ))
        .into()),
    }
}
