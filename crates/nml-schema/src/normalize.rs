//! # Default, Enum and Bounds Normalization
//!
//! Converts the raw `default`, `enum`, `minimum`/`maximum` and `examples`
//! keywords of one property into typed values checked against the
//! property's resolved element type.
//!
//! ## Array defaults
//!
//! Two forms are kept distinct because they produce different Fortran:
//!
//! - `items.default: v` (or a scalar `default` with
//!   `x-fortran-default-repeat` and no pad) is a [`DefaultSpec::Broadcast`]:
//!   one scalar parameter assigned to the whole array.
//! - `default: [..]` is a [`DefaultSpec::Array`]: a literal list that may be
//!   reshaped, padded (`x-fortran-default-pad`), cycled
//!   (`x-fortran-default-repeat`) and read in row-major order
//!   (`x-fortran-default-order: C`).

use nml_core::{ScalarCategory, ScalarValue, SchemaError};
use serde_json::{Map, Value};

use crate::types::{ScalarType, TypeDescriptor};

/// Convert one JSON value to a literal of the element type.
///
/// `what` names the value in error messages ("default", "enum value", ...).
pub fn normalize_scalar(value: &Value, ty: &ScalarType, what: &str) -> Result<ScalarValue, SchemaError> {
    let mismatch = || SchemaError::new(format!("{what} must be {}, got {value}", expected(ty.category)));
    match ty.category {
        ScalarCategory::Integer => match value {
            Value::Number(n) => n.as_i64().map(ScalarValue::Integer).ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        ScalarCategory::Real => match value {
            Value::Number(n) => match n.as_f64() {
                Some(v) if v.is_finite() => Ok(ScalarValue::Real(v)),
                _ => Err(SchemaError::new(format!("{what} must be a finite number, got {n}"))),
            },
            _ => Err(mismatch()),
        },
        ScalarCategory::Boolean => match value {
            Value::Bool(b) => Ok(ScalarValue::Boolean(*b)),
            _ => Err(mismatch()),
        },
        ScalarCategory::String => match value {
            Value::String(s) => {
                if !s.is_ascii() {
                    return Err(SchemaError::new(format!("{what} '{s}' must be ASCII")));
                }
                if let Some(len) = &ty.len {
                    let n = s.len() as u64;
                    if n > len.value() {
                        return Err(SchemaError::new(format!(
                            "{what} '{s}' exceeds x-fortran-len ({n} > {})",
                            len.value()
                        )));
                    }
                }
                Ok(ScalarValue::String(s.clone()))
            }
            _ => Err(mismatch()),
        },
    }
}

fn expected(category: ScalarCategory) -> &'static str {
    match category {
        ScalarCategory::Integer => "an integer",
        ScalarCategory::Real => "a number",
        ScalarCategory::String => "a string",
        ScalarCategory::Boolean => "a boolean",
    }
}

// ---------------------------------------------------------------------------
// Enum
// ---------------------------------------------------------------------------

/// Allowed values of an integer or string field.
///
/// String members keep their declared spelling; membership ignores
/// trailing blanks.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSpec {
    values: Vec<ScalarValue>,
}

impl EnumSpec {
    /// Parse an `enum` keyword for elements of type `ty`.
    pub fn parse(raw: &Value, ty: &ScalarType) -> Result<Self, SchemaError> {
        if !ty.category.supports_enum() {
            return Err(SchemaError::new(format!(
                "enum is only supported for integer and string, not {}",
                ty.category
            )));
        }
        let items = raw
            .as_array()
            .ok_or_else(|| SchemaError::new("enum must be a list"))?;
        if items.is_empty() {
            return Err(SchemaError::new("enum must not be empty"));
        }
        let mut values: Vec<ScalarValue> = Vec::with_capacity(items.len());
        for item in items {
            let v = normalize_scalar(item, ty, "enum value")?;
            if values.iter().any(|existing| existing.matches(&v)) {
                return Err(SchemaError::new(format!("duplicate enum value {v}")));
            }
            values.push(v);
        }
        Ok(Self { values })
    }

    /// Members in declaration order.
    pub fn values(&self) -> &[ScalarValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First declared member, used as a template fallback.
    pub fn first(&self) -> Option<&ScalarValue> {
        self.values.first()
    }

    pub fn contains(&self, value: &ScalarValue) -> bool {
        self.values.iter().any(|v| v.matches(value))
    }
}

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// One end of a numeric range.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    pub value: ScalarValue,
    pub exclusive: bool,
}

/// `minimum`/`exclusiveMinimum` and `maximum`/`exclusiveMaximum`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    pub min: Option<Bound>,
    pub max: Option<Bound>,
}

impl Bounds {
    /// Read bounds from `obj`; `None` when no bound keyword is present.
    pub fn parse(obj: &Map<String, Value>, ty: &ScalarType) -> Result<Option<Self>, SchemaError> {
        let min = pick_bound(obj, "minimum", "exclusiveMinimum", ty)?;
        let max = pick_bound(obj, "maximum", "exclusiveMaximum", ty)?;
        if min.is_none() && max.is_none() {
            return Ok(None);
        }
        if let (Some(lo), Some(hi)) = (&min, &max) {
            let (a, b) = (bound_f64(lo), bound_f64(hi));
            let ordered = if lo.exclusive || hi.exclusive { a < b } else { a <= b };
            if !ordered {
                return Err(SchemaError::new(format!(
                    "minimum {} is not compatible with maximum {}",
                    lo.value, hi.value
                )));
            }
        }
        Ok(Some(Self { min, max }))
    }

    /// Whether `value` lies inside the range. Non-numeric values pass.
    pub fn check(&self, value: &ScalarValue) -> bool {
        let Some(v) = value.as_f64() else {
            return true;
        };
        let lower = self.min.as_ref().map_or(true, |b| {
            let m = bound_f64(b);
            if b.exclusive {
                v > m
            } else {
                v >= m
            }
        });
        let upper = self.max.as_ref().map_or(true, |b| {
            let m = bound_f64(b);
            if b.exclusive {
                v < m
            } else {
                v <= m
            }
        });
        lower && upper
    }

    /// `">= 0.0"` or `"> 0.0"`.
    pub fn describe_min(&self) -> Option<String> {
        self.min
            .as_ref()
            .map(|b| format!("{} {}", if b.exclusive { ">" } else { ">=" }, b.value))
    }

    /// `"<= 1.0"` or `"< 1.0"`.
    pub fn describe_max(&self) -> Option<String> {
        self.max
            .as_ref()
            .map(|b| format!("{} {}", if b.exclusive { "<" } else { "<=" }, b.value))
    }

    /// Both ends joined with "and", e.g. `">= 0 and < 10"`.
    pub fn describe(&self) -> String {
        [self.describe_min(), self.describe_max()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" and ")
    }
}

fn bound_f64(bound: &Bound) -> f64 {
    bound.value.as_f64().unwrap_or(f64::NAN)
}

fn pick_bound(
    obj: &Map<String, Value>,
    inclusive_key: &str,
    exclusive_key: &str,
    ty: &ScalarType,
) -> Result<Option<Bound>, SchemaError> {
    let (raw, exclusive, key) = match (obj.get(inclusive_key), obj.get(exclusive_key)) {
        (Some(_), Some(_)) => {
            return Err(SchemaError::new(format!(
                "{inclusive_key} and {exclusive_key} are mutually exclusive"
            )))
        }
        (Some(v), None) => (v, false, inclusive_key),
        (None, Some(v)) => (v, true, exclusive_key),
        (None, None) => return Ok(None),
    };
    if !ty.category.is_numeric() {
        return Err(SchemaError::new(format!(
            "{key} is only supported for integer and number, not {}",
            ty.category
        )));
    }
    let value = normalize_scalar(raw, ty, key)?;
    Ok(Some(Bound { value, exclusive }))
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Storage order of a list default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultOrder {
    /// Column-major: first index varies fastest.
    #[default]
    Fortran,
    /// Row-major: last index varies fastest.
    C,
}

/// Fill values for slots a list default does not cover.
#[derive(Debug, Clone, PartialEq)]
pub enum Padding {
    None,
    /// Cycle the default list itself.
    Repeat,
    /// One scalar fill value.
    Scalar(ScalarValue),
    /// A fill list, cycled as needed.
    List(Vec<ScalarValue>),
}

/// A literal list default for an array property.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayDefault {
    pub values: Vec<ScalarValue>,
    pub padding: Padding,
    pub order: DefaultOrder,
}

impl ArrayDefault {
    /// Axis permutation for the reshape call: `[rank, .., 1]` for
    /// row-major defaults of rank > 1.
    pub fn order_values(&self, rank: usize) -> Option<Vec<usize>> {
        (self.order == DefaultOrder::C && rank > 1).then(|| (1..=rank).rev().collect())
    }

    /// Whether the list must be reshaped rather than assigned directly.
    pub fn needs_reshape(&self, rank: usize, total: u64) -> bool {
        rank > 1 || (self.values.len() as u64) < total
    }

    /// Pad values in use, if any.
    pub fn pad_values(&self) -> &[ScalarValue] {
        match &self.padding {
            Padding::None => &[],
            Padding::Repeat => &self.values,
            Padding::Scalar(v) => std::slice::from_ref(v),
            Padding::List(vs) => vs,
        }
    }

    /// Every element of the initialized array, in column-major order.
    pub fn expand(&self, extents: &[u64]) -> Vec<ScalarValue> {
        let total: usize = extents.iter().map(|&e| e as usize).product();
        let pad = self.pad_values();
        let source: Vec<&ScalarValue> = self
            .values
            .iter()
            .chain(pad.iter().cycle())
            .take(total)
            .collect();

        if self.order_values(extents.len()).is_none() || source.len() < total {
            return source.into_iter().cloned().collect();
        }

        let mut out = source.clone();
        for (k, value) in source.into_iter().enumerate() {
            out[row_major_to_column_major(k, extents)] = value;
        }
        out.into_iter().cloned().collect()
    }
}

/// Linear column-major position of the `k`-th element in row-major order.
fn row_major_to_column_major(k: usize, extents: &[u64]) -> usize {
    let mut rem = k;
    let mut index = vec![0usize; extents.len()];
    for (axis, &extent) in extents.iter().enumerate().rev() {
        let e = extent as usize;
        index[axis] = rem % e;
        rem /= e;
    }
    let mut linear = 0usize;
    let mut stride = 1usize;
    for (axis, &extent) in extents.iter().enumerate() {
        linear += index[axis] * stride;
        stride *= extent as usize;
    }
    linear
}

/// Normalized default of one property.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultSpec {
    None,
    /// Scalar property default.
    Scalar(ScalarValue),
    /// One value assigned to every element of an array.
    Broadcast(ScalarValue),
    /// Literal list, possibly reshaped.
    Array(ArrayDefault),
}

impl DefaultSpec {
    pub fn is_some(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Every distinct literal that can end up in the field: default values
    /// plus pad values.
    pub fn literals(&self) -> Vec<&ScalarValue> {
        match self {
            Self::None => Vec::new(),
            Self::Scalar(v) | Self::Broadcast(v) => vec![v],
            Self::Array(a) => {
                let mut all: Vec<&ScalarValue> = a.values.iter().collect();
                if !matches!(a.padding, Padding::Repeat) {
                    all.extend(a.pad_values());
                }
                all
            }
        }
    }
}

const ORDER_KEY: &str = "x-fortran-default-order";
const REPEAT_KEY: &str = "x-fortran-default-repeat";
const PAD_KEY: &str = "x-fortran-default-pad";

/// Normalize the default of a property whose type is already resolved.
pub fn normalize_default(obj: &Map<String, Value>, ty: &TypeDescriptor) -> Result<DefaultSpec, SchemaError> {
    let element = ty.element();
    let has_options = [ORDER_KEY, REPEAT_KEY, PAD_KEY].iter().any(|k| obj.contains_key(*k));

    let TypeDescriptor::Array { .. } = ty else {
        if has_options {
            return Err(SchemaError::new(
                "x-fortran-default-order/repeat/pad are only valid on array properties",
            ));
        }
        return match obj.get("default") {
            None => Ok(DefaultSpec::None),
            Some(v) => Ok(DefaultSpec::Scalar(normalize_scalar(v, element, "default")?)),
        };
    };

    let items_default = obj
        .get("items")
        .and_then(Value::as_object)
        .and_then(|items| items.get("default"));
    let prop_default = obj.get("default");

    let order = match obj.get(ORDER_KEY) {
        None => DefaultOrder::Fortran,
        Some(Value::String(s)) if s == "F" => DefaultOrder::Fortran,
        Some(Value::String(s)) if s == "C" => DefaultOrder::C,
        Some(other) => {
            return Err(SchemaError::new(format!("{ORDER_KEY} must be \"F\" or \"C\", got {other}")))
        }
    };
    let repeat = match obj.get(REPEAT_KEY) {
        None => false,
        Some(Value::Bool(b)) => *b,
        Some(other) => return Err(SchemaError::new(format!("{REPEAT_KEY} must be a boolean, got {other}"))),
    };
    let pad_raw = obj.get(PAD_KEY);

    if let Some(item) = items_default {
        if prop_default.is_some() {
            return Err(SchemaError::new("set either default or items.default, not both"));
        }
        if has_options {
            return Err(SchemaError::new(
                "items.default cannot be combined with x-fortran-default-order/repeat/pad",
            ));
        }
        if item.is_array() {
            return Err(SchemaError::new("items.default must be a scalar"));
        }
        return Ok(DefaultSpec::Broadcast(normalize_scalar(item, element, "items.default")?));
    }

    let Some(raw) = prop_default else {
        if pad_raw.is_some() {
            return Err(SchemaError::new(format!("{PAD_KEY} requires a default")));
        }
        if repeat {
            return Err(SchemaError::new(format!("{REPEAT_KEY} requires a default")));
        }
        return Ok(DefaultSpec::None);
    };

    if repeat && pad_raw.is_some() {
        return Err(SchemaError::new(format!("{REPEAT_KEY} and {PAD_KEY} are mutually exclusive")));
    }

    let values = match raw {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(SchemaError::new("default must not be an empty list"));
            }
            if items.iter().any(Value::is_array) {
                return Err(SchemaError::new(
                    "default must be a flat list; nested lists are not supported",
                ));
            }
            items
                .iter()
                .map(|v| normalize_scalar(v, element, "default"))
                .collect::<Result<Vec<_>, _>>()?
        }
        scalar => {
            let value = normalize_scalar(scalar, element, "default")?;
            if repeat {
                return Ok(DefaultSpec::Broadcast(value));
            }
            vec![value]
        }
    };

    let padding = match pad_raw {
        None if repeat => Padding::Repeat,
        None => Padding::None,
        Some(Value::Array(items)) => {
            if items.is_empty() || items.iter().any(Value::is_array) {
                return Err(SchemaError::new(format!("{PAD_KEY} must be a scalar or a non-empty flat list")));
            }
            Padding::List(
                items
                    .iter()
                    .map(|v| normalize_scalar(v, element, PAD_KEY))
                    .collect::<Result<Vec<_>, _>>()?,
            )
        }
        Some(v) => Padding::Scalar(normalize_scalar(v, element, PAD_KEY)?),
    };

    let total = ty
        .total_size()
        .ok_or_else(|| SchemaError::new("array default requires a fully declared shape"))?;
    let count = values.len() as u64;
    if count > total {
        return Err(SchemaError::new(format!(
            "default has {count} values but the declared shape holds only {total}"
        )));
    }
    if count < total && padding == Padding::None {
        return Err(SchemaError::new(format!(
            "default has {count} values, shorter than declared shape ({total} elements); \
             set {PAD_KEY} or {REPEAT_KEY}"
        )));
    }

    Ok(DefaultSpec::Array(ArrayDefault { values, padding, order }))
}

// ---------------------------------------------------------------------------
// Examples
// ---------------------------------------------------------------------------

/// One `examples` entry.
#[derive(Debug, Clone, PartialEq)]
pub enum ExampleValue {
    Scalar(ScalarValue),
    /// Array example, in column-major order.
    List(Vec<ScalarValue>),
}

impl ExampleValue {
    pub fn values(&self) -> Vec<&ScalarValue> {
        match self {
            Self::Scalar(v) => vec![v],
            Self::List(vs) => vs.iter().collect(),
        }
    }
}

/// Normalize the `examples` keyword.
pub fn normalize_examples(obj: &Map<String, Value>, ty: &TypeDescriptor) -> Result<Vec<ExampleValue>, SchemaError> {
    let Some(raw) = obj.get("examples") else {
        return Ok(Vec::new());
    };
    let entries = raw
        .as_array()
        .ok_or_else(|| SchemaError::new("examples must be a list"))?;
    let element = ty.element();
    entries
        .iter()
        .map(|entry| match entry {
            Value::Array(items) if ty.is_array() => {
                if items.iter().any(Value::is_array) {
                    return Err(SchemaError::new("array examples must be flat lists"));
                }
                let values = items
                    .iter()
                    .map(|v| normalize_scalar(v, element, "example"))
                    .collect::<Result<Vec<_>, _>>()?;
                if let Some(total) = ty.total_size() {
                    if values.len() as u64 > total {
                        return Err(SchemaError::new(format!(
                            "example has {} values but the declared shape holds only {total}",
                            values.len()
                        )));
                    }
                }
                Ok(ExampleValue::List(values))
            }
            Value::Array(_) => Err(SchemaError::new("examples of a scalar property must be scalars")),
            v => Ok(ExampleValue::Scalar(normalize_scalar(v, element, "example")?)),
        })
        .collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Expanding a padded default always yields exactly the declared
        /// element count, and the leading values survive in F order.
        #[test]
        fn expansion_fills_declared_size(
            extents in proptest::collection::vec(1u64..4, 1..4),
            len in 1usize..6,
        ) {
            let total: usize = extents.iter().map(|&e| e as usize).product();
            let len = len.min(total);
            let values: Vec<ScalarValue> = (0..len as i64).map(ScalarValue::Integer).collect();
            let a = ArrayDefault {
                values: values.clone(),
                padding: Padding::Scalar(ScalarValue::Integer(-1)),
                order: DefaultOrder::Fortran,
            };
            let out = a.expand(&extents);
            prop_assert_eq!(out.len(), total);
            prop_assert_eq!(&out[..len], &values[..]);
        }

        /// Row-major expansion is a permutation of column-major expansion.
        #[test]
        fn c_order_is_a_permutation(extents in proptest::collection::vec(1u64..4, 2..4)) {
            let total: usize = extents.iter().map(|&e| e as usize).product();
            let values: Vec<ScalarValue> = (0..total as i64).map(ScalarValue::Integer).collect();
            let a = ArrayDefault { values, padding: Padding::None, order: DefaultOrder::C };
            let mut seen: Vec<String> = a.expand(&extents).iter().map(ToString::to_string).collect();
            seen.sort();
            let mut expected: Vec<String> = (0..total).map(|i| i.to_string()).collect();
            expected.sort();
            prop_assert_eq!(seen, expected);
        }
    }
}
