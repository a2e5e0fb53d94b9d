//! # Namelist Validation
//!
//! Checks an actual namelist value tree (as produced by
//! [`parse_namelist`](crate::reader::parse_namelist)) against a schema:
//! unknown keys, required presence, array rank and extents, and the
//! element-wise type, length, enum and bounds rules.
//!
//! Arrays are expected nested with the outermost list running over the last
//! Fortran index. A flat list is accepted for any rank as long as it does
//! not exceed the declared element count, and a scalar is accepted for an
//! array (it fills every element). Deferred `":"` dimensions are not
//! checked. Nested lists may be shorter than declared; missing positions
//! count as unset, the same as `null`. Arrays with
//! `x-fortran-flex-tail-dims` are the exception: only their trailing axes
//! may be short. A required array without flex tail dimensions must have
//! every element set.

use nml_core::{Constants, NmlResult, ScalarCategory, SchemaError, ValidationError};
use serde_json::{Map, Value};

use crate::normalize::{normalize_scalar, Bounds, EnumSpec};
use crate::types::{flex_tail_dims, resolve_type, ScalarType, ShapeMode, TypeDescriptor};

/// Element constraints re-derived from one property schema.
struct Constraints {
    ty: TypeDescriptor,
    enumeration: Option<EnumSpec>,
    bounds: Option<Bounds>,
    flex: usize,
    required: bool,
}

/// Validate `namelist` (one group's variables) against `schema`.
///
/// # Errors
///
/// The first `ValidationError` found, tagged with the property name, or a
/// `SchemaError`/`ConfigError` if the schema itself does not resolve.
pub fn validate_namelist(schema: &Value, namelist: &Map<String, Value>, constants: &Constants) -> NmlResult<()> {
    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| SchemaError::new("schema must define 'properties'"))?;

    let lookup = |key: &str| {
        properties
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
    };

    for key in namelist.keys() {
        if lookup(key).is_none() {
            return Err(ValidationError::for_property(key.clone(), "unknown property").into());
        }
    }

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            let present = namelist
                .iter()
                .any(|(k, v)| k.eq_ignore_ascii_case(name) && !v.is_null());
            if !present {
                return Err(ValidationError::for_property(name, "required property is missing").into());
            }
        }
    }

    let is_required = |name: &str| {
        schema
            .get("required")
            .and_then(Value::as_array)
            .is_some_and(|r| r.iter().filter_map(Value::as_str).any(|n| n.eq_ignore_ascii_case(name)))
    };

    for (key, value) in namelist {
        let Some((name, prop)) = lookup(key) else {
            continue;
        };
        let mut constraints = constraints(prop, constants).map_err(|e| e.with_property(name))?;
        constraints.required = is_required(name);
        check_value(value, &constraints).map_err(|e| e.with_property(name))?;
    }
    Ok(())
}

fn constraints(prop: &Value, constants: &Constants) -> NmlResult<Constraints> {
    let ty = resolve_type(prop, constants, ShapeMode::Validation)?;
    let obj = prop
        .as_object()
        .ok_or_else(|| SchemaError::new("property schema must be a mapping"))?;
    let source = match ty {
        TypeDescriptor::Array { .. } => obj.get("items").and_then(Value::as_object).unwrap_or(obj),
        TypeDescriptor::Scalar(_) => obj,
    };
    let enumeration = source
        .get("enum")
        .map(|raw| EnumSpec::parse(raw, ty.element()))
        .transpose()?;
    let bounds = Bounds::parse(source, ty.element())?;
    let flex = flex_tail_dims(obj, ty.rank())?;
    Ok(Constraints {
        ty,
        enumeration,
        bounds,
        flex,
        required: false,
    })
}

fn check_value(value: &Value, c: &Constraints) -> Result<(), ValidationError> {
    match (&c.ty, value) {
        (_, Value::Null) => Ok(()),
        (TypeDescriptor::Scalar(_), Value::Array(_)) => Err(ValidationError::new("expected a scalar, got a list")),
        (TypeDescriptor::Scalar(_), v) | (TypeDescriptor::Array { .. }, v @ (Value::Bool(_) | Value::Number(_) | Value::String(_))) => {
            check_element(v, c)
        }
        (TypeDescriptor::Array { dims, .. }, Value::Array(items)) => {
            if items.iter().all(|v| !v.is_array()) {
                if let Some(total) = c.ty.total_size() {
                    if items.len() as u64 > total {
                        return Err(ValidationError::new(format!(
                            "has {} values but the declared shape holds only {total}",
                            items.len()
                        )));
                    }
                }
            } else {
                let shape = nested_shape(value)?;
                if shape.len() != dims.len() {
                    return Err(ValidationError::new(format!(
                        "expected a rank-{} array, got nesting depth {}",
                        dims.len(),
                        shape.len()
                    )));
                }
                let fortran_order: Vec<usize> = shape.into_iter().rev().collect();
                let first_flex = dims.len() - c.flex;
                for (axis, (dim, actual)) in dims.iter().zip(&fortran_order).enumerate() {
                    let Some(declared) = dim.extent() else {
                        continue;
                    };
                    let actual = *actual as u64;
                    if actual > declared {
                        let what = if axis >= first_flex { "bound" } else { "extent" };
                        return Err(ValidationError::new(format!(
                            "dimension {} has {actual} elements, exceeds {what} {declared}",
                            axis + 1
                        )));
                    }
                    if c.flex > 0 && axis < first_flex && actual != declared {
                        return Err(ValidationError::new(format!(
                            "dimension {} has {actual} elements, expected {declared}",
                            axis + 1
                        )));
                    }
                }
            }
            let mut set = 0u64;
            for_each_leaf(value, &mut |v| {
                set += 1;
                check_element(v, c)
            })?;
            if c.required && c.flex == 0 {
                if let Some(total) = c.ty.total_size() {
                    if set < total {
                        return Err(ValidationError::new(format!(
                            "required array is only partly set ({set} of {total} elements)"
                        )));
                    }
                }
            }
            Ok(())
        }
        (TypeDescriptor::Array { .. }, Value::Object(_)) => Err(ValidationError::new("expected an array value")),
    }
}

/// Extents of a rectangular nested list, outermost first.
fn nested_shape(value: &Value) -> Result<Vec<usize>, ValidationError> {
    match value {
        Value::Array(items) => {
            let Some(first) = items.first() else {
                return Ok(vec![0]);
            };
            let inner = nested_shape(first)?;
            for item in &items[1..] {
                if nested_shape(item)? != inner {
                    return Err(ValidationError::new("nested lists are not rectangular"));
                }
            }
            let mut shape = vec![items.len()];
            shape.extend(inner);
            Ok(shape)
        }
        _ => Ok(Vec::new()),
    }
}

fn for_each_leaf(
    value: &Value,
    f: &mut dyn FnMut(&Value) -> Result<(), ValidationError>,
) -> Result<(), ValidationError> {
    match value {
        Value::Array(items) => items.iter().try_for_each(|v| for_each_leaf(v, &mut *f)),
        Value::Null => Ok(()),
        v => f(v),
    }
}

fn check_element(value: &Value, c: &Constraints) -> Result<(), ValidationError> {
    let element: &ScalarType = c.ty.element();
    let type_ok = match element.category {
        ScalarCategory::Integer => value.as_i64().is_some(),
        ScalarCategory::Real => value.is_number(),
        ScalarCategory::Boolean => value.is_boolean(),
        ScalarCategory::String => value.is_string(),
    };
    if !type_ok {
        return Err(ValidationError::new(format!(
            "expected {}, got {value}",
            element.category
        )));
    }
    if let (Some(text), Some(len)) = (value.as_str(), &element.len) {
        if text.trim_end().len() as u64 > len.value() {
            return Err(ValidationError::new(format!(
                "string '{text}' exceeds length {}",
                len.value()
            )));
        }
    }
    if c.enumeration.is_none() && c.bounds.is_none() {
        return Ok(());
    }
    let literal = normalize_scalar(value, &unbounded(element), "value")
        .map_err(|e| ValidationError::new(e.message().to_string()))?;
    if let Some(e) = &c.enumeration {
        if !e.contains(&literal) {
            let allowed: Vec<String> = e.values().iter().map(ToString::to_string).collect();
            return Err(ValidationError::new(format!(
                "value {literal} is not in enum [{}]",
                allowed.join(", ")
            )));
        }
    }
    if let Some(b) = &c.bounds {
        if !b.check(&literal) {
            return Err(ValidationError::new(format!(
                "value {literal} is out of bounds (must be {})",
                b.describe()
            )));
        }
    }
    Ok(())
}

/// Element type without the length limit, which is checked on trimmed text.
fn unbounded(element: &ScalarType) -> ScalarType {
    ScalarType {
        len: None,
        ..element.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nml_core::{ConstantValue, NmlError};
    use serde_json::json;

    fn ns(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    fn schema(properties: Value) -> Value {
        json!({"x-fortran-namelist": "config", "type": "object", "properties": properties})
    }

    fn validate(s: &Value, v: Value) -> NmlResult<()> {
        validate_namelist(s, &ns(v), &Constants::new())
    }

    #[test]
    fn rejects_unknown_property() {
        let s = schema(json!({"foo": {"type": "integer"}}));
        let err = validate(&s, json!({"foo": 1, "bar": 2})).unwrap_err();
        assert!(matches!(err, NmlError::Validation(_)));
        assert_eq!(err.to_string(), "bar: unknown property");
    }

    #[test]
    fn keys_match_case_insensitively() {
        let s = schema(json!({"Count": {"type": "integer"}}));
        assert!(validate(&s, json!({"count": 1})).is_ok());
    }

    #[test]
    fn flex_tail_dims_are_upper_bounds() {
        let s = schema(json!({"arr": {
            "type": "array", "items": {"type": "integer"},
            "x-fortran-shape": [3, 2, 4], "x-fortran-flex-tail-dims": 2,
        }}));
        validate(&s, json!({"arr": [[[1, 2, 3], [4, 5, 6]]]})).unwrap();
        let err = validate(&s, json!({"arr": [[[1, 2], [4, 5]]]})).unwrap_err();
        assert!(err.to_string().contains("dimension 1 has 2 elements, expected 3"));
        let err = validate(&s, json!({"arr": [[[1, 2, 3, 4], [5, 6, 7, 8]]]})).unwrap_err();
        assert!(err.to_string().contains("dimension 1 has 4 elements, exceeds extent 3"));
        let err = validate(&s, json!({"arr": [[[1, 2, 3], [4, 5, 6], [7, 8, 9]]]})).unwrap_err();
        assert!(err.to_string().contains("exceeds bound 2"));
    }

    #[test]
    fn fixed_dims_must_match() {
        let s = schema(json!({"grid": {"type": "array", "items": {"type": "integer"}, "x-fortran-shape": [2, 3]}}));
        assert!(validate(&s, json!({"grid": [[1, 2], [3, 4], [5, 6]]})).is_ok());
        assert!(validate(&s, json!({"grid": [[1, 2, 3], [4, 5, 6]]})).is_err());
        assert!(validate(&s, json!({"grid": [1, 2, 3, 4, 5, 6]})).is_ok());
        assert!(validate(&s, json!({"grid": [1, 2, 3, 4, 5, 6, 7]})).is_err());
        assert!(validate(&s, json!({"grid": [[[1]]]})).is_err());
        assert!(validate(&s, json!({"grid": 0})).is_ok());
    }

    #[test]
    fn shorter_nested_lists_leave_the_rest_unset() {
        let s = schema(json!({"grid": {"type": "array", "items": {"type": "integer"}, "x-fortran-shape": [2, 2]}}));
        // grid(1, 2) = 5
        validate(&s, json!({"grid": [[null], [5]]})).unwrap();
        validate(&s, json!({"grid": [[1, 2]]})).unwrap();
        validate(&s, json!({"grid": [[]]})).unwrap();
    }

    #[test]
    fn required_array_must_be_fully_set() {
        let mut s = schema(json!({
            "grid": {"type": "array", "items": {"type": "integer"}, "x-fortran-shape": [2, 2]},
            "tail": {"type": "array", "items": {"type": "integer"}, "x-fortran-shape": [2, 3], "x-fortran-flex-tail-dims": 1},
        }));
        s["required"] = json!(["GRID", "tail"]);
        let err = validate(&s, json!({"grid": [[null], [5]], "tail": [[1, 2]]})).unwrap_err();
        assert_eq!(err.to_string(), "grid: required array is only partly set (1 of 4 elements)");
        validate(&s, json!({"grid": [[1, 2], [3, 4]], "tail": [[1, 2]]})).unwrap();
        validate(&s, json!({"grid": [1, 2, 3, 4], "tail": [1]})).unwrap();
        validate(&s, json!({"grid": 7, "tail": 1})).unwrap();
        assert!(validate(&s, json!({"grid": [1, 2, 3], "tail": 1})).is_err());
    }

    #[test]
    fn ragged_lists_are_rejected() {
        let s = schema(json!({"grid": {"type": "array", "items": {"type": "integer"}, "x-fortran-shape": [2, 2]}}));
        let err = validate(&s, json!({"grid": [[1, 2], [3]]})).unwrap_err();
        assert!(err.to_string().contains("not rectangular"));
    }

    #[test]
    fn deferred_dims_are_unchecked() {
        let s = schema(json!({"v": {"type": "array", "items": {"type": "number"}, "x-fortran-shape": [":", 2]}}));
        assert!(validate(&s, json!({"v": [[1.0, 2.0, 3.0, 4.0], [5.0, 6.0, 7.0, 8.0]]})).is_ok());
    }

    #[test]
    fn required_and_type_checks() {
        let mut s = schema(json!({"n": {"type": "integer"}, "name": {"type": "string", "x-fortran-len": 3}}));
        s["required"] = json!(["n"]);
        assert_eq!(
            validate(&s, json!({})).unwrap_err().to_string(),
            "n: required property is missing"
        );
        assert!(validate(&s, json!({"n": 1.5})).is_err());
        assert!(validate(&s, json!({"n": 1, "name": "abcd"})).is_err());
        assert!(validate(&s, json!({"n": 1, "name": "abc   "})).is_ok());
    }

    #[test]
    fn enum_and_bounds_apply_elementwise() {
        let s = schema(json!({
            "m": {"type": "string", "x-fortran-len": 4, "enum": ["DDS", "MCMC"]},
            "c": {"type": "array", "x-fortran-shape": 3, "items": {"type": "integer", "minimum": 1}},
        }));
        assert!(validate(&s, json!({"m": "DDS "})).is_ok());
        let err = validate(&s, json!({"m": "SCE"})).unwrap_err();
        assert!(err.to_string().contains("not in enum ['DDS', 'MCMC']"));
        assert!(validate(&s, json!({"c": [1, null, 3]})).is_ok());
        let err = validate(&s, json!({"c": [1, 0]})).unwrap_err();
        assert_eq!(err.to_string(), "c: value 0 is out of bounds (must be >= 1)");
    }

    #[test]
    fn named_dimensions_resolve_through_constants() {
        let s = schema(json!({"v": {"type": "array", "items": {"type": "integer"}, "x-fortran-shape": "n"}}));
        let mut c = Constants::new();
        c.insert("n", ConstantValue::Integer(2));
        assert!(validate_namelist(&s, &ns(json!({"v": [1, 2]})), &c).is_ok());
        let err = validate_namelist(&s, &ns(json!({"v": [1, 2]})), &Constants::new()).unwrap_err();
        assert_eq!(err.property(), Some("v"));
    }
}
