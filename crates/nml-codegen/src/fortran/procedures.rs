//! Enum/bounds check functions and the `is_valid` statement list.

use nml_core::ScalarCategory;
use nml_schema::{Bound, Property};
use serde::Serialize;

use super::field::{all_missing, enum_values_name, missing_expr};

/// One generated `elemental logical function`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CheckFunction {
    pub name: String,
    pub brief: String,
    /// Result variable.
    pub result: String,
    /// Dummy type of `val`.
    pub arg_type: String,
    /// Sentinel test on `val`, honoured when `allow_missing` is set.
    pub missing: String,
    pub body: Vec<String>,
}

pub(crate) fn in_enum_name(prop: &str) -> String {
    format!("{prop}_in_enum")
}

pub(crate) fn in_bounds_name(prop: &str) -> String {
    format!("{prop}_in_bounds")
}

/// Check functions needed by `prop`, enum first.
pub(crate) fn check_functions(prop: &Property) -> Vec<CheckFunction> {
    let category = prop.category();
    let arg_type = prop.ty.arg_type_spec();
    let missing = missing_expr(category, "val", "val");
    let mut out = Vec::new();

    if prop.enumeration.is_some() {
        out.push(CheckFunction {
            name: in_enum_name(&prop.name),
            brief: format!("Whether a {} value is an allowed enum member.", prop.name),
            result: "in_enum".to_string(),
            arg_type: arg_type.clone(),
            missing: missing.clone(),
            body: vec![format!("in_enum = any(val == {})", enum_values_name(&prop.name))],
        });
    }

    if let Some(bounds) = &prop.bounds {
        let kind = prop.ty.kind();
        let mut body = vec!["in_bounds = .true.".to_string()];
        if category == ScalarCategory::Real {
            body.push("if (ieee_is_nan(val)) in_bounds = .false.".to_string());
        }
        let fails = |bound: &Bound, inclusive: &str, exclusive: &str| {
            let op = if bound.exclusive { exclusive } else { inclusive };
            format!(
                "if (val {op} {}) in_bounds = .false.",
                bound.value.fortran_literal(kind)
            )
        };
        if let Some(min) = &bounds.min {
            body.push(fails(min, "<", "<="));
        }
        if let Some(max) = &bounds.max {
            body.push(fails(max, ">", ">="));
        }
        out.push(CheckFunction {
            name: in_bounds_name(&prop.name),
            brief: format!("Whether a {} value lies within its bounds.", prop.name),
            result: "in_bounds".to_string(),
            arg_type,
            missing,
            body,
        });
    }
    out
}

fn fail(lines: &mut Vec<String>, condition: String, status: &str, message: String) {
    lines.push(format!("if ({condition}) then"));
    lines.push(format!("  status = {status}"));
    lines.push(format!("  if (present(errmsg)) errmsg = \"{message}\""));
    lines.push("  return".to_string());
    lines.push("end if".to_string());
}

/// Whether `prop` needs the `NML_ERR_PARTLY_SET` status.
pub(crate) fn needs_partly_set(prop: &Property) -> bool {
    prop.required && prop.is_array() && prop.flex_tail_dims == 0
}

/// `is_valid` statements for one field: required, enum, bounds.
pub(crate) fn is_valid_lines(prop: &Property) -> Vec<String> {
    let name = &prop.name;
    let target = format!("this%{name}");
    let mut lines = Vec::new();

    if prop.required {
        fail(
            &mut lines,
            all_missing(prop, &target),
            "NML_ERR_REQUIRED",
            format!("{name}: required field is not set"),
        );
        if needs_partly_set(prop) {
            fail(
                &mut lines,
                format!("any({})", missing_expr(prop.category(), &target, &target)),
                "NML_ERR_PARTLY_SET",
                format!("{name}: required array is only partly set"),
            );
        }
    }

    let reduce = |call: String| {
        if prop.is_array() {
            format!(".not. all({call})")
        } else {
            format!(".not. {call}")
        }
    };
    if prop.enumeration.is_some() {
        fail(
            &mut lines,
            reduce(format!("{}({target}, allow_missing=.true.)", in_enum_name(name))),
            "NML_ERR_ENUM",
            format!("{name}: value is not an allowed enum member"),
        );
    }
    if let Some(bounds) = &prop.bounds {
        fail(
            &mut lines,
            reduce(format!("{}({target}, allow_missing=.true.)", in_bounds_name(name))),
            "NML_ERR_BOUNDS",
            format!("{name}: value out of bounds ({})", bounds.describe()),
        );
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use nml_core::Constants;
    use nml_schema::NamelistSchema;
    use serde_json::{json, Value};

    fn property(schema: Value, required: bool) -> Property {
        let mut root = json!({
            "x-fortran-namelist": "test_nml",
            "type": "object",
            "properties": {"x": schema},
        });
        if required {
            root["required"] = json!(["x"]);
        }
        NamelistSchema::resolve(&root, &Constants::new())
            .unwrap()
            .properties
            .remove(0)
    }

    #[test]
    fn enum_function_for_array_items() {
        let p = property(
            json!({"type": "array", "x-fortran-shape": 2, "items": {"type": "string", "x-fortran-len": 8, "enum": ["A", "B"]}}),
            false,
        );
        let f = check_functions(&p);
        assert_eq!(f.len(), 1);
        assert_eq!(f[0].name, "x_in_enum");
        assert_eq!(f[0].arg_type, "character(len=*)");
        assert_eq!(f[0].body, vec!["in_enum = any(val == x_enum_values)"]);
        let valid = is_valid_lines(&p).join("\n");
        assert!(valid.contains("if (.not. all(x_in_enum(this%x, allow_missing=.true.))) then"));
    }

    #[test]
    fn bounds_function_uses_kind_literals() {
        let p = property(
            json!({"type": "number", "x-fortran-kind": "dp", "minimum": 0.0, "exclusiveMaximum": 1.0}),
            false,
        );
        let f = check_functions(&p);
        assert_eq!(
            f[0].body,
            vec![
                "in_bounds = .true.",
                "if (ieee_is_nan(val)) in_bounds = .false.",
                "if (val < 0.0_dp) in_bounds = .false.",
                "if (val >= 1.0_dp) in_bounds = .false.",
            ]
        );
        assert_eq!(f[0].missing, "ieee_is_nan(val)");
    }

    #[test]
    fn required_array_checks_partly_set() {
        let p = property(json!({"type": "array", "x-fortran-shape": 3, "items": {"type": "integer"}}), true);
        assert!(needs_partly_set(&p));
        let valid = is_valid_lines(&p).join("\n");
        assert!(valid.contains("if (all(this%x == -huge(this%x))) then"));
        assert!(valid.contains("status = NML_ERR_PARTLY_SET"));
    }

    #[test]
    fn required_flex_array_skips_partly_set() {
        let p = property(
            json!({"type": "array", "x-fortran-shape": [2, 3], "x-fortran-flex-tail-dims": 1, "items": {"type": "integer"}}),
            true,
        );
        assert!(!needs_partly_set(&p));
        assert!(!is_valid_lines(&p).join("\n").contains("PARTLY_SET"));
    }
}
