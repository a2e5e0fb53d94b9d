//! Per-field Fortran fragments: declarations, sentinels, default parameters
//! and the statement lines used inside the generated procedures.
//!
//! Every fragment is plain text; indentation inside multi-line fragments is
//! relative to the enclosing procedure body.

use nml_core::{ScalarCategory, ScalarValue};
use nml_schema::{DefaultSpec, Padding, Property};
use serde::Serialize;

/// Longest generated line before array constructors are wrapped.
const MAX_LINE: usize = 100;

/// Rendered context of one field.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct FieldContext {
    pub name: String,
    /// Lower-cased name, the `select case` key of `is_set`.
    pub key: String,
    /// Component / local declaration, e.g. `integer(i4), dimension(3) :: values`.
    pub declaration: String,
    /// Trailing doxygen comment for the component.
    pub doc: Option<String>,
    /// Dummy argument declaration in `init`.
    pub argument: String,
    pub set_default: Vec<String>,
    pub init: Vec<String>,
    /// `error stop` line in `from_file`, required fields only.
    pub required_check: Option<String>,
    pub is_set: Vec<String>,
}

/// How `init` places a caller-supplied array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// Shape must match exactly.
    Exact,
    /// Every axis may be shorter; assigned at the lower bound.
    Bounded,
    /// Leading axes exact, the last `k` axes may be shorter.
    Flex(usize),
}

impl Placement {
    fn of(prop: &Property) -> Self {
        if prop.flex_tail_dims > 0 {
            Self::Flex(prop.flex_tail_dims)
        } else if prop.has_default() {
            Self::Bounded
        } else {
            Self::Exact
        }
    }

    fn is_bounded_axis(self, axis: usize, rank: usize) -> bool {
        match self {
            Self::Exact => false,
            Self::Bounded => true,
            Self::Flex(k) => axis >= rank - k,
        }
    }
}

/// Rank for which `lb_i`/`ub_i` locals are needed by `init`, zero if none.
pub(crate) fn slice_rank(prop: &Property) -> usize {
    if prop.is_array() && Placement::of(prop) != Placement::Exact {
        prop.ty.rank()
    } else {
        0
    }
}

pub(crate) fn default_name(prop: &str) -> String {
    format!("{prop}_default")
}

pub(crate) fn pad_name(prop: &str) -> String {
    format!("{prop}_pad")
}

pub(crate) fn enum_values_name(prop: &str) -> String {
    format!("{prop}_enum_values")
}

/// Expression producing the "unset" value for `target`.
pub(crate) fn sentinel(category: ScalarCategory, target: &str) -> String {
    match category {
        ScalarCategory::Integer => format!("-huge({target})"),
        ScalarCategory::Real => format!("ieee_value({target}, ieee_quiet_nan)"),
        ScalarCategory::String => format!("repeat(achar(0), len({target}))"),
        ScalarCategory::Boolean => ".false.".to_string(),
    }
}

/// Logical expression, true where `value` holds the sentinel of `base`.
pub(crate) fn missing_expr(category: ScalarCategory, value: &str, base: &str) -> String {
    match category {
        ScalarCategory::Integer => format!("{value} == -huge({base})"),
        ScalarCategory::Real => format!("ieee_is_nan({value})"),
        ScalarCategory::String => format!("{value} == repeat(achar(0), len({base}))"),
        ScalarCategory::Boolean => ".false.".to_string(),
    }
}

/// `{value}` missing test, reduced with `all(...)` for arrays.
pub(crate) fn all_missing(prop: &Property, value: &str) -> String {
    let test = missing_expr(prop.category(), value, value);
    if prop.is_array() {
        format!("all({test})")
    } else {
        test
    }
}

fn literal(prop: &Property, value: &ScalarValue) -> String {
    value.fortran_literal(prop.ty.kind())
}

fn literals(prop: &Property, values: &[ScalarValue]) -> Vec<String> {
    values.iter().map(|v| literal(prop, v)).collect()
}

/// Array constructor prefix: strings need an explicit type spec so all
/// elements share the declared length.
fn constructor_prefix(prop: &Property) -> String {
    match prop.category() {
        ScalarCategory::String => format!("{} :: ", prop.ty.type_spec()),
        _ => String::new(),
    }
}

/// `head = [items]`, wrapped with `&` continuations when too long.
pub(crate) fn array_parameter(head: &str, prefix: &str, items: &[String]) -> Vec<String> {
    let single = format!("{head} = [{prefix}{}]", items.join(", "));
    if single.len() <= MAX_LINE {
        return vec![single];
    }
    let mut lines = vec![format!("{head} = [{prefix}&")];
    let mut current = String::new();
    for (i, item) in items.iter().enumerate() {
        let last = i + 1 == items.len();
        let piece = if last { format!("{item}]") } else { format!("{item}, ") };
        if !current.is_empty() && current.len() + piece.len() + 4 > MAX_LINE {
            lines.push(format!("  {}&", current));
            current.clear();
        }
        current.push_str(&piece);
    }
    lines.push(format!("  {}", current.trim_end()));
    lines
}

/// Module-level `parameter` lines: default, pad and enum values.
pub(crate) fn parameters(prop: &Property) -> Vec<String> {
    let spec = prop.ty.type_spec();
    let prefix = constructor_prefix(prop);
    let mut out = Vec::new();
    let default = default_name(&prop.name);

    match &prop.default {
        DefaultSpec::None => {}
        DefaultSpec::Scalar(v) | DefaultSpec::Broadcast(v) => {
            out.push(format!("{spec}, parameter, public :: {default} = {}", literal(prop, v)));
        }
        DefaultSpec::Array(a) => {
            let head = format!("{spec}, parameter, public :: {default}({})", a.values.len());
            out.extend(array_parameter(&head, &prefix, &literals(prop, &a.values)));
            let pad = pad_name(&prop.name);
            match &a.padding {
                Padding::Scalar(v) => {
                    out.push(format!("{spec}, parameter, public :: {pad} = {}", literal(prop, v)));
                }
                Padding::List(vs) => {
                    let head = format!("{spec}, parameter, public :: {pad}({})", vs.len());
                    out.extend(array_parameter(&head, &prefix, &literals(prop, vs)));
                }
                Padding::None | Padding::Repeat => {}
            }
        }
    }

    if let Some(e) = &prop.enumeration {
        let head = format!(
            "{spec}, parameter, public :: {}({})",
            enum_values_name(&prop.name),
            e.len()
        );
        out.extend(array_parameter(&head, &prefix, &literals(prop, e.values())));
    }
    out
}

/// Statement assigning the initial value in `set_default`.
fn set_default_line(prop: &Property) -> String {
    let target = format!("this%{}", prop.name);
    let default = default_name(&prop.name);
    match &prop.default {
        DefaultSpec::None => format!("{target} = {}", sentinel(prop.category(), &target)),
        DefaultSpec::Scalar(_) | DefaultSpec::Broadcast(_) => format!("{target} = {default}"),
        DefaultSpec::Array(a) => {
            let rank = prop.ty.rank();
            let total = prop.ty.total_size().unwrap_or(0);
            if !a.needs_reshape(rank, total) {
                return format!("{target} = {default}");
            }
            let mut call = format!("reshape({default}, shape({target})");
            match &a.padding {
                Padding::None => {}
                Padding::Repeat => call.push_str(&format!(", pad={default}")),
                Padding::Scalar(_) => call.push_str(&format!(", pad=[{}]", pad_name(&prop.name))),
                Padding::List(_) => call.push_str(&format!(", pad={}", pad_name(&prop.name))),
            }
            if let Some(order) = a.order_values(rank) {
                let order: Vec<String> = order.iter().map(ToString::to_string).collect();
                call.push_str(&format!(", order=[{}]", order.join(", ")));
            }
            call.push(')');
            format!("{target} = {call}")
        }
    }
}

fn init_lines(prop: &Property) -> Vec<String> {
    let name = &prop.name;
    let target = format!("this%{name}");
    let mut body = Vec::new();

    if !prop.is_array() {
        return if prop.required {
            vec![format!("{target} = {name}")]
        } else {
            vec![format!("if (present({name})) {target} = {name}")]
        };
    }

    let rank = prop.ty.rank();
    let placement = Placement::of(prop);
    let checks: Vec<String> = (1..=rank)
        .map(|i| {
            let op = if placement.is_bounded_axis(i - 1, rank) { ">" } else { "/=" };
            format!("size({name}, {i}) {op} size({target}, {i})")
        })
        .collect();
    let separator = if checks.len() > 3 { " .or. &\n        " } else { " .or. " };
    body.push(format!("if ({}) then", checks.join(separator)));
    body.push("  status = NML_ERR_INVALID_INDEX".to_string());
    body.push(format!(
        "  if (present(errmsg)) errmsg = \"{name}: shape does not fit the declared dimensions\""
    ));
    body.push("  return".to_string());
    body.push("end if".to_string());

    if placement == Placement::Exact {
        body.push(format!("{target} = {name}"));
    } else {
        let mut slices = Vec::with_capacity(rank);
        for i in 1..=rank {
            body.push(format!("lb_{i} = lbound({target}, {i})"));
            body.push(format!("ub_{i} = lb_{i} + size({name}, {i}) - 1"));
            slices.push(format!("lb_{i}:ub_{i}"));
        }
        body.push(format!("{target}({}) = {name}", slices.join(", ")));
    }

    if prop.required {
        body
    } else {
        let mut out = vec![format!("if (present({name})) then")];
        out.extend(body.into_iter().map(|l| format!("  {l}")));
        out.push("end if".to_string());
        out
    }
}

fn is_set_lines(prop: &Property) -> Vec<String> {
    let name = &prop.name;
    let target = format!("this%{name}");
    let category = prop.category();
    let mut out = Vec::new();

    if !prop.is_array() {
        out.push("if (present(idx)) then".to_string());
        out.push("  status = NML_ERR_INVALID_INDEX".to_string());
        out.push(format!("  if (present(errmsg)) errmsg = \"{name}: field is not an array\""));
        out.push("  return".to_string());
        out.push("end if".to_string());
        if prop.uses_sentinel() {
            out.push(format!("if ({}) status = NML_ERR_NOT_SET", missing_expr(category, &target, &target)));
        }
        return out;
    }

    let subscripts: Vec<String> = (1..=prop.ty.rank()).map(|i| format!("idx({i})")).collect();
    let element = format!("{target}({})", subscripts.join(", "));
    out.push("if (present(idx)) then".to_string());
    out.push(format!(
        "  status = idx_check(idx, lbound({target}), ubound({target}), \"{name}\", errmsg)"
    ));
    out.push("  if (status /= NML_OK) return".to_string());
    if prop.uses_sentinel() {
        out.push(format!("  if ({}) status = NML_ERR_NOT_SET", missing_expr(category, &element, &target)));
        out.push("else".to_string());
        out.push(format!("  if ({}) status = NML_ERR_NOT_SET", all_missing(prop, &target)));
    }
    out.push("end if".to_string());
    out
}

fn argument(prop: &Property) -> String {
    let mut parts = vec![prop.ty.arg_type_spec()];
    if prop.is_array() {
        parts.push(format!("dimension({})", vec![":"; prop.ty.rank()].join(", ")));
    }
    parts.push("intent(in)".to_string());
    if !prop.required {
        parts.push("optional".to_string());
    }
    format!("{} :: {}", parts.join(", "), prop.name)
}

/// Build the full context of one field for namelist `namelist`.
pub(crate) fn field_context(prop: &Property, namelist: &str) -> FieldContext {
    let required_check = prop.required.then(|| {
        format!(
            "if ({}) error stop \"{namelist}: {} is required\"",
            all_missing(prop, &prop.name),
            prop.name
        )
    });
    FieldContext {
        name: prop.name.clone(),
        key: prop.name.to_ascii_lowercase(),
        declaration: format!("{} :: {}", prop.ty.declaration(), prop.name),
        doc: prop.summary().map(|s| format!("!< {s}")),
        argument: argument(prop),
        set_default: vec![set_default_line(prop)],
        init: init_lines(prop),
        required_check,
        is_set: is_set_lines(prop),
    }
}
