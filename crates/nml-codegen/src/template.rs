//! # Namelist Template Emitter
//!
//! Writes `&group ... /` blocks for one or more namelists, ready to be
//! filled in by a user.
//!
//! | value mode       | fields written        | values |
//! |------------------|-----------------------|--------|
//! | `empty`          | all                   | none (`x =`, `x(:, :) =`) |
//! | `filled`         | all                   | best effort |
//! | `minimal-empty`  | no schema default     | none |
//! | `minimal-filled` | no schema default     | best effort |
//!
//! A field with an explicit override is always written. Filled values take
//! the first available of: override, first example, schema default, first
//! enum member, a bounds-aware zero or empty string. Every filled template
//! validates against its schema.
//!
//! Multi-dimensional list defaults are written one slice per line: along
//! the first axis for Fortran order (`x(:, j) = ...`) and along the last
//! axis for C order (`x(i, :) = ...`).

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use nml_core::{ConfigError, NmlResult, ScalarCategory, ScalarValue};
use nml_schema::normalize::normalize_scalar;
use nml_schema::{Bounds, DefaultOrder, DefaultSpec, ExampleValue, NamelistSchema, Property};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::describe::{default_summary, literal_list};
use crate::output::write_output;
use crate::render::{render_with, Renderer, NAMELIST_TEMPLATE};

/// Whether fields carry comment lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocMode {
    Plain,
    #[default]
    Documented,
}

/// Which fields are written and whether they get values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueMode {
    #[default]
    Empty,
    Filled,
    MinimalEmpty,
    MinimalFilled,
}

impl ValueMode {
    pub fn is_filled(self) -> bool {
        matches!(self, Self::Filled | Self::MinimalFilled)
    }

    pub fn is_minimal(self) -> bool {
        matches!(self, Self::MinimalEmpty | Self::MinimalFilled)
    }
}

impl FromStr for DocMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(Self::Plain),
            "documented" => Ok(Self::Documented),
            other => Err(ConfigError::new(format!(
                "unknown doc mode '{other}' (expected plain or documented)"
            ))),
        }
    }
}

impl fmt::Display for DocMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plain => "plain",
            Self::Documented => "documented",
        })
    }
}

impl FromStr for ValueMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "empty" => Ok(Self::Empty),
            "filled" => Ok(Self::Filled),
            "minimal-empty" => Ok(Self::MinimalEmpty),
            "minimal-filled" => Ok(Self::MinimalFilled),
            other => Err(ConfigError::new(format!(
                "unknown value mode '{other}' (expected empty, filled, minimal-empty or minimal-filled)"
            ))),
        }
    }
}

impl fmt::Display for ValueMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Empty => "empty",
            Self::Filled => "filled",
            Self::MinimalEmpty => "minimal-empty",
            Self::MinimalFilled => "minimal-filled",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TemplateOptions {
    pub doc_mode: DocMode,
    pub value_mode: ValueMode,
}

/// Per-namelist explicit values: namelist name to property name to value.
pub type Overrides = BTreeMap<String, Map<String, Value>>;

#[derive(Debug, Serialize)]
struct EntryContext {
    comments: Vec<String>,
    lines: Vec<String>,
}

#[derive(Debug, Serialize)]
struct GroupContext {
    name: String,
    header: Vec<String>,
    entries: Vec<EntryContext>,
}

#[derive(Debug, Serialize)]
struct TemplateContext {
    groups: Vec<GroupContext>,
}

/// Value chosen for a filled entry.
#[derive(Debug, Clone, PartialEq)]
enum Filled {
    Scalar(ScalarValue),
    /// Same value for every element.
    Broadcast(ScalarValue),
    /// Flat list starting at the first element.
    List(Vec<ScalarValue>),
    /// Every element in column-major order, written slice by slice.
    Expanded(Vec<ScalarValue>, DefaultOrder),
}

fn override_value(prop: &Property, raw: &Value) -> Result<Filled, ConfigError> {
    let element = prop.ty.element();
    let scalar = |v: &Value| {
        normalize_scalar(v, element, "override value")
            .map_err(|e| ConfigError::new(e.message().to_string()).with_property(&prop.name))
    };
    match (raw, prop.is_array()) {
        (Value::Array(items), true) => {
            if items.iter().any(Value::is_array) {
                return Err(ConfigError::new("override must be a scalar or a flat list").with_property(&prop.name));
            }
            Ok(Filled::List(items.iter().map(scalar).collect::<Result<_, _>>()?))
        }
        (Value::Array(_), false) => {
            Err(ConfigError::new("override for a scalar field must not be a list").with_property(&prop.name))
        }
        (v, true) => Ok(Filled::Broadcast(scalar(v)?)),
        (v, false) => Ok(Filled::Scalar(scalar(v)?)),
    }
}

/// Zero or empty string, moved inside the bounds when needed.
fn fallback(prop: &Property) -> ScalarValue {
    match prop.category() {
        ScalarCategory::Integer => ScalarValue::Integer(prop.bounds.as_ref().map_or(0, integer_inside)),
        ScalarCategory::Real => ScalarValue::Real(prop.bounds.as_ref().map_or(0.0, real_inside)),
        ScalarCategory::String => ScalarValue::String(String::new()),
        ScalarCategory::Boolean => ScalarValue::Boolean(false),
    }
}

fn integer_inside(bounds: &Bounds) -> i64 {
    let lo = bounds.min.as_ref().and_then(|b| match b.value {
        ScalarValue::Integer(v) => Some(if b.exclusive { v.saturating_add(1) } else { v }),
        _ => b.value.as_f64().map(|v| v.ceil() as i64),
    });
    let hi = bounds.max.as_ref().and_then(|b| match b.value {
        ScalarValue::Integer(v) => Some(if b.exclusive { v.saturating_sub(1) } else { v }),
        _ => b.value.as_f64().map(|v| v.floor() as i64),
    });
    match (lo, hi) {
        (Some(l), Some(h)) => {
            let mid = i128::from(l) + (i128::from(h) - i128::from(l)) / 2;
            i64::try_from(mid).unwrap_or(l)
        }
        (Some(l), None) => l.max(0),
        (None, Some(h)) => h.min(0),
        (None, None) => 0,
    }
}

fn real_inside(bounds: &Bounds) -> f64 {
    if bounds.check(&ScalarValue::Real(0.0)) {
        return 0.0;
    }
    let lo = bounds.min.as_ref().and_then(|b| b.value.as_f64().map(|v| (v, b.exclusive)));
    let hi = bounds.max.as_ref().and_then(|b| b.value.as_f64().map(|v| (v, b.exclusive)));
    match (lo, hi) {
        (Some((l, _)), Some((h, _))) => l + (h - l) / 2.0,
        (Some((l, false)), None) => l,
        (Some((l, true)), None) => l + 1.0,
        (None, Some((h, false))) => h,
        (None, Some((h, true))) => h - 1.0,
        (None, None) => 0.0,
    }
}

fn filled_value(prop: &Property, raw_override: Option<&Value>) -> Result<Filled, ConfigError> {
    if let Some(raw) = raw_override {
        return override_value(prop, raw);
    }
    let wrap = |v: &ScalarValue| {
        if prop.is_array() {
            Filled::Broadcast(v.clone())
        } else {
            Filled::Scalar(v.clone())
        }
    };
    if let Some(example) = prop.examples.first() {
        return Ok(match example {
            ExampleValue::Scalar(v) => wrap(v),
            ExampleValue::List(vs) => Filled::List(vs.clone()),
        });
    }
    match &prop.default {
        DefaultSpec::Scalar(v) | DefaultSpec::Broadcast(v) => return Ok(wrap(v)),
        DefaultSpec::Array(a) => match prop.ty.extents() {
            Some(extents) if prop.ty.rank() > 1 || !a.pad_values().is_empty() => {
                return Ok(Filled::Expanded(a.expand(&extents), a.order));
            }
            _ => return Ok(Filled::List(a.values.clone())),
        },
        DefaultSpec::None => {}
    }
    if let Some(first) = prop.enumeration.as_ref().and_then(|e| e.first()) {
        return Ok(wrap(first));
    }
    Ok(wrap(&fallback(prop)))
}

/// Index subscripts `(i, j, :)` for a slice; `open` is the full axis.
fn subscripts(indices: &[usize], open: usize, rank: usize) -> String {
    let mut parts = Vec::with_capacity(rank);
    let mut it = indices.iter();
    for axis in 0..rank {
        if axis == open {
            parts.push(":".to_string());
        } else if let Some(i) = it.next() {
            parts.push((i + 1).to_string());
        }
    }
    format!("({})", parts.join(", "))
}

/// One line per slice of a column-major value list.
fn slice_lines(name: &str, values: &[ScalarValue], extents: &[usize], order: DefaultOrder) -> Vec<String> {
    let rank = extents.len();
    let mut strides = vec![1usize; rank];
    for axis in 1..rank {
        strides[axis] = strides[axis - 1] * extents[axis - 1];
    }
    let open = match order {
        DefaultOrder::Fortran => 0,
        DefaultOrder::C => rank - 1,
    };
    let fixed: Vec<usize> = (0..rank).filter(|&a| a != open).collect();
    let count: usize = fixed.iter().map(|&a| extents[a]).product();

    let mut lines = Vec::with_capacity(count);
    for n in 0..count {
        // Fortran order walks the fixed axes first-fastest, C order last-fastest.
        let mut indices = vec![0usize; fixed.len()];
        let mut rem = n;
        let walk: Vec<usize> = match order {
            DefaultOrder::Fortran => (0..fixed.len()).collect(),
            DefaultOrder::C => (0..fixed.len()).rev().collect(),
        };
        for k in walk {
            indices[k] = rem % extents[fixed[k]];
            rem /= extents[fixed[k]];
        }
        let base: usize = indices
            .iter()
            .zip(&fixed)
            .map(|(i, &a)| i * strides[a])
            .sum();
        let slice: Vec<&ScalarValue> = (0..extents[open])
            .filter_map(|m| values.get(base + m * strides[open]))
            .collect();
        lines.push(format!(
            "{name}{} = {}",
            subscripts(&indices, open, rank),
            literal_list(slice)
        ));
    }
    lines
}

fn assignment_lines(prop: &Property, filled: &Filled) -> Vec<String> {
    let name = &prop.name;
    match filled {
        Filled::Scalar(v) => vec![format!("{name} = {}", v.namelist_literal())],
        Filled::Broadcast(v) => match prop.ty.total_size() {
            Some(total) if total > 1 => vec![format!("{name} = {total}*{}", v.namelist_literal())],
            _ => vec![format!("{name} = {}", v.namelist_literal())],
        },
        Filled::List(vs) => vec![format!("{name} = {}", literal_list(vs))],
        Filled::Expanded(vs, order) => {
            let extents: Vec<usize> = prop
                .ty
                .extents()
                .unwrap_or_default()
                .into_iter()
                .map(|e| e as usize)
                .collect();
            if extents.len() > 1 {
                slice_lines(name, vs, &extents, *order)
            } else {
                vec![format!("{name} = {}", literal_list(vs))]
            }
        }
    }
}

fn empty_line(prop: &Property) -> String {
    if prop.is_array() {
        format!("{}({}) =", prop.name, vec![":"; prop.ty.rank()].join(", "))
    } else {
        format!("{} =", prop.name)
    }
}

fn comment_lines(prop: &Property) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(summary) = prop.summary() {
        out.push(summary.to_string());
    }
    let status = if prop.required { "required" } else { "optional" };
    out.push(format!("type: {} ({status})", prop.ty.declaration()));
    if let Some(e) = &prop.enumeration {
        out.push(format!("allowed: {}", literal_list(e.values())));
    }
    if let Some(b) = &prop.bounds {
        out.push(format!("range: {}", b.describe()));
    }
    if let Some(d) = default_summary(prop) {
        out.push(format!("default: {}", d.render("")));
    }
    if prop.flex_tail_dims > 0 {
        out.push(format!(
            "trailing {} dimension(s) may be shorter than declared",
            prop.flex_tail_dims
        ));
    }
    out
}

fn group_context(
    schema: &NamelistSchema,
    options: &TemplateOptions,
    overrides: Option<&Map<String, Value>>,
) -> NmlResult<GroupContext> {
    if let Some(map) = overrides {
        if let Some(unknown) = map.keys().find(|k| schema.property(k).is_none()) {
            return Err(ConfigError::new(format!(
                "override for unknown property in namelist '{}'",
                schema.name
            ))
            .with_property(unknown)
            .into());
        }
    }
    let lookup = |prop: &Property| {
        overrides.and_then(|map| {
            map.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(&prop.name))
                .map(|(_, v)| v)
        })
    };

    let mut entries = Vec::new();
    for prop in &schema.properties {
        let raw = lookup(prop);
        if options.value_mode.is_minimal() && prop.has_default() && raw.is_none() {
            continue;
        }
        let lines = if options.value_mode.is_filled() {
            assignment_lines(prop, &filled_value(prop, raw)?)
        } else {
            vec![empty_line(prop)]
        };
        let comments = match options.doc_mode {
            DocMode::Documented => comment_lines(prop),
            DocMode::Plain => Vec::new(),
        };
        entries.push(EntryContext { comments, lines });
    }

    let header = match options.doc_mode {
        DocMode::Documented => {
            let mut h = vec![schema.display_title().to_string()];
            if let Some(d) = &schema.description {
                h.extend(d.lines().map(|l| l.trim_end().to_string()));
            }
            h
        }
        DocMode::Plain => Vec::new(),
    };

    Ok(GroupContext {
        name: schema.name.clone(),
        header,
        entries,
    })
}

/// Render one template holding a group per schema, in the given order.
///
/// # Errors
///
/// `ConfigError` for overrides naming unknown properties or holding values
/// of the wrong type; `NmlError::Render` if the backend fails.
pub fn render_template<R: Renderer + ?Sized>(
    schemas: &[NamelistSchema],
    options: &TemplateOptions,
    overrides: &Overrides,
    renderer: &R,
) -> NmlResult<String> {
    let groups = schemas
        .iter()
        .map(|s| group_context(s, options, overrides.get(&s.name)))
        .collect::<NmlResult<Vec<_>>>()?;
    let text = render_with(renderer, NAMELIST_TEMPLATE, &TemplateContext { groups })?;
    tracing::debug!(
        groups = schemas.len(),
        doc_mode = %options.doc_mode,
        value_mode = %options.value_mode,
        "rendered namelist template"
    );
    Ok(text)
}

/// Render a template and write it to `path`.
pub fn write_template<R: Renderer + ?Sized>(
    schemas: &[NamelistSchema],
    path: &Path,
    options: &TemplateOptions,
    overrides: &Overrides,
    renderer: &R,
) -> NmlResult<()> {
    let text = render_template(schemas, options, overrides, renderer)?;
    write_output(path, &text)
}
