//! # Resolved Namelist Model
//!
//! [`NamelistSchema::resolve`] walks a loaded schema once and produces one
//! immutable [`Property`] per schema property, in declaration order. Every
//! cross-field rule is enforced here so the emitters can render without
//! further checks.
//!
//! Errors raised while resolving a property are tagged with its name.

use std::collections::HashSet;

use nml_core::{check_identifier, Constants, NmlResult, ScalarCategory, ScalarValue, SchemaError};
use serde_json::{Map, Value};

use crate::normalize::{
    normalize_default, normalize_examples, Bounds, DefaultSpec, EnumSpec, ExampleValue,
};
use crate::types::{flex_tail_dims, resolve_type, ScalarType, ShapeMode, TypeDescriptor};

const HUGE_INT8: i64 = -127;
const HUGE_INT16: i64 = -32_767;
const HUGE_INT32: i64 = -2_147_483_647;
const HUGE_INT64: i64 = -i64::MAX;

/// `-huge` of every integer width `kind` may stand for.
///
/// Kind names are local aliases. The conventional ones (`i1`/`int8` up to
/// `i8`/`int64`) map to one width, the default kind to int32 or int64, and
/// any other name to every width.
pub fn integer_sentinels(kind: Option<&str>) -> &'static [i64] {
    match kind.map(str::to_ascii_lowercase).as_deref() {
        Some("i1" | "int8") => &[HUGE_INT8],
        Some("i2" | "int16") => &[HUGE_INT16],
        Some("i4" | "int32") => &[HUGE_INT32],
        Some("i8" | "int64") => &[HUGE_INT64],
        None => &[HUGE_INT32, HUGE_INT64],
        Some(_) => &[HUGE_INT8, HUGE_INT16, HUGE_INT32, HUGE_INT64],
    }
}

/// One resolved namelist.
#[derive(Debug, Clone, PartialEq)]
pub struct NamelistSchema {
    /// `x-fortran-namelist`.
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub properties: Vec<Property>,
}

/// One resolved namelist variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub required: bool,
    pub ty: TypeDescriptor,
    pub default: DefaultSpec,
    pub enumeration: Option<EnumSpec>,
    pub bounds: Option<Bounds>,
    pub examples: Vec<ExampleValue>,
    pub flex_tail_dims: usize,
}

impl Property {
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Whether the field starts out holding its "unset" sentinel.
    pub fn uses_sentinel(&self) -> bool {
        !self.has_default()
    }

    pub fn is_array(&self) -> bool {
        self.ty.is_array()
    }

    pub fn category(&self) -> ScalarCategory {
        self.ty.element_category()
    }

    /// First line of the description, or the title.
    pub fn summary(&self) -> Option<&str> {
        self.title
            .as_deref()
            .or_else(|| self.description.as_deref().and_then(|d| d.lines().next()))
    }
}

impl NamelistSchema {
    /// Resolve a loaded schema document against `constants`.
    ///
    /// # Errors
    ///
    /// `SchemaError` for any structural or cross-field violation,
    /// `ConfigError` for unresolved constants; both tagged with the
    /// property name when one is involved.
    pub fn resolve(schema: &Value, constants: &Constants) -> NmlResult<Self> {
        let root = schema
            .as_object()
            .ok_or_else(|| SchemaError::new("schema root must be a mapping"))?;

        match root.get("type").and_then(Value::as_str) {
            Some("object") => {}
            _ => return Err(SchemaError::new("schema root must have type 'object'").into()),
        }

        let name = match root.get("x-fortran-namelist") {
            Some(Value::String(s)) => s.trim().to_string(),
            _ => return Err(SchemaError::new("schema must define a string x-fortran-namelist").into()),
        };
        check_identifier(&name, "namelist name")?;

        let props = match root.get("properties") {
            Some(Value::Object(map)) => map,
            Some(_) => return Err(SchemaError::new("'properties' must be a mapping").into()),
            None => return Err(SchemaError::new("schema must define 'properties'").into()),
        };

        let required = required_names(root)?;
        for r in &required {
            if !props.contains_key(r) {
                return Err(SchemaError::for_property(
                    r.clone(),
                    "listed in 'required' but not declared in properties",
                )
                .into());
            }
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut properties = Vec::with_capacity(props.len());
        for (prop_name, prop_schema) in props {
            check_identifier(prop_name, "property name").map_err(|e| e.with_property(prop_name))?;
            if !seen.insert(prop_name.to_ascii_lowercase()) {
                return Err(SchemaError::for_property(
                    prop_name.clone(),
                    "duplicate property name (names are case-insensitive)",
                )
                .into());
            }
            let is_required = required.iter().any(|r| r == prop_name);
            let property = resolve_property(prop_name, prop_schema, is_required, constants)
                .map_err(|e| e.with_property(prop_name))?;
            properties.push(property);
        }

        tracing::debug!(namelist = %name, fields = properties.len(), "resolved namelist schema");

        Ok(Self {
            name,
            title: string_field(root, "title"),
            description: string_field(root, "description"),
            properties,
        })
    }

    /// Display title, falling back to the namelist name.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.name)
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

fn required_names(root: &Map<String, Value>) -> Result<Vec<String>, SchemaError> {
    match root.get("required") {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| SchemaError::new("'required' entries must be strings"))
            })
            .collect(),
        Some(_) => Err(SchemaError::new("'required' must be a list of property names")),
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn resolve_property(
    name: &str,
    schema: &Value,
    required: bool,
    constants: &Constants,
) -> NmlResult<Property> {
    let obj = schema
        .as_object()
        .ok_or_else(|| SchemaError::new("property schema must be a mapping"))?;
    let ty = resolve_type(schema, constants, ShapeMode::Declared)?;
    let element = ty.element().clone();

    // enum and bounds live on `items` for arrays and on the property otherwise
    let constraint_obj: &Map<String, Value> = match &ty {
        TypeDescriptor::Array { .. } => {
            if obj.contains_key("enum") {
                return Err(SchemaError::new("array enum must be defined on items").into());
            }
            if ["minimum", "maximum", "exclusiveMinimum", "exclusiveMaximum"]
                .iter()
                .any(|k| obj.contains_key(*k))
            {
                return Err(SchemaError::new("array bounds must be defined on items").into());
            }
            obj.get("items").and_then(Value::as_object).unwrap_or(obj)
        }
        TypeDescriptor::Scalar(_) => obj,
    };

    let enumeration = constraint_obj
        .get("enum")
        .map(|raw| EnumSpec::parse(raw, &element))
        .transpose()?;
    let bounds = Bounds::parse(constraint_obj, &element)?;
    let default = normalize_default(obj, &ty)?;
    let examples = normalize_examples(obj, &ty)?;
    let flex = flex_tail_dims(obj, ty.rank())?;

    if required && default.is_some() {
        return Err(SchemaError::new("required properties must not define a default").into());
    }
    if element.category == ScalarCategory::Boolean && (required || !default.is_some()) {
        return Err(SchemaError::new(
            "required booleans and booleans without a default are not supported (no safe unset sentinel)",
        )
        .into());
    }
    if flex > 0 {
        if default.is_some() {
            return Err(SchemaError::new("x-fortran-flex-tail-dims cannot be combined with a default").into());
        }
        if element.category == ScalarCategory::Boolean {
            return Err(SchemaError::new("x-fortran-flex-tail-dims is not supported for boolean arrays").into());
        }
    }

    let check = |value: &ScalarValue, what: &str| -> Result<(), SchemaError> {
        if let Some(e) = &enumeration {
            if !e.contains(value) {
                return Err(SchemaError::new(format!("{what} {value} is not in enum")));
            }
        }
        if let Some(b) = &bounds {
            if !b.check(value) {
                return Err(SchemaError::new(format!(
                    "{what} {value} is out of bounds (must be {})",
                    b.describe()
                )));
            }
        }
        Ok(())
    };
    for value in default.literals() {
        check(value, "default value")?;
    }
    for example in &examples {
        for value in example.values() {
            check(value, "example value")?;
        }
    }

    if !default.is_some() {
        let mut legal: Vec<&ScalarValue> = Vec::new();
        if let Some(e) = &enumeration {
            legal.extend(e.values());
        }
        for example in &examples {
            legal.extend(example.values());
        }
        for value in legal {
            if collides_with_sentinel(value, &element) {
                return Err(SchemaError::new(format!(
                    "value {value} collides with the unset sentinel of this field"
                ))
                .into());
            }
        }
    }

    Ok(Property {
        name: name.to_string(),
        title: string_field(obj, "title"),
        description: string_field(obj, "description"),
        required,
        ty,
        default,
        enumeration,
        bounds,
        examples,
        flex_tail_dims: flex,
    })
}

/// Whether `value` equals an "unset" sentinel of the `element` type.
pub fn collides_with_sentinel(value: &ScalarValue, element: &ScalarType) -> bool {
    match value {
        ScalarValue::Integer(v) => integer_sentinels(element.kind.as_deref()).contains(v),
        ScalarValue::String(s) => !s.is_empty() && s.bytes().all(|b| b == 0),
        ScalarValue::Real(v) => v.is_nan(),
        ScalarValue::Boolean(_) => false,
    }
}
