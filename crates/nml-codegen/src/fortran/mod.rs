//! # Fortran Module Emitter
//!
//! Renders one Fortran 2008 module per namelist. The module defines a
//! derived type `<namelist>_t` holding every namelist variable, with five
//! type-bound procedures:
//!
//! | binding       | role |
//! |---------------|------|
//! | `set_default` | write defaults and "unset" sentinels |
//! | `init`        | populate from dummy arguments, shape-checked |
//! | `from_file`   | read the namelist group from a file |
//! | `is_set`      | query a field (or one element) by name |
//! | `is_valid`    | required, enum and bounds checks |
//!
//! Fields that are required or have no default start out holding a
//! category sentinel (see [`field::sentinel`]); required fields left at
//! their sentinel after `from_file` stop the program with a named message.
//!
//! All helper symbols (status codes, the file reader, `idx_check`) come
//! from the companion module rendered by [`helper`].

mod field;
pub mod helper;
mod procedures;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use nml_core::{ConfigError, NmlResult, ScalarCategory, SchemaError};
use nml_schema::{DefaultSpec, NamelistSchema, Padding, Property};
use serde::Serialize;

use crate::output::write_output;
use crate::render::{render_with, Renderer, FORTRAN_MODULE};

use self::field::{default_name, enum_values_name, field_context, pad_name, slice_rank, FieldContext};
use self::procedures::{check_functions, in_bounds_name, in_enum_name, is_valid_lines, needs_partly_set, CheckFunction};

/// Longest identifier Fortran 2008 accepts.
const MAX_NAME_LEN: usize = 63;

/// Symbols every generated module imports from the helper module.
pub const HELPER_IMPORTS: &[&str] = &[
    "nml_file_t",
    "nml_line_buffer",
    "NML_OK",
    "NML_ERR_FILE_NOT_FOUND",
    "NML_ERR_OPEN",
    "NML_ERR_NOT_OPEN",
    "NML_ERR_NML_NOT_FOUND",
    "NML_ERR_READ",
    "NML_ERR_CLOSE",
    "NML_ERR_REQUIRED",
    "NML_ERR_ENUM",
    "NML_ERR_BOUNDS",
    "NML_ERR_NOT_SET",
    "NML_ERR_INVALID_NAME",
    "NML_ERR_INVALID_INDEX",
    "to_lower",
    "idx_check",
    "max_iomsg_len",
];

/// Imported only when a required, non-flex array exists.
const PARTLY_SET: &str = "NML_ERR_PARTLY_SET";

/// Local and dummy names used inside the generated procedures.
const PROCEDURE_LOCALS: &[&str] = &[
    "this", "file", "errmsg", "status", "nml", "iostat", "iomsg", "close_status",
];

/// Intrinsics referenced by generated code.
const INTRINSICS: &[&str] = &[
    "huge", "repeat", "achar", "len", "all", "any", "size", "lbound", "ubound", "reshape",
    "shape", "present", "trim", "ieee_value", "ieee_quiet_nan", "ieee_is_nan",
    "ieee_arithmetic",
];

/// Options of the Fortran emitter, usually taken from the config file.
#[derive(Debug, Clone)]
pub struct FortranOptions {
    /// Module providing status codes and the file reader.
    pub helper_module: String,
    /// Module providing the kind parameters.
    pub kind_module: Option<String>,
    /// Local kind name to the name exported by `kind_module`.
    pub kind_map: BTreeMap<String, String>,
    /// Permitted kinds; empty means unrestricted.
    pub kind_allowlist: BTreeSet<String>,
    /// Extra doxygen text added to every module header.
    pub module_doc: Option<String>,
}

impl Default for FortranOptions {
    fn default() -> Self {
        Self {
            helper_module: "nml_helper".to_string(),
            kind_module: None,
            kind_map: BTreeMap::new(),
            kind_allowlist: BTreeSet::new(),
            module_doc: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ProcedureNames {
    set_default: String,
    init: String,
    from_file: String,
    is_set: String,
    is_valid: String,
}

#[derive(Debug, Serialize)]
struct ModuleContext {
    file_name: String,
    module: String,
    brief: String,
    description: Vec<String>,
    module_doc: Vec<String>,
    namelist: String,
    type_name: String,
    procedures: ProcedureNames,
    kind_use: Option<String>,
    uses_ieee: bool,
    helper_module: String,
    helper_imports: Vec<String>,
    parameters: Vec<String>,
    fields: Vec<FieldContext>,
    bounds_locals: Option<String>,
    namelist_items: Vec<String>,
    is_valid: Vec<String>,
    checks: Vec<CheckFunction>,
}

/// `nml_<namelist>`.
pub fn module_name(namelist: &str) -> String {
    format!("nml_{namelist}")
}

/// `<namelist>_t`.
pub fn type_name(namelist: &str) -> String {
    format!("{namelist}_t")
}

fn procedure_names(namelist: &str) -> ProcedureNames {
    ProcedureNames {
        set_default: format!("{namelist}_set_default"),
        init: format!("{namelist}_init"),
        from_file: format!("{namelist}_from_file"),
        is_set: format!("{namelist}_is_set"),
        is_valid: format!("{namelist}_is_valid"),
    }
}

/// Append `, &` to every entry but the last.
fn continued(items: &[String]) -> Vec<String> {
    let last = items.len().saturating_sub(1);
    items
        .iter()
        .enumerate()
        .map(|(i, item)| if i == last { item.clone() } else { format!("{item}, &") })
        .collect()
}

fn doc_lines(text: Option<&str>) -> Vec<String> {
    text.map(|t| t.lines().map(|l| l.trim_end().to_string()).collect())
        .unwrap_or_default()
}

/// Kinds in first-use order, checked against the options.
fn used_kinds<'a>(schema: &'a NamelistSchema, options: &FortranOptions) -> NmlResult<Vec<&'a str>> {
    let mut kinds: Vec<&str> = Vec::new();
    for prop in &schema.properties {
        let Some(kind) = prop.ty.kind() else { continue };
        if options.kind_module.is_none() {
            return Err(ConfigError::new(format!(
                "kind '{kind}' is used but no kind module is configured"
            ))
            .with_property(&prop.name)
            .into());
        }
        if !options.kind_allowlist.is_empty() && !options.kind_allowlist.contains(kind) {
            return Err(ConfigError::new(format!("kind '{kind}' is not in the configured kind allowlist"))
                .with_property(&prop.name)
                .into());
        }
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

fn kind_use_line(kinds: &[&str], options: &FortranOptions) -> Option<String> {
    let module = options.kind_module.as_deref()?;
    if kinds.is_empty() {
        return None;
    }
    let items: Vec<String> = kinds
        .iter()
        .map(|&k| match options.kind_map.get(k) {
            Some(target) if target != k => format!("{k} => {target}"),
            _ => k.to_string(),
        })
        .collect();
    Some(format!("use {module}, only: {}", items.join(", ")))
}

/// Named constants in first-use order.
fn used_constants(schema: &NamelistSchema) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for prop in &schema.properties {
        for name in prop.ty.constants() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

/// Module-scope symbols a property adds besides its own name.
fn generated_symbols(prop: &Property) -> Vec<String> {
    let mut out = Vec::new();
    if prop.has_default() {
        out.push(default_name(&prop.name));
    }
    if let DefaultSpec::Array(a) = &prop.default {
        if matches!(a.padding, Padding::Scalar(_) | Padding::List(_)) {
            out.push(pad_name(&prop.name));
        }
    }
    if prop.enumeration.is_some() {
        out.push(enum_values_name(&prop.name));
        out.push(in_enum_name(&prop.name));
    }
    if prop.bounds.is_some() {
        out.push(in_bounds_name(&prop.name));
    }
    out
}

fn is_bounds_local(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    ["lb_", "ub_"].iter().any(|p| {
        lower
            .strip_prefix(p)
            .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
    })
}

/// Reject property names that would clash with anything else in scope.
fn check_names(
    schema: &NamelistSchema,
    imports: &[String],
    kinds: &[&str],
    options: &FortranOptions,
) -> Result<(), SchemaError> {
    fn reserve(name: &str, owner: String, taken: &mut HashMap<String, String>) {
        taken.entry(name.to_ascii_lowercase()).or_insert(owner);
    }

    let mut taken: HashMap<String, String> = HashMap::new();

    for &name in PROCEDURE_LOCALS {
        reserve(name, "a generated procedure local".to_string(), &mut taken);
    }
    for &name in INTRINSICS {
        reserve(name, "an intrinsic used by generated code".to_string(), &mut taken);
    }
    for name in imports {
        reserve(name, format!("a symbol imported from {}", options.helper_module), &mut taken);
    }
    for &kind in kinds {
        reserve(kind, "a kind parameter".to_string(), &mut taken);
    }
    let procs = procedure_names(&schema.name);
    for name in [
        schema.name.clone(),
        module_name(&schema.name),
        type_name(&schema.name),
        procs.set_default,
        procs.init,
        procs.from_file,
        procs.is_set,
        procs.is_valid,
    ] {
        reserve(&name, "a generated module symbol".to_string(), &mut taken);
    }

    for prop in &schema.properties {
        for symbol in generated_symbols(prop) {
            if symbol.len() > MAX_NAME_LEN {
                return Err(SchemaError::for_property(
                    prop.name.clone(),
                    format!("generated name '{symbol}' exceeds {MAX_NAME_LEN} characters"),
                ));
            }
            let key = symbol.to_ascii_lowercase();
            if let Some(owner) = taken.get(&key) {
                return Err(SchemaError::for_property(
                    prop.name.clone(),
                    format!("generated name '{symbol}' collides with {owner}"),
                ));
            }
            taken.insert(key, format!("a symbol generated for '{}'", prop.name));
        }
    }

    for prop in &schema.properties {
        if is_bounds_local(&prop.name) {
            return Err(SchemaError::for_property(
                prop.name.clone(),
                "name collides with a generated bounds local",
            ));
        }
        if let Some(owner) = taken.get(&prop.name.to_ascii_lowercase()) {
            return Err(SchemaError::for_property(
                prop.name.clone(),
                format!("name collides with {owner}"),
            ));
        }
    }
    Ok(())
}

/// Render the Fortran module for `schema`.
///
/// # Errors
///
/// `SchemaError` for empty schemas and name collisions, `ConfigError` for
/// kinds that are not configured, `NmlError::Render` if the backend fails.
pub fn generate_fortran<R: Renderer + ?Sized>(
    schema: &NamelistSchema,
    options: &FortranOptions,
    renderer: &R,
) -> NmlResult<String> {
    if schema.properties.is_empty() {
        return Err(SchemaError::new(format!(
            "namelist '{}' has no properties",
            schema.name
        ))
        .into());
    }

    let kinds = used_kinds(schema, options)?;
    let mut imports: Vec<String> = HELPER_IMPORTS.iter().map(|s| s.to_string()).collect();
    if schema.properties.iter().any(needs_partly_set) {
        imports.push(PARTLY_SET.to_string());
    }
    imports.extend(used_constants(schema).into_iter().map(str::to_string));
    check_names(schema, &imports, &kinds, options)?;

    let max_slice_rank = schema.properties.iter().map(slice_rank).max().unwrap_or(0);
    let bounds_locals = (max_slice_rank > 0).then(|| {
        let names: Vec<String> = (1..=max_slice_rank)
            .flat_map(|i| [format!("lb_{i}"), format!("ub_{i}")])
            .collect();
        format!("integer :: {}", names.join(", "))
    });

    let names: Vec<String> = schema.properties.iter().map(|p| p.name.clone()).collect();
    let module = module_name(&schema.name);
    let context = ModuleContext {
        file_name: format!("{module}.f90"),
        brief: schema.display_title().to_string(),
        description: doc_lines(schema.description.as_deref()),
        module_doc: doc_lines(options.module_doc.as_deref()),
        namelist: schema.name.clone(),
        type_name: type_name(&schema.name),
        procedures: procedure_names(&schema.name),
        kind_use: kind_use_line(&kinds, options),
        uses_ieee: schema
            .properties
            .iter()
            .any(|p| p.category() == ScalarCategory::Real),
        helper_module: options.helper_module.clone(),
        helper_imports: continued(&imports),
        parameters: schema.properties.iter().flat_map(field::parameters).collect(),
        fields: schema
            .properties
            .iter()
            .map(|p| field_context(p, &schema.name))
            .collect(),
        bounds_locals,
        namelist_items: continued(&names),
        is_valid: schema.properties.iter().flat_map(is_valid_lines).collect(),
        checks: schema.properties.iter().flat_map(check_functions).collect(),
        module,
    };

    let text = render_with(renderer, FORTRAN_MODULE, &context)?;
    tracing::debug!(
        namelist = %schema.name,
        fields = schema.properties.len(),
        "generated Fortran module"
    );
    Ok(text)
}

/// Render the Fortran module for `schema` and write it to `path`.
pub fn write_fortran<R: Renderer + ?Sized>(
    schema: &NamelistSchema,
    path: &Path,
    options: &FortranOptions,
    renderer: &R,
) -> NmlResult<()> {
    let text = generate_fortran(schema, options, renderer)?;
    write_output(path, &text)
}
