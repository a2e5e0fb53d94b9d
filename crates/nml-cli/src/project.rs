//! # Project Schemas
//!
//! Loads and resolves every schema listed under `[[nml-files]]`.

use anyhow::{bail, Context, Result};
use serde_json::Value;

use nml_schema::{load_schema, NamelistSchema};

use crate::config::{Config, NmlFile};

/// A configured schema: its entry, the raw document and the resolved model.
#[derive(Debug, Clone)]
pub struct LoadedSchema {
    pub file: NmlFile,
    /// Kept for the validator, which works on the document itself.
    pub raw: Value,
    pub schema: NamelistSchema,
}

/// Load and resolve all configured schemas, in config order.
///
/// Fails on the first schema that cannot be read or resolved, and when two
/// schemas declare the same namelist name.
pub fn load_schemas(config: &Config) -> Result<Vec<LoadedSchema>> {
    let constants = config.constants();
    let mut loaded: Vec<LoadedSchema> = Vec::with_capacity(config.nml_files.len());
    for file in &config.nml_files {
        let path = &file.schema;
        let raw = load_schema(path).with_context(|| format!("failed to load schema: {}", path.display()))?;
        let schema = NamelistSchema::resolve(&raw, &constants)
            .with_context(|| format!("invalid schema: {}", path.display()))?;
        if let Some(other) = loaded
            .iter()
            .find(|l| l.schema.name.eq_ignore_ascii_case(&schema.name))
        {
            bail!(
                "namelist '{}' is declared by both {} and {}",
                schema.name,
                other.file.schema.display(),
                path.display()
            );
        }
        tracing::debug!(
            namelist = %schema.name,
            properties = schema.properties.len(),
            path = %path.display(),
            "resolved schema"
        );
        loaded.push(LoadedSchema {
            file: file.clone(),
            raw,
            schema,
        });
    }
    Ok(loaded)
}

/// Find the schema for a namelist group name.
pub fn find_schema<'a>(schemas: &'a [LoadedSchema], group: &str) -> Option<&'a LoadedSchema> {
    schemas
        .iter()
        .find(|l| l.schema.name.eq_ignore_ascii_case(group))
}
