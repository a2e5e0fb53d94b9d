//! # Markdown Emitter
//!
//! One document per namelist: title, description, a summary table with a
//! row per field, a detail section per field, and a filled example
//! produced by the template emitter in plain/filled mode.

use std::path::Path;

use nml_core::NmlResult;
use nml_schema::{NamelistSchema, Property};
use serde::Serialize;

use crate::describe::{default_summary, example_text, shape_text};
use crate::output::write_output;
use crate::render::{render_with, Renderer, MARKDOWN};
use crate::template::{render_template, DocMode, Overrides, TemplateOptions, ValueMode};

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownOptions {
    /// Append `{#<namelist>}` to the title so doxygen can link to it.
    pub doxygen_id_from_name: bool,
    /// Put a `[TOC]` line after the title.
    pub add_toc_statement: bool,
}

#[derive(Debug, Serialize)]
struct RowContext {
    name: String,
    ty: String,
    required: &'static str,
    default: String,
    summary: String,
}

#[derive(Debug, Serialize)]
struct FieldDoc {
    name: String,
    text: Vec<String>,
    bullets: Vec<String>,
}

#[derive(Debug, Serialize)]
struct MarkdownContext {
    header: String,
    description: Option<String>,
    name: String,
    rows: Vec<RowContext>,
    fields: Vec<FieldDoc>,
    example: String,
}

fn header(schema: &NamelistSchema, options: &MarkdownOptions) -> String {
    let mut out = format!("# {}", schema.display_title());
    if options.doxygen_id_from_name {
        out.push_str(&format!(" {{#{}}}", schema.name));
    }
    if options.add_toc_statement {
        out.push_str("\n\n[TOC]");
    }
    out
}

fn table_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

fn row(prop: &Property) -> RowContext {
    RowContext {
        name: prop.name.clone(),
        ty: prop.ty.declaration(),
        required: if prop.required { "yes" } else { "no" },
        default: default_summary(prop)
            .map(|d| table_cell(&d.render("`")))
            .unwrap_or_else(|| "-".to_string()),
        summary: prop.summary().map(table_cell).unwrap_or_default(),
    }
}

fn bullets(prop: &Property) -> Vec<String> {
    let mut out = vec![
        format!("Type: `{}`", prop.ty.declaration()),
        format!("Required: {}", if prop.required { "yes" } else { "no" }),
    ];
    if let Some(shape) = shape_text(prop) {
        out.push(format!("Shape: `{shape}`"));
    }
    if prop.flex_tail_dims > 0 {
        out.push(format!(
            "Flexible trailing dimensions: {} (extents are upper bounds)",
            prop.flex_tail_dims
        ));
    }
    if let Some(d) = default_summary(prop) {
        out.push(format!("Default: {}", d.render("`")));
    }
    if let Some(e) = &prop.enumeration {
        let values: Vec<String> = e.values().iter().map(|v| format!("`{v}`")).collect();
        out.push(format!("Allowed values: {}", values.join(", ")));
    }
    if let Some(b) = &prop.bounds {
        if let Some(min) = b.describe_min() {
            out.push(format!("Minimum: `{min}`"));
        }
        if let Some(max) = b.describe_max() {
            out.push(format!("Maximum: `{max}`"));
        }
    }
    if !prop.examples.is_empty() {
        let examples: Vec<String> = prop.examples.iter().map(|e| format!("`{}`", example_text(e))).collect();
        out.push(format!("Examples: {}", examples.join(", ")));
    }
    out
}

fn field_text(prop: &Property) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(title) = &prop.title {
        out.push(format!("**{title}**"));
    }
    if let Some(description) = &prop.description {
        out.push(description.clone());
    }
    out
}

/// Render the Markdown document for `schema`.
///
/// # Errors
///
/// `NmlError::Render` if the backend fails.
pub fn generate_docs<R: Renderer + ?Sized>(
    schema: &NamelistSchema,
    options: &MarkdownOptions,
    renderer: &R,
) -> NmlResult<String> {
    let example = render_template(
        std::slice::from_ref(schema),
        &TemplateOptions {
            doc_mode: DocMode::Plain,
            value_mode: ValueMode::Filled,
        },
        &Overrides::new(),
        renderer,
    )?;
    let context = MarkdownContext {
        header: header(schema, options),
        description: schema.description.clone(),
        name: schema.name.clone(),
        rows: schema.properties.iter().map(row).collect(),
        fields: schema
            .properties
            .iter()
            .map(|p| FieldDoc {
                name: p.name.clone(),
                text: field_text(p),
                bullets: bullets(p),
            })
            .collect(),
        example,
    };
    let text = render_with(renderer, MARKDOWN, &context)?;
    tracing::debug!(namelist = %schema.name, "generated markdown");
    Ok(text)
}

/// Render the Markdown document and write it to `path`.
pub fn write_docs<R: Renderer + ?Sized>(
    schema: &NamelistSchema,
    path: &Path,
    options: &MarkdownOptions,
    renderer: &R,
) -> NmlResult<()> {
    let text = generate_docs(schema, options, renderer)?;
    write_output(path, &text)
}
