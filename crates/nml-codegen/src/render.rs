//! # Rendering Boundary
//!
//! Emitters build a flat, serializable context and hand it to a
//! [`Renderer`] by template name. They never inspect template internals.
//!
//! [`HandlebarsRenderer`] is the shipped backend: the templates are
//! compiled into the binary, strict mode makes a missing context key an
//! error, and HTML escaping is disabled because every output is plain
//! source text.

use handlebars::Handlebars;
use nml_core::{NmlError, NmlResult};
use serde::Serialize;
use serde_json::Value;

/// Template for a generated namelist module.
pub const FORTRAN_MODULE: &str = "fortran_module";
/// Template for the shared Fortran helper module.
pub const FORTRAN_HELPER: &str = "fortran_helper";
/// Template for Markdown documentation.
pub const MARKDOWN: &str = "markdown";
/// Template for namelist template files.
pub const NAMELIST_TEMPLATE: &str = "namelist_template";

const TEMPLATES: &[(&str, &str)] = &[
    (FORTRAN_MODULE, include_str!("../templates/fortran_module.f90.hbs")),
    (FORTRAN_HELPER, include_str!("../templates/fortran_helper.f90.hbs")),
    (MARKDOWN, include_str!("../templates/markdown.md.hbs")),
    (NAMELIST_TEMPLATE, include_str!("../templates/namelist.nml.hbs")),
];

/// `render(template_name, context) -> text`.
pub trait Renderer {
    /// Render `template` with `context`.
    ///
    /// # Errors
    ///
    /// `NmlError::Render` if the template is unknown or references a key
    /// the context does not provide.
    fn render(&self, template: &str, context: &Value) -> NmlResult<String>;
}

/// Serialize `context` and render it through `renderer`.
pub fn render_with<R, C>(renderer: &R, template: &str, context: &C) -> NmlResult<String>
where
    R: Renderer + ?Sized,
    C: Serialize,
{
    let value = serde_json::to_value(context).map_err(|e| NmlError::Render {
        template: template.to_string(),
        reason: format!("context is not serializable: {e}"),
    })?;
    renderer.render(template, &value)
}

/// Strict Handlebars backend with the embedded templates registered.
pub struct HandlebarsRenderer {
    registry: Handlebars<'static>,
}

impl std::fmt::Debug for HandlebarsRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlebarsRenderer")
            .field("templates", &TEMPLATES.len())
            .finish_non_exhaustive()
    }
}

impl HandlebarsRenderer {
    /// Build the registry.
    ///
    /// # Errors
    ///
    /// `NmlError::Render` if an embedded template fails to compile.
    pub fn new() -> NmlResult<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        for &(name, text) in TEMPLATES {
            registry
                .register_template_string(name, text)
                .map_err(|e| NmlError::Render {
                    template: name.to_string(),
                    reason: e.to_string(),
                })?;
        }
        Ok(Self { registry })
    }
}

impl Renderer for HandlebarsRenderer {
    fn render(&self, template: &str, context: &Value) -> NmlResult<String> {
        self.registry
            .render(template, context)
            .map_err(|e| NmlError::Render {
                template: template.to_string(),
                reason: e.to_string(),
            })
    }
}
