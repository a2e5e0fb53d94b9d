//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error taxonomy shared by every nml-tools crate. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - [`SchemaError`]: the schema is malformed or self-inconsistent.
//! - [`ConfigError`]: a named constant or kind cannot be resolved against
//!   the configuration.
//! - [`ValidationError`]: an actual namelist value does not satisfy the schema.
//!
//! Each of the three carries an optional property tag. Outer layers call
//! `with_property`, which attaches the tag only when none is present, so a
//! message never names the same property twice.

use std::path::PathBuf;

use thiserror::Error;

fn tagged(property: Option<&str>, message: &str) -> String {
    match property {
        Some(name) => format!("{name}: {message}"),
        None => message.to_string(),
    }
}

/// The schema is malformed or self-inconsistent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", tagged(.property.as_deref(), .message))]
pub struct SchemaError {
    property: Option<String>,
    message: String,
}

impl SchemaError {
    /// Create an untagged schema error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            property: None,
            message: message.into(),
        }
    }

    /// Create a schema error already tagged with `property`.
    pub fn for_property(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            property: Some(property.into()),
            message: message.into(),
        }
    }

    /// Attach `property` unless the error is already tagged.
    pub fn with_property(mut self, property: &str) -> Self {
        if self.property.is_none() {
            self.property = Some(property.to_string());
        }
        self
    }

    /// The property this error refers to, if known.
    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    /// The untagged message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A named constant or kind does not resolve against the configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", tagged(.property.as_deref(), .message))]
pub struct ConfigError {
    property: Option<String>,
    message: String,
}

impl ConfigError {
    /// Create an untagged configuration error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            property: None,
            message: message.into(),
        }
    }

    /// Attach `property` unless the error is already tagged.
    pub fn with_property(mut self, property: &str) -> Self {
        if self.property.is_none() {
            self.property = Some(property.to_string());
        }
        self
    }

    /// The property this error refers to, if known.
    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    /// The untagged message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A namelist value violates the schema it is validated against.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", tagged(.property.as_deref(), .message))]
pub struct ValidationError {
    property: Option<String>,
    message: String,
}

impl ValidationError {
    /// Create an untagged validation error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            property: None,
            message: message.into(),
        }
    }

    /// Create a validation error already tagged with `property`.
    pub fn for_property(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            property: Some(property.into()),
            message: message.into(),
        }
    }

    /// Attach `property` unless the error is already tagged.
    pub fn with_property(mut self, property: &str) -> Self {
        if self.property.is_none() {
            self.property = Some(property.to_string());
        }
        self
    }

    /// The property this error refers to, if known.
    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    /// The untagged message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Top-level error type for nml-tools.
#[derive(Error, Debug)]
pub enum NmlError {
    /// Malformed or inconsistent schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Unresolved constant, kind outside the allowlist, bad option.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Namelist value rejected by the validator.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A schema or namelist document could not be parsed.
    #[error("parse error in {path}: {reason}")]
    Parse {
        /// Document the parser was reading.
        path: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// The rendering backend rejected a template or context.
    #[error("render error in template '{template}': {reason}")]
    Render {
        /// Template name.
        template: String,
        /// Backend diagnostic.
        reason: String,
    },

    /// IO error while reading or writing a file.
    #[error("io error for {}: {source}", .path.display())]
    Io {
        /// File that could not be read or written.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl NmlError {
    /// Attach `property` to a tagged error unless it already carries one.
    pub fn with_property(self, property: &str) -> Self {
        match self {
            Self::Schema(e) => Self::Schema(e.with_property(property)),
            Self::Config(e) => Self::Config(e.with_property(property)),
            Self::Validation(e) => Self::Validation(e.with_property(property)),
            other => other,
        }
    }

    /// The property tag of the inner error, if any.
    pub fn property(&self) -> Option<&str> {
        match self {
            Self::Schema(e) => e.property(),
            Self::Config(e) => e.property(),
            Self::Validation(e) => e.property(),
            _ => None,
        }
    }
}

/// Convenience alias used across the workspace.
pub type NmlResult<T> = Result<T, NmlError>;
