//! # Configuration — `nml-config.toml`
//!
//! Loads the project configuration that drives every subcommand: the helper
//! module, the kind module and its allowlist, named constants, output
//! options and the list of schemas with their output paths.
//!
//! Every path in the file is resolved relative to the directory containing
//! the config file.
//!
//! ```toml
//! helper_path = "out/nml_helper.f90"
//!
//! [kinds]
//! module = "mo_kind"
//! map = { i4 = "int32" }
//! integer = ["i4"]
//!
//! [constants]
//! max_layers = { value = 3, doc = "maximum number of layers" }
//!
//! [[nml-files]]
//! schema = "schemas/layers.yml"
//! mod_path = "out/nml_layers.f90"
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use nml_codegen::{DocMode, FortranOptions, HelperConstant, MarkdownOptions, Overrides, TemplateOptions, ValueMode};
use nml_core::{is_identifier, ConstantValue, Constants};

/// Config file used when `--config` is not given.
pub const DEFAULT_CONFIG: &str = "nml-config.toml";

const DEFAULT_HELPER_MODULE: &str = "nml_helper";

#[derive(Debug, Deserialize)]
struct RawConfig {
    helper_path: Option<String>,
    helper_module: Option<String>,
    kinds: Option<RawKinds>,
    #[serde(default)]
    constants: BTreeMap<String, toml::Value>,
    #[serde(default)]
    documentation: RawDocumentation,
    #[serde(default)]
    markdown: RawMarkdown,
    #[serde(default)]
    template: RawTemplate,
    #[serde(default, rename = "nml-files")]
    nml_files: Vec<RawNmlFile>,
}

#[derive(Debug, Deserialize)]
struct RawKinds {
    module: String,
    #[serde(default)]
    map: BTreeMap<String, String>,
    #[serde(default)]
    real: Vec<String>,
    #[serde(default)]
    integer: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDocumentation {
    module: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMarkdown {
    doxygen_id_from_name: bool,
    add_toc_statement: bool,
}

#[derive(Debug, Default, Deserialize)]
struct RawTemplate {
    doc_mode: Option<String>,
    value_mode: Option<String>,
    #[serde(default)]
    values: BTreeMap<String, toml::Table>,
}

#[derive(Debug, Deserialize)]
struct RawNmlFile {
    schema: String,
    mod_path: Option<String>,
    doc_path: Option<String>,
    temp_path: Option<String>,
}

/// One `[[nml-files]]` entry with resolved paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NmlFile {
    /// Schema document (`.json`, `.yml` or `.yaml`).
    pub schema: PathBuf,
    /// Generated Fortran module.
    pub mod_path: Option<PathBuf>,
    /// Generated Markdown documentation.
    pub doc_path: Option<PathBuf>,
    /// Generated namelist template.
    pub temp_path: Option<PathBuf>,
}

/// Parsed and checked `nml-config.toml`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the relative paths were resolved against.
    pub base_dir: PathBuf,
    /// Where to write the helper module; `None` skips it.
    pub helper_path: Option<PathBuf>,
    pub helper_module: String,
    pub kind_module: Option<String>,
    pub kind_map: BTreeMap<String, String>,
    /// Union of `kinds.real` and `kinds.integer`.
    pub kind_allowlist: BTreeSet<String>,
    /// Constants in name order.
    pub constants: Vec<HelperConstant>,
    pub module_doc: Option<String>,
    pub markdown: MarkdownOptions,
    pub template: TemplateOptions,
    /// `[template.values.<namelist>]` tables.
    pub overrides: Overrides,
    pub nml_files: Vec<NmlFile>,
}

impl Config {
    /// Read and check the config file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let config = Self::from_toml_str(&text, base_dir)
            .with_context(|| format!("invalid config: {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            nml_files = config.nml_files.len(),
            constants = config.constants.len(),
            "loaded config"
        );
        Ok(config)
    }

    /// Parse config text, resolving relative paths against `base_dir`.
    pub fn from_toml_str(text: &str, base_dir: &Path) -> Result<Self> {
        let raw: RawConfig = toml::from_str(text).context("config is not valid TOML")?;

        let helper_module = raw
            .helper_module
            .as_deref()
            .unwrap_or(DEFAULT_HELPER_MODULE)
            .trim()
            .to_string();
        if helper_module.is_empty() {
            bail!("config 'helper_module' must be a non-empty string");
        }
        if !is_identifier(&helper_module) {
            bail!("config 'helper_module' is not a valid Fortran identifier: '{helper_module}'");
        }

        let (kind_module, kind_map, kind_allowlist) = match raw.kinds {
            Some(kinds) => {
                let module = kinds.module.trim().to_string();
                if module.is_empty() {
                    bail!("config 'kinds.module' must be a non-empty string");
                }
                let allowlist = kinds.real.into_iter().chain(kinds.integer).collect();
                (Some(module), kinds.map, allowlist)
            }
            None => (None, BTreeMap::new(), BTreeSet::new()),
        };

        let constants = raw
            .constants
            .iter()
            .map(|(name, value)| parse_constant(name, value))
            .collect::<Result<Vec<_>>>()?;

        let template = TemplateOptions {
            doc_mode: match raw.template.doc_mode.as_deref() {
                Some(s) => s.parse::<DocMode>().context("config 'template.doc_mode'")?,
                None => DocMode::default(),
            },
            value_mode: match raw.template.value_mode.as_deref() {
                Some(s) => s.parse::<ValueMode>().context("config 'template.value_mode'")?,
                None => ValueMode::default(),
            },
        };

        let mut overrides = Overrides::new();
        for (namelist, table) in raw.template.values {
            let values = match serde_json::to_value(&table)? {
                serde_json::Value::Object(map) => map,
                _ => bail!("config 'template.values.{namelist}' must be a table"),
            };
            overrides.insert(namelist, values);
        }

        if raw.nml_files.is_empty() {
            bail!("config must define non-empty 'nml-files'");
        }
        let resolve = |p: &Option<String>| p.as_ref().map(|p| base_dir.join(p));
        let nml_files = raw
            .nml_files
            .iter()
            .map(|entry| NmlFile {
                schema: base_dir.join(&entry.schema),
                mod_path: resolve(&entry.mod_path),
                doc_path: resolve(&entry.doc_path),
                temp_path: resolve(&entry.temp_path),
            })
            .collect();

        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            helper_path: resolve(&raw.helper_path),
            helper_module,
            kind_module,
            kind_map,
            kind_allowlist,
            constants,
            module_doc: raw.documentation.module,
            markdown: MarkdownOptions {
                doxygen_id_from_name: raw.markdown.doxygen_id_from_name,
                add_toc_statement: raw.markdown.add_toc_statement,
            },
            template,
            overrides,
            nml_files,
        })
    }

    /// The constants table used to resolve dimensions and lengths.
    pub fn constants(&self) -> Constants {
        self.constants
            .iter()
            .map(|c| (c.name.clone(), c.value))
            .collect()
    }

    /// Options for the Fortran module emitter.
    pub fn fortran_options(&self) -> FortranOptions {
        FortranOptions {
            helper_module: self.helper_module.clone(),
            kind_module: self.kind_module.clone(),
            kind_map: self.kind_map.clone(),
            kind_allowlist: self.kind_allowlist.clone(),
            module_doc: self.module_doc.clone(),
        }
    }
}

fn parse_constant(name: &str, raw: &toml::Value) -> Result<HelperConstant> {
    if !is_identifier(name) {
        bail!("config constant '{name}' is not a valid Fortran identifier");
    }
    let (value, doc) = match raw {
        toml::Value::Table(table) => {
            let value = table
                .get("value")
                .with_context(|| format!("config 'constants.{name}' must define 'value'"))?;
            let doc = match table.get("doc") {
                None => None,
                Some(toml::Value::String(s)) => Some(s.clone()),
                Some(_) => bail!("config 'constants.{name}.doc' must be a string"),
            };
            (value, doc)
        }
        other => (other, None),
    };
    let value = match value {
        toml::Value::Integer(i) => ConstantValue::Integer(*i),
        toml::Value::Float(f) => ConstantValue::Real(*f),
        _ => bail!("config 'constants.{name}' must be an integer or real"),
    };
    Ok(HelperConstant {
        name: name.to_string(),
        value,
        doc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[[nml-files]]
schema = "a.yml"
"#;

    fn parse(text: &str) -> Result<Config> {
        Config::from_toml_str(text, Path::new("/proj"))
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = parse(MINIMAL).unwrap();
        assert_eq!(config.helper_module, "nml_helper");
        assert!(config.helper_path.is_none());
        assert!(config.kind_module.is_none());
        assert!(config.constants.is_empty());
        assert_eq!(config.template, TemplateOptions::default());
        assert_eq!(config.nml_files[0].schema, PathBuf::from("/proj/a.yml"));
        assert!(config.nml_files[0].mod_path.is_none());
    }

    #[test]
    fn paths_are_relative_to_the_config_directory() {
        let config = parse(
            r#"
helper_path = "out/nml_helper.f90"

[[nml-files]]
schema = "schemas/a.yml"
mod_path = "out/nml_a.f90"
doc_path = "docs/a.md"
temp_path = "out/a.nml"
"#,
        )
        .unwrap();
        assert_eq!(config.helper_path, Some(PathBuf::from("/proj/out/nml_helper.f90")));
        let file = &config.nml_files[0];
        assert_eq!(file.schema, PathBuf::from("/proj/schemas/a.yml"));
        assert_eq!(file.mod_path, Some(PathBuf::from("/proj/out/nml_a.f90")));
        assert_eq!(file.doc_path, Some(PathBuf::from("/proj/docs/a.md")));
        assert_eq!(file.temp_path, Some(PathBuf::from("/proj/out/a.nml")));
    }

    #[test]
    fn kinds_build_map_and_allowlist() {
        let config = parse(
            r#"
[kinds]
module = "mo_kind"
map = { i4 = "int32" }
real = ["dp"]
integer = ["i4", "i8"]

[[nml-files]]
schema = "a.yml"
"#,
        )
        .unwrap();
        let options = config.fortran_options();
        assert_eq!(options.kind_module.as_deref(), Some("mo_kind"));
        assert_eq!(options.kind_map.get("i4").map(String::as_str), Some("int32"));
        assert_eq!(
            options.kind_allowlist.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["dp", "i4", "i8"]
        );
    }

    #[test]
    fn empty_kind_module_is_rejected() {
        let err = parse("[kinds]\nmodule = \"  \"\n[[nml-files]]\nschema = \"a.yml\"\n").unwrap_err();
        assert!(format!("{err:#}").contains("kinds.module"));
    }

    #[test]
    fn constants_accept_tables_and_bare_numbers() {
        let config = parse(
            r#"
[constants]
max_layers = { value = 3, doc = "maximum number of layers" }
gravity = 9.81

[[nml-files]]
schema = "a.yml"
"#,
        )
        .unwrap();
        let constants = config.constants();
        assert_eq!(constants.get("max_layers"), Some(ConstantValue::Integer(3)));
        assert_eq!(constants.get("gravity"), Some(ConstantValue::Real(9.81)));
        let layers = config.constants.iter().find(|c| c.name == "max_layers").unwrap();
        assert_eq!(layers.doc.as_deref(), Some("maximum number of layers"));
    }

    #[test]
    fn boolean_constant_is_rejected() {
        let err = parse("[constants]\nflag = { value = true }\n[[nml-files]]\nschema = \"a.yml\"\n").unwrap_err();
        assert!(format!("{err:#}").contains("constants.flag"));
    }

    #[test]
    fn missing_nml_files_is_rejected() {
        let err = parse("helper_module = \"nml_helper\"\n").unwrap_err();
        assert!(format!("{err:#}").contains("nml-files"));
    }

    #[test]
    fn invalid_helper_module_is_rejected() {
        let err = parse("helper_module = \"1bad\"\n[[nml-files]]\nschema = \"a.yml\"\n").unwrap_err();
        assert!(format!("{err:#}").contains("helper_module"));
    }

    #[test]
    fn template_modes_and_values() {
        let config = parse(
            r#"
[template]
doc_mode = "plain"
value_mode = "minimal-filled"

[template.values.optimization]
niterations = 50

[[nml-files]]
schema = "a.yml"
"#,
        )
        .unwrap();
        assert_eq!(config.template.doc_mode, DocMode::Plain);
        assert_eq!(config.template.value_mode, ValueMode::MinimalFilled);
        assert_eq!(
            config.overrides["optimization"].get("niterations"),
            Some(&serde_json::json!(50))
        );
    }

    #[test]
    fn unknown_value_mode_is_rejected() {
        let err = parse("[template]\nvalue_mode = \"full\"\n[[nml-files]]\nschema = \"a.yml\"\n").unwrap_err();
        assert!(format!("{err:#}").contains("unknown value mode"));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nml-config.toml");
        std::fs::write(&path, MINIMAL).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.base_dir, dir.path());
        assert_eq!(config.nml_files[0].schema, dir.path().join("a.yml"));
    }
}
