//! # Schema Loading
//!
//! Reads a namelist schema from `.json`, `.yml` or `.yaml` into a plain
//! JSON value tree. Property order is preserved: `serde_json` is built with
//! `preserve_order`, and YAML mappings are converted entry by entry.

use std::path::Path;

use nml_core::{NmlError, NmlResult};
use serde_json::Value;

/// Load a schema document from `path`.
///
/// # Errors
///
/// Returns `NmlError::Io` if the file cannot be read, and `NmlError::Parse`
/// if the extension is unsupported, the content does not parse, or the
/// root is not a mapping.
pub fn load_schema(path: &Path) -> NmlResult<Value> {
    let content = std::fs::read_to_string(path).map_err(|source| NmlError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let value = match ext.as_str() {
        "json" => parse_json(&content, path)?,
        "yaml" | "yml" => parse_yaml(&content, path)?,
        other => {
            return Err(NmlError::Parse {
                path: path.display().to_string(),
                reason: format!("unsupported schema extension '.{other}' (expected .json, .yml or .yaml)"),
            })
        }
    };

    if !value.is_object() {
        return Err(NmlError::Parse {
            path: path.display().to_string(),
            reason: "schema root must be a mapping".to_string(),
        });
    }
    tracing::debug!(path = %path.display(), "loaded schema");
    Ok(value)
}

fn parse_json(content: &str, path: &Path) -> NmlResult<Value> {
    serde_json::from_str(content).map_err(|e| NmlError::Parse {
        path: path.display().to_string(),
        reason: format!("invalid JSON: {e}"),
    })
}

fn parse_yaml(content: &str, path: &Path) -> NmlResult<Value> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content).map_err(|e| NmlError::Parse {
        path: path.display().to_string(),
        reason: format!("invalid YAML: {e}"),
    })?;
    yaml_to_json_value(&yaml).map_err(|reason| NmlError::Parse {
        path: path.display().to_string(),
        reason: format!("YAML-to-JSON conversion failed: {reason}"),
    })
}

/// Convert a `serde_yaml::Value` to a `serde_json::Value`.
///
/// Schemas only use the JSON-compatible subset of YAML. Non-finite floats
/// (`.nan`, `.inf`) have no JSON representation and are rejected here.
pub fn yaml_to_json_value(yaml: &serde_yaml::Value) -> Result<Value, String> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(serde_json::Number::from(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(serde_json::Number::from(u)))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("cannot represent float {f} in JSON"))
            } else {
                Err(format!("unsupported YAML number: {n:?}"))
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => {
            let items: Result<Vec<Value>, String> = seq.iter().map(yaml_to_json_value).collect();
            Ok(Value::Array(items?))
        }
        serde_yaml::Value::Mapping(map) => {
            let mut json_map = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported YAML map key type: {other:?}")),
                };
                json_map.insert(key, yaml_to_json_value(v)?);
            }
            Ok(Value::Object(json_map))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json_value(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn yaml_preserves_property_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "s.yml",
            "type: object\nx-fortran-namelist: demo\nproperties:\n  zeta: {type: integer}\n  alpha: {type: integer}\n  mid: {type: integer}\n",
        );
        let schema = load_schema(&path).unwrap();
        let keys: Vec<&String> = schema["properties"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn json_schema_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "s.json",
            r#"{"type": "object", "x-fortran-namelist": "demo", "properties": {}}"#,
        );
        let schema = load_schema(&path).unwrap();
        assert_eq!(schema["x-fortran-namelist"], "demo");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_schema(Path::new("/nonexistent/schema.yml")).unwrap_err();
        assert!(matches!(err, NmlError::Io { .. }));
    }

    #[test]
    fn non_mapping_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "s.yaml", "- 1\n- 2\n");
        let err = load_schema(&path).unwrap_err();
        assert!(err.to_string().contains("schema root must be a mapping"));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "s.toml", "a = 1\n");
        let err = load_schema(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported schema extension"));
    }

    #[test]
    fn yaml_nan_is_rejected() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("default: .nan").unwrap();
        assert!(yaml_to_json_value(&yaml).is_err());
    }
}
