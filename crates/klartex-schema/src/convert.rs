//! YAML to JSON value conversion and document loading.

use std::path::Path;

use serde_json::Value;
use thiserror::Error;

use crate::validate::SchemaError;

/// A YAML value with no JSON representation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct YamlConversionError(String);

/// Convert a `serde_yaml::Value` to a `serde_json::Value`.
///
/// Mapping order is preserved. Scalar map keys are stringified; tags are
/// dropped in favour of the tagged value. Composite map keys and non-finite
/// floats are rejected.
pub fn yaml_to_json_value(yaml: &serde_yaml::Value) -> Result<Value, YamlConversionError> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(i.into()))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(u.into()))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| YamlConversionError(format!("cannot represent float {f} in JSON")))
            } else {
                Err(YamlConversionError(format!("unsupported YAML number: {n:?}")))
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => seq
            .iter()
            .map(yaml_to_json_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        serde_yaml::Value::Mapping(map) => {
            let mut object = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => {
                        return Err(YamlConversionError(format!(
                            "unsupported YAML map key: {other:?}"
                        )))
                    }
                };
                object.insert(key, yaml_to_json_value(v)?);
            }
            Ok(Value::Object(object))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json_value(&tagged.value),
    }
}

/// Parse YAML text into the JSON value model.
pub fn parse_yaml(text: &str) -> Result<Value, YamlConversionError> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| YamlConversionError(format!("invalid YAML: {e}")))?;
    yaml_to_json_value(&yaml)
}

/// Read a JSON or YAML document from disk.
///
/// The format follows the extension: `.yaml`/`.yml` are YAML, anything else
/// is JSON.
pub fn load_document(path: &Path) -> Result<Value, SchemaError> {
    let load_err = |reason: String| SchemaError::DocumentLoad {
        path: path.display().to_string(),
        reason,
    };
    let content =
        std::fs::read_to_string(path).map_err(|e| load_err(format!("cannot read file: {e}")))?;

    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "yaml" | "yml" => parse_yaml(&content).map_err(|e| load_err(e.to_string())),
        _ => serde_json::from_str(&content).map_err(|e| load_err(format!("invalid JSON: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_to_json_conversion() {
        let json_value = parse_yaml(
            r#"
name: protokoll
version: "1.0.0"
count: 42
ratio: 0.25
enabled: true
items:
  - one
  - two
"#,
        )
        .unwrap();
        assert_eq!(json_value["name"], "protokoll");
        assert_eq!(json_value["version"], "1.0.0");
        assert_eq!(json_value["count"], 42);
        assert_eq!(json_value["ratio"], 0.25);
        assert_eq!(json_value["enabled"], true);
        assert_eq!(json_value["items"][1], "two");
    }

    #[test]
    fn test_mapping_order_preserved() {
        let value = parse_yaml("zeta: 1\nalpha: 2\nmid: 3\n").unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_scalar_keys_stringified() {
        let value = parse_yaml("1: one\ntrue: yes\n").unwrap();
        assert_eq!(value["1"], "one");
        assert_eq!(value["true"], "yes");
    }

    #[test]
    fn test_composite_key_rejected() {
        assert!(parse_yaml("? [a, b]\n: value\n").is_err());
    }

    #[test]
    fn test_non_finite_float_rejected() {
        assert!(parse_yaml("x: .inf\n").is_err());
    }

    #[test]
    fn test_tag_dropped() {
        let value = parse_yaml("x: !custom hello\n").unwrap();
        assert_eq!(value["x"], "hello");
    }
}
