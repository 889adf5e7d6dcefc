//! # Dotted Paths — Best-Effort Data Binding
//!
//! Recipes bind component parameters and metadata rows to payload fields
//! with dotted paths such as `party1.name`. Resolution never fails: a path
//! that leaves the payload simply resolves to nothing.

use serde_json::Value;

/// Walk `path` through nested maps of `root`, one `.`-separated key at a time.
///
/// Returns `None` as soon as a key is absent or an intermediate value is not
/// a map. Array indices are not interpreted. A present JSON `null` is
/// returned as `Some(&Value::Null)`; callers that treat null as absent use
/// [`present`].
pub fn resolve_dotted_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for key in path.split('.') {
        current = current.as_object()?.get(key)?;
    }
    Some(current)
}

/// Filters out JSON `null`, which data binding treats the same as absence.
pub fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Text shown for a resolved value in a metadata row or a suffix.
///
/// Strings are used verbatim, scalars use their JSON spelling, and `null`
/// renders as the empty string.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_path() {
        let data = json!({"name": "Alice"});
        assert_eq!(resolve_dotted_path(&data, "name"), Some(&json!("Alice")));
    }

    #[test]
    fn test_nested_path() {
        let data = json!({"party1": {"name": "Acme", "org_number": "123"}});
        assert_eq!(resolve_dotted_path(&data, "party1.name"), Some(&json!("Acme")));
    }

    #[test]
    fn test_missing_path_returns_none() {
        let data = json!({"name": "Alice"});
        assert_eq!(resolve_dotted_path(&data, "missing"), None);
    }

    #[test]
    fn test_missing_nested_path_returns_none() {
        let data = json!({"party1": {"name": "Acme"}});
        assert_eq!(resolve_dotted_path(&data, "party1.missing"), None);
    }

    #[test]
    fn test_deeply_nested_missing_returns_none() {
        let data = json!({"a": {"b": {"c": 1}}});
        assert_eq!(resolve_dotted_path(&data, "a.b.missing.deep"), None);
    }

    #[test]
    fn test_intermediate_non_map_returns_none() {
        let data = json!({"a": "scalar", "list": [{"x": 1}]});
        assert_eq!(resolve_dotted_path(&data, "a.b"), None);
        assert_eq!(resolve_dotted_path(&data, "list.0.x"), None);
    }

    #[test]
    fn test_null_is_present_but_filtered() {
        let data = json!({"note": null});
        assert_eq!(resolve_dotted_path(&data, "note"), Some(&Value::Null));
        assert_eq!(present(resolve_dotted_path(&data, "note")), None);
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!("text")), "text");
        assert_eq!(display_value(&json!(12)), "12");
        assert_eq!(display_value(&json!(true)), "true");
        assert_eq!(display_value(&Value::Null), "");
    }
}
