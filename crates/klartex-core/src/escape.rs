//! # Markup Escaping — Neutralising Untrusted Strings
//!
//! Every string a caller submits ends up inside typesetter source text. The
//! functions here replace each control character of the target markup with a
//! sequence that typesets the character literally, so user data can never
//! open a group, start a command, or switch into math mode.
//!
//! ## Invariant
//!
//! Escaping is a single left-to-right pass: characters are mapped once and
//! the output is never re-scanned. The braces and backslashes introduced by
//! a replacement (for example the `{}` of `\textbackslash{}`) are therefore
//! never escaped a second time, and no in-band placeholder exists that user
//! input could collide with.
//!
//! The functions are total and side-effect free.

use serde_json::{Map, Value};

/// Returns the literal-producing sequence for a markup control character.
fn replacement(c: char) -> Option<&'static str> {
    match c {
        '\\' => Some(r"\textbackslash{}"),
        '{' => Some(r"\{"),
        '}' => Some(r"\}"),
        '$' => Some(r"\$"),
        '#' => Some(r"\#"),
        '%' => Some(r"\%"),
        '&' => Some(r"\&"),
        '_' => Some(r"\_"),
        '~' => Some(r"\textasciitilde{}"),
        '^' => Some(r"\textasciicircum{}"),
        _ => None,
    }
}

/// Escape markup control characters in a single string.
pub fn escape_str(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / 8);
    for c in input.chars() {
        match replacement(c) {
            Some(seq) => out.push_str(seq),
            None => out.push(c),
        }
    }
    out
}

/// Recursively escape every string leaf of a value.
///
/// The result is structurally identical to the input: map keys and their
/// order are kept, and numbers, booleans and nulls pass through unchanged.
pub fn escape_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(escape_str(s)),
        Value::Array(items) => Value::Array(items.iter().map(escape_value).collect()),
        Value::Object(map) => {
            let mut escaped = Map::with_capacity(map.len());
            for (key, item) in map {
                escaped.insert(key.clone(), escape_value(item));
            }
            Value::Object(escaped)
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(escape_str("Hello world"), "Hello world");
        assert_eq!(escape_str("Styrelsemöte för året"), "Styrelsemöte för året");
    }

    #[test]
    fn test_special_chars() {
        assert_eq!(escape_str("$100"), r"\$100");
        assert_eq!(escape_str("50%"), r"50\%");
        assert_eq!(escape_str("A & B"), r"A \& B");
        assert_eq!(escape_str("foo_bar"), r"foo\_bar");
        assert_eq!(escape_str("#1"), r"\#1");
    }

    #[test]
    fn test_braces() {
        assert_eq!(escape_str("{test}"), r"\{test\}");
    }

    #[test]
    fn test_backslash_is_not_reescaped() {
        assert_eq!(escape_str("a\\b"), r"a\textbackslash{}b");
        assert_eq!(escape_str("\\{"), r"\textbackslash{}\{");
    }

    #[test]
    fn test_tilde_and_caret() {
        assert_eq!(escape_str("~"), r"\textasciitilde{}");
        assert_eq!(escape_str("^"), r"\textasciicircum{}");
    }

    #[test]
    fn test_injection_attempt_is_neutralised() {
        assert_eq!(
            escape_str(r"\input{/etc/passwd}"),
            r"\textbackslash{}input\{/etc/passwd\}"
        );
    }

    #[test]
    fn test_nul_bytes_are_ordinary_characters() {
        assert_eq!(escape_str("a\u{0}b\\"), "a\u{0}b\\textbackslash{}");
    }

    #[test]
    fn test_escape_value_recursive() {
        let data = json!({
            "name": "A & B",
            "items": ["$10", "20%"],
            "count": 42,
            "ratio": 0.5,
            "active": true,
            "note": null,
        });
        let result = escape_value(&data);
        assert_eq!(result["name"], r"A \& B");
        assert_eq!(result["items"], json!([r"\$10", r"20\%"]));
        assert_eq!(result["count"], 42);
        assert_eq!(result["ratio"], 0.5);
        assert_eq!(result["active"], true);
        assert!(result["note"].is_null());
    }

    #[test]
    fn test_escape_value_keeps_keys_and_order() {
        let data = json!({"z_last": "x", "a_first": {"snake_key": "y_z"}});
        let result = escape_value(&data);
        let keys: Vec<&str> = result.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z_last", "a_first"]);
        assert_eq!(result["a_first"]["snake_key"], r"y\_z");
    }
}
