//! Validation of documents read from disk, and of the template schemas
//! shipped in the workspace `templates/` directory.

use std::path::{Path, PathBuf};

use serde_json::json;
use tempfile::TempDir;

use klartex_core::{Classify, ErrorKind};
use klartex_schema::{validate_against, SchemaError, SchemaValidator};

fn shipped_schemas() -> Vec<PathBuf> {
    let templates = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../templates");
    let mut schemas: Vec<PathBuf> = std::fs::read_dir(&templates)
        .expect("templates directory")
        .filter_map(|entry| entry.ok().map(|e| e.path().join("schema.json")))
        .filter(|path| path.is_file())
        .collect();
    schemas.sort();
    schemas
}

#[test]
fn shipped_template_schemas_compile() {
    let schemas = shipped_schemas();
    assert!(!schemas.is_empty());
    for path in schemas {
        let text = std::fs::read_to_string(&path).unwrap();
        let schema: serde_json::Value = serde_json::from_str(&text).unwrap();
        match validate_against(&json!({}), &schema, "empty payload") {
            Ok(()) | Err(SchemaError::ValidationFailed { .. }) => {}
            Err(other) => panic!("{}: {other}", path.display()),
        }
    }
}

#[test]
fn validates_json_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.json");
    std::fs::write(&path, r#"{"body": [{"type": "heading", "text": "Hej"}]}"#).unwrap();

    let schema = json!({"type": "object", "required": ["body"]});
    let document = SchemaValidator::new().unwrap().validate_file(&path, &schema).unwrap();
    assert_eq!(document["body"][0]["text"], "Hej");
}

#[test]
fn validates_yaml_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.yaml");
    std::fs::write(&path, "date: 2025-03-01\nattendees:\n  - Anna\n  - Bertil\n").unwrap();

    let schema = json!({
        "type": "object",
        "required": ["date", "attendees"],
        "properties": {"attendees": {"type": "array", "minItems": 2}}
    });
    let document = SchemaValidator::new().unwrap().validate_file(&path, &schema).unwrap();
    assert_eq!(document["date"], "2025-03-01");
}

#[test]
fn file_violations_name_the_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.json");
    std::fs::write(&path, r#"{"attendees": []}"#).unwrap();

    let schema = json!({
        "type": "object",
        "properties": {"attendees": {"type": "array", "minItems": 1}}
    });
    let err = SchemaValidator::new().unwrap().validate_file(&path, &schema).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    assert!(err.to_string().contains("data.json"));
    let violations = err.violations().unwrap();
    assert_eq!(violations.violations()[0].instance_path, "/attendees");
}

#[test]
fn unreadable_and_malformed_files() {
    let dir = TempDir::new().unwrap();
    let validator = SchemaValidator::new().unwrap();
    let schema = json!({});

    let missing = validator.validate_file(&dir.path().join("absent.json"), &schema).unwrap_err();
    assert!(matches!(missing, SchemaError::DocumentLoad { .. }));

    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{not json").unwrap();
    let broken = validator.validate_file(&path, &schema).unwrap_err();
    assert!(broken.to_string().contains("invalid JSON"));
}
