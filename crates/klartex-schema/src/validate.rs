//! # Schema Validation
//!
//! Runtime validation of payloads against JSON Schema definitions
//! (Draft 2020-12).
//!
//! ## Security Invariant
//!
//! Validation is a trust boundary. A payload that fails validation is
//! rejected with structured violations (instance path, schema path,
//! message) before any of its values reach the escaper or the assemblers.
//!
//! ## Schema Resolution
//!
//! Component schemas are compiled once, when the validator is built.
//! Template schemas come from disk and are compiled per call. Neither may
//! pull a `$ref` over the network: every external reference resolves to a
//! load failure.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use jsonschema::{Retrieve, Uri, ValidationOptions, Validator};
use klartex_catalog::components;
use klartex_core::{Classify, ErrorKind};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::convert::load_document;

/// Refuses every external `$ref`.
struct OfflineRetriever;

impl Retrieve for OfflineRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        Err(format!("external schema reference '{}' is not allowed", uri.as_str()).into())
    }
}

/// Error during schema validation.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The payload did not conform to a document schema.
    #[error("{subject} failed schema validation:\n{violations}")]
    ValidationFailed {
        /// What was validated, e.g. `payload for template 'avtal'`.
        subject: String,
        /// Structured list of individual violations.
        violations: ValidationViolations,
    },

    /// A block is not an object or has no string `type`.
    #[error("Invalid block at body[{index}]: {reason}")]
    MalformedBlock {
        /// Position of the block in `body`.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// A block names a kind that is not a registered block component.
    #[error("Unknown block type '{block_type}' at body[{index}]. Available: {available}")]
    UnknownBlockType {
        /// Position of the block in `body`.
        index: usize,
        /// The unrecognised `type` value.
        block_type: String,
        /// Comma-separated list of block kinds.
        available: String,
    },

    /// A block failed its component schema.
    #[error("Invalid '{block_type}' block at body[{index}]:\n{violations}")]
    InvalidBlock {
        /// Position of the block in `body`.
        index: usize,
        /// The block's `type`.
        block_type: String,
        /// Violations, with instance paths rooted at the payload.
        violations: ValidationViolations,
    },

    /// A schema could not be compiled.
    #[error("schema for {subject} could not be compiled: {reason}")]
    SchemaCompile {
        /// Which schema failed.
        subject: String,
        /// Compiler message.
        reason: String,
    },

    /// A document file could not be read or parsed.
    #[error("document load error for '{path}': {reason}")]
    DocumentLoad {
        /// Path to the document that failed to load.
        path: String,
        /// Reason the document could not be loaded.
        reason: String,
    },
}

impl SchemaError {
    /// The individual violations, when the error carries any.
    pub fn violations(&self) -> Option<&ValidationViolations> {
        match self {
            Self::ValidationFailed { violations, .. } | Self::InvalidBlock { violations, .. } => {
                Some(violations)
            }
            _ => None,
        }
    }
}

impl Classify for SchemaError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownBlockType { .. } => ErrorKind::UnknownComponent,
            Self::SchemaCompile { .. } => ErrorKind::Configuration,
            Self::ValidationFailed { .. }
            | Self::MalformedBlock { .. }
            | Self::InvalidBlock { .. }
            | Self::DocumentLoad { .. } => ErrorKind::SchemaViolation,
        }
    }
}

/// A single validation violation with structured context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// JSON Pointer path to the violating field in the instance.
    pub instance_path: String,
    /// JSON Pointer path within the schema that triggered the error.
    pub schema_path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.instance_path, self.message)
        }
    }
}

/// Collection of validation violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationViolations {
    violations: Vec<Violation>,
}

impl ValidationViolations {
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

fn build_options() -> ValidationOptions {
    let mut opts = jsonschema::options();
    opts.with_draft(jsonschema::Draft::Draft202012);
    opts.with_retriever(OfflineRetriever);
    opts
}

fn compile(schema: &Value, subject: &str) -> Result<Validator, SchemaError> {
    build_options()
        .build(schema)
        .map_err(|e| SchemaError::SchemaCompile {
            subject: subject.to_string(),
            reason: e.to_string(),
        })
}

fn collect_violations(validator: &Validator, instance: &Value, prefix: &str) -> Vec<Violation> {
    validator
        .iter_errors(instance)
        .map(|e| Violation {
            instance_path: format!("{prefix}{}", e.instance_path),
            schema_path: e.schema_path.to_string(),
            message: e.to_string(),
        })
        .collect()
}

/// Validate `instance` against a one-off schema.
///
/// Used directly for host documents (recipes) that never go through the
/// block pass.
pub fn validate_against(instance: &Value, schema: &Value, subject: &str) -> Result<(), SchemaError> {
    let validator = compile(schema, subject)?;
    let violations = collect_violations(&validator, instance, "");
    if violations.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::ValidationFailed {
            subject: subject.to_string(),
            violations: ValidationViolations { violations },
        })
    }
}

/// Validator holding the compiled schema of every block component.
///
/// `SchemaValidator` is `Send + Sync`; build it once and share it.
pub struct SchemaValidator {
    blocks: HashMap<&'static str, Validator>,
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.blocks.keys().copied().collect();
        kinds.sort_unstable();
        f.debug_struct("SchemaValidator")
            .field("block_kinds", &kinds)
            .finish()
    }
}

impl SchemaValidator {
    /// Compile the payload schema of every registered block component.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::SchemaCompile`] if a built-in schema is broken.
    pub fn new() -> Result<Self, SchemaError> {
        let mut blocks = HashMap::new();
        for spec in components::list_components() {
            let subject = format!("component '{}'", spec.name);
            let schema = spec
                .payload_schema()
                .map_err(|e| SchemaError::SchemaCompile {
                    subject: subject.clone(),
                    reason: e.to_string(),
                })?;
            if let Some(schema) = schema {
                blocks.insert(spec.name, compile(&schema, &subject)?);
            }
        }
        tracing::debug!(block_kinds = blocks.len(), "compiled block schemas");
        Ok(Self { blocks })
    }

    /// Validate a whole payload against a document schema.
    ///
    /// `subject` names the document in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::ValidationFailed`] carrying every violation.
    pub fn validate_document(
        &self,
        instance: &Value,
        schema: &Value,
        subject: &str,
    ) -> Result<(), SchemaError> {
        validate_against(instance, schema, subject)
    }

    /// Validate each element of a block list against its component schema.
    ///
    /// Blocks are checked in order and the first failing block is reported.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::MalformedBlock`] when an element is not an object
    ///   with a string `type`.
    /// - [`SchemaError::UnknownBlockType`] when `type` is not a block kind.
    /// - [`SchemaError::InvalidBlock`] when the block violates its schema.
    pub fn validate_blocks(&self, body: &Value) -> Result<(), SchemaError> {
        let Some(blocks) = body.as_array() else {
            return Err(SchemaError::ValidationFailed {
                subject: "body".to_string(),
                violations: ValidationViolations {
                    violations: vec![Violation {
                        instance_path: "/body".to_string(),
                        schema_path: "/properties/body/type".to_string(),
                        message: format!("{body} is not of type \"array\""),
                    }],
                },
            });
        };

        for (index, block) in blocks.iter().enumerate() {
            let Some(fields) = block.as_object() else {
                return Err(SchemaError::MalformedBlock {
                    index,
                    reason: "block must be an object".to_string(),
                });
            };
            let Some(block_type) = fields.get("type").and_then(Value::as_str) else {
                return Err(SchemaError::MalformedBlock {
                    index,
                    reason: "block must have a string 'type'".to_string(),
                });
            };
            let Some(validator) = self.blocks.get(block_type) else {
                return Err(SchemaError::UnknownBlockType {
                    index,
                    block_type: block_type.to_string(),
                    available: components::block_kinds().join(", "),
                });
            };

            let violations = collect_violations(validator, block, &format!("/body/{index}"));
            if !violations.is_empty() {
                return Err(SchemaError::InvalidBlock {
                    index,
                    block_type: block_type.to_string(),
                    violations: ValidationViolations { violations },
                });
            }
        }
        Ok(())
    }

    /// Load a JSON or YAML document and validate it against `schema`.
    pub fn validate_file(&self, path: &Path, schema: &Value) -> Result<Value, SchemaError> {
        let document = load_document(path)?;
        self.validate_document(&document, schema, &path.display().to_string())?;
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator() -> SchemaValidator {
        SchemaValidator::new().unwrap()
    }

    #[test]
    fn test_all_block_schemas_compile() {
        let v = validator();
        assert_eq!(v.blocks.len(), components::block_kinds().len());
    }

    #[test]
    fn test_validate_document_ok() {
        let schema = json!({"type": "object", "required": ["body"]});
        validator()
            .validate_document(&json!({"body": []}), &schema, "doc")
            .unwrap();
    }

    #[test]
    fn test_validate_document_missing_required() {
        let schema = json!({"type": "object", "required": ["kind"]});
        let err = validator()
            .validate_document(&json!({}), &schema, "payload for template 'x'")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
        let violations = err.violations().unwrap();
        assert!(violations.violations()[0].message.contains("kind"));
        assert!(err.to_string().starts_with("payload for template 'x'"));
    }

    #[test]
    fn test_external_ref_not_fetched() {
        let schema = json!({"$ref": "https://example.invalid/schema.json"});
        let result = validator().validate_document(&json!({}), &schema, "remote");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_blocks_ok() {
        let body = json!([
            {"type": "heading", "text": "Hello"},
            {"type": "text", "text": "World"},
            {"type": "page_break"},
            {"type": "latex", "content": "\\vspace{1cm}"}
        ]);
        validator().validate_blocks(&body).unwrap();
    }

    #[test]
    fn test_unknown_block_type_reports_index() {
        let body = json!([{"type": "heading", "text": "ok"}, {"type": "x"}]);
        let err = validator().validate_blocks(&body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownComponent);
        match &err {
            SchemaError::UnknownBlockType { index, block_type, .. } => {
                assert_eq!(*index, 1);
                assert_eq!(block_type, "x");
            }
            other => panic!("expected UnknownBlockType, got: {other}"),
        }
        assert!(err.to_string().contains("Unknown block type 'x' at body[1]"));
    }

    #[test]
    fn test_recipe_only_kind_is_not_a_block() {
        let err = validator()
            .validate_blocks(&json!([{"type": "klausuler"}]))
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownBlockType { .. }));
    }

    #[test]
    fn test_invalid_heading_block() {
        let err = validator()
            .validate_blocks(&json!([{"type": "heading"}]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
        assert!(err.to_string().contains("Invalid 'heading' block at body[0]"));
    }

    #[test]
    fn test_signatures_need_two_parties() {
        let body = json!([
            {"type": "heading", "text": "Test"},
            {"type": "signatures", "parties": [{"name": "Solo"}]}
        ]);
        let err = validator().validate_blocks(&body).unwrap_err();
        match &err {
            SchemaError::InvalidBlock { index, block_type, violations } => {
                assert_eq!(*index, 1);
                assert_eq!(block_type, "signatures");
                assert_eq!(violations.violations()[0].instance_path, "/body/1/parties");
            }
            other => panic!("expected InvalidBlock, got: {other}"),
        }
    }

    #[test]
    fn test_block_without_type() {
        let err = validator()
            .validate_blocks(&json!([{"text": "untyped"}]))
            .unwrap_err();
        assert!(matches!(err, SchemaError::MalformedBlock { index: 0, .. }));
    }

    #[test]
    fn test_non_object_block() {
        let err = validator().validate_blocks(&json!(["heading"])).unwrap_err();
        assert!(matches!(err, SchemaError::MalformedBlock { index: 0, .. }));
    }

    #[test]
    fn test_body_not_array() {
        let err = validator().validate_blocks(&json!({"type": "heading"})).unwrap_err();
        assert!(matches!(err, SchemaError::ValidationFailed { .. }));
    }

    #[test]
    fn test_raw_underscore_type_validates() {
        let body = json!([{"type": "name_roster", "people": [{"name": "A_B"}]}]);
        validator().validate_blocks(&body).unwrap();
    }

    #[test]
    fn test_violation_display_root() {
        let v = Violation {
            instance_path: String::new(),
            schema_path: "/required".to_string(),
            message: r#""body" is a required property"#.to_string(),
        };
        assert!(v.to_string().contains("(root)"));
    }
}
