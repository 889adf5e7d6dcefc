//! # klartex-schema — Payload Validation
//!
//! Validation is the trust boundary of the pipeline: nothing is escaped,
//! assembled or expanded until the raw payload has passed both passes.
//!
//! ## Passes (`validate`)
//!
//! - [`SchemaValidator::validate_document`] checks the whole payload against
//!   the template's document schema.
//! - [`SchemaValidator::validate_blocks`] checks every element of `body`
//!   against the payload schema of its component kind, reporting the index
//!   and type of the first offending block.
//!
//! Both passes run on the raw, pre-escape payload. Escaping rewrites string
//! values (`_` becomes `\_`), which would break type-name matching and
//! pattern checks if validation ran afterwards.
//!
//! ## YAML (`convert`)
//!
//! Recipes, branding files and CLI data files may be YAML.
//! [`yaml_to_json_value`] maps them onto the same ordered JSON value model
//! as JSON payloads.
//!
//! ## Crate Policy
//!
//! - Depends on `klartex-core` and `klartex-catalog` only.
//! - `$ref` URIs are never fetched over the network.

pub mod convert;
pub mod validate;

pub use convert::{load_document, parse_yaml, yaml_to_json_value, YamlConversionError};
pub use validate::{validate_against, SchemaError, SchemaValidator, ValidationViolations, Violation};
