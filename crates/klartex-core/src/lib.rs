//! # klartex-core — Foundational Types for the Klartex Pipeline
//!
//! Every other crate in the workspace depends on `klartex-core`; it depends
//! on nothing internal.
//!
//! ## Contents
//!
//! - [`error`] — the stable [`ErrorKind`] taxonomy shared by every layer.
//! - [`escape`] — markup escaping of untrusted string values.
//! - [`path`] — dotted-path resolution used for best-effort data binding.
//! - [`engine`] — the [`TemplateEngine`] seam to the external expansion engine.
//!
//! ## Value Model
//!
//! Document payloads stay a generic [`serde_json::Value`] (with insertion
//! order preserved) until an assembler projects fields out of them. Nothing
//! in this crate coerces a payload into a fixed structure.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `klartex-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod engine;
pub mod error;
pub mod escape;
pub mod path;

pub use engine::{ExpansionError, TemplateEngine, TemplateRef};
pub use error::{Classify, ErrorKind};
pub use escape::{escape_str, escape_value};
pub use path::{display_value, present, resolve_dotted_path};

/// Locale used when a payload or recipe does not declare `lang`.
pub const DEFAULT_LANG: &str = "sv";
