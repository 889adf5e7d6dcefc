//! # Error Kinds — Stable Failure Taxonomy
//!
//! Each crate defines its own `thiserror` enum with full context, and every
//! one of those enums maps onto a single [`ErrorKind`] through [`Classify`].
//! Front ends match on the kind, never on message text.
//!
//! ## Design
//!
//! - Kinds caused by the request (unknown names, missing fields, schema
//!   violations) are client errors.
//! - `CompilationFailed`, `NoArtifactProduced` and `Configuration` point at
//!   the toolchain or the host environment and are server-side failures.
//! - Nothing in the pipeline retries. A kind is reported exactly once, at
//!   the stage where it occurred.

use serde::{Deserialize, Serialize};

/// Matchable classification of every failure the pipeline can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// The requested template name is not registered, or cannot serve the
    /// requested assembly engine.
    UnknownTemplate,
    /// A block or recipe referenced a component kind that is not registered.
    UnknownComponent,
    /// A page-chrome reference named an unknown layout or was malformed.
    UnknownPageChrome,
    /// The requested branding profile does not exist.
    UnknownBranding,
    /// A field the assembler cannot work without is absent.
    MissingField,
    /// The payload (or one of its blocks, or a recipe) violated its schema.
    SchemaViolation,
    /// Expansion or the external compiler failed, timed out, or could not run.
    CompilationFailed,
    /// The compiler reported success but left no artifact behind.
    NoArtifactProduced,
    /// A template tree, recipe file or built-in asset on the host is broken.
    Configuration,
}

impl ErrorKind {
    /// Returns the wire identifier of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownTemplate => "UNKNOWN_TEMPLATE",
            Self::UnknownComponent => "UNKNOWN_COMPONENT",
            Self::UnknownPageChrome => "UNKNOWN_PAGE_CHROME",
            Self::UnknownBranding => "UNKNOWN_BRANDING",
            Self::MissingField => "MISSING_FIELD",
            Self::SchemaViolation => "SCHEMA_VIOLATION",
            Self::CompilationFailed => "COMPILATION_FAILED",
            Self::NoArtifactProduced => "NO_ARTIFACT_PRODUCED",
            Self::Configuration => "CONFIGURATION",
        }
    }

    /// Whether the failure was caused by the request rather than the host.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::CompilationFailed | Self::NoArtifactProduced | Self::Configuration
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every error enum in the workspace.
pub trait Classify {
    /// The stable kind this error reports as.
    fn kind(&self) -> ErrorKind;
}
