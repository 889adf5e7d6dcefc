//! # Template Expansion Seam
//!
//! The expansion language is an external collaborator: it turns a template
//! and a context map into compiler source text. The pipeline only needs the
//! narrow contract below, so the engine can be swapped without touching the
//! assemblers.

use serde_json::Value;
use thiserror::Error;

use crate::error::{Classify, ErrorKind};

/// What to expand: a template registered with the engine, or source text
/// supplied at call time (recipe title expressions, page-chrome fragments).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateRef<'a> {
    /// A template the engine loaded ahead of time, by registered name.
    Named(&'a str),
    /// Template source text expanded once and discarded.
    Inline(&'a str),
}

impl std::fmt::Display for TemplateRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(name) => write!(f, "template '{name}'"),
            Self::Inline(_) => f.write_str("inline template"),
        }
    }
}

/// Failure reported by a [`TemplateEngine`].
#[derive(Error, Debug)]
pub enum ExpansionError {
    /// No template is registered under the requested name.
    #[error("expansion template '{0}' is not registered")]
    NotRegistered(String),

    /// The template could not be parsed or rendered against the context.
    #[error("failed to expand {target}: {reason}")]
    Render {
        /// Human-readable description of the template being expanded.
        target: String,
        /// Engine-provided reason.
        reason: String,
    },
}

impl Classify for ExpansionError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::CompilationFailed
    }
}

/// Turns a template plus a context map into output text.
///
/// Implementations must be shareable across concurrent renders.
pub trait TemplateEngine: Send + Sync {
    /// Expand `template` against `context`.
    fn expand(&self, template: TemplateRef<'_>, context: &Value) -> Result<String, ExpansionError>;
}
