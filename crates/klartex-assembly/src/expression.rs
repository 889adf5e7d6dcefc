//! # Recipe Expressions
//!
//! A recipe's title and page-chrome fields are small template expressions
//! evaluated against `{data: payload}`, e.g. `"{{data.meeting_type}}"`.
//! Evaluation never fails the render: an expression the engine rejects is
//! used verbatim. [`Evaluation`] records which of the two happened.

use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use klartex_core::{TemplateEngine, TemplateRef};

/// Outcome of evaluating a recipe expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// The engine expanded the expression (or it contained no markup).
    Evaluated(String),
    /// The engine rejected the expression; this is the raw text.
    FellBackToRaw(String),
}

impl Evaluation {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Evaluated(s) | Self::FellBackToRaw(s) => s,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Self::Evaluated(s) | Self::FellBackToRaw(s) => s,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::FellBackToRaw(_))
    }
}

impl Serialize for Evaluation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Evaluate `expr` with the payload bound as `data`.
pub fn evaluate(engine: &dyn TemplateEngine, expr: &str, payload: &Value) -> Evaluation {
    if !expr.contains("{{") {
        return Evaluation::Evaluated(expr.to_string());
    }
    match engine.expand(TemplateRef::Inline(expr), &json!({ "data": payload })) {
        Ok(text) => Evaluation::Evaluated(text),
        Err(e) => {
            tracing::debug!(error = %e, expression = expr, "expression fell back to raw text");
            Evaluation::FellBackToRaw(expr.to_string())
        }
    }
}
