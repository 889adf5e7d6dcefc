//! # Render Errors
//!
//! [`RenderError`] wraps the error of whichever layer failed, unchanged, and
//! reports the pipeline [`Stage`] it failed in.

use serde::Serialize;
use thiserror::Error;

use klartex_assembly::AssemblyError;
use klartex_catalog::CatalogError;
use klartex_core::{Classify, ErrorKind, ExpansionError};
use klartex_schema::{SchemaError, ValidationViolations};

use crate::branding::BrandingError;
use crate::compiler::CompileError;
use crate::config::ConfigError;
use crate::engine::EngineLoadError;
use crate::pipeline::Engine;

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Resolving,
    Validating,
    Assembling,
    Expanding,
    Compiling,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolving => "resolving",
            Self::Validating => "validating",
            Self::Assembling => "assembling",
            Self::Expanding => "expanding",
            Self::Compiling => "compiling",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a render or of pipeline setup.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Template, component or page-chrome lookup failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Branding(#[from] BrandingError),

    /// The template cannot serve the requested assembly engine.
    #[error("Template '{template}' does not support the {engine} engine")]
    UnsupportedEngine { template: String, engine: Engine },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    EngineLoad(#[from] EngineLoadError),

    #[error(transparent)]
    Expansion(#[from] ExpansionError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl RenderError {
    /// The stage the pipeline was in when this error occurred.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Config(_)
            | Self::Catalog(_)
            | Self::Branding(_)
            | Self::UnsupportedEngine { .. }
            | Self::EngineLoad(_) => Stage::Resolving,
            Self::Schema(_) => Stage::Validating,
            Self::Assembly(_) => Stage::Assembling,
            Self::Expansion(_) => Stage::Expanding,
            Self::Compile(_) => Stage::Compiling,
        }
    }

    /// Diagnostic tail of a failed compiler pass.
    pub fn diagnostic_tail(&self) -> Option<&str> {
        match self {
            Self::Compile(e) => e.diagnostic_tail(),
            _ => None,
        }
    }

    /// Schema violations of a rejected payload.
    pub fn violations(&self) -> Option<&ValidationViolations> {
        match self {
            Self::Schema(e) => e.violations(),
            _ => None,
        }
    }
}

impl Classify for RenderError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(e) => e.kind(),
            Self::Catalog(e) => e.kind(),
            Self::Branding(e) => e.kind(),
            Self::UnsupportedEngine { .. } => ErrorKind::UnknownTemplate,
            Self::Schema(e) => e.kind(),
            Self::Assembly(e) => e.kind(),
            Self::EngineLoad(e) => e.kind(),
            Self::Expansion(e) => e.kind(),
            Self::Compile(e) => e.kind(),
        }
    }
}
