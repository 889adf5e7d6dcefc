//! Errors raised while loading recipes or assembling contexts.

use klartex_catalog::CatalogError;
use klartex_core::{Classify, ErrorKind};
use klartex_schema::SchemaError;
use thiserror::Error;

/// Failure of an assembler or of the recipe loader.
#[derive(Error, Debug)]
pub enum AssemblyError {
    /// A field the assembler cannot work without is absent.
    #[error("{message}")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
        /// Human-readable message naming the field.
        message: String,
    },

    /// Component or page-chrome resolution failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// A recipe file could not be read or parsed.
    #[error("cannot load recipe '{source_name}': {reason}")]
    RecipeLoad {
        /// Where the recipe came from.
        source_name: String,
        /// What went wrong.
        reason: String,
    },

    /// A recipe does not conform to the recipe schema.
    #[error("recipe '{source_name}' is invalid: {error}")]
    RecipeSchema {
        /// Where the recipe came from.
        source_name: String,
        /// The schema failure.
        #[source]
        error: SchemaError,
    },

    /// An assembled context could not be converted to a value map.
    #[error("expansion context could not be built: {0}")]
    Context(String),
}

impl Classify for AssemblyError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField { .. } => ErrorKind::MissingField,
            Self::Catalog(e) => e.kind(),
            Self::RecipeLoad { .. } | Self::RecipeSchema { .. } | Self::Context(_) => {
                ErrorKind::Configuration
            }
        }
    }
}
