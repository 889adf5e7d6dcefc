//! Errors raised by catalog lookups and template discovery.

use std::path::PathBuf;

use klartex_core::{Classify, ErrorKind};
use thiserror::Error;

/// Failure of a catalog lookup or of template discovery.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// No component is registered under the name.
    #[error("Unknown component '{name}'. Available: {available}")]
    UnknownComponent {
        /// The name that was looked up.
        name: String,
        /// Comma-separated list of registered names.
        available: String,
    },

    /// No page-chrome layout is registered under the name.
    #[error("Unknown page template '{name}'. Available: {available}")]
    UnknownPageChrome {
        /// The name that was looked up.
        name: String,
        /// Comma-separated list of registered layouts.
        available: String,
    },

    /// A page-chrome reference that is neither a name nor a valid
    /// `{name, overrides...}` object.
    #[error("invalid page template reference: {0}")]
    InvalidPageChromeSpec(String),

    /// No template is registered under the name.
    #[error("Unknown template '{name}'. Available: {available}")]
    UnknownTemplate {
        /// The name that was looked up.
        name: String,
        /// Comma-separated list of discovered templates.
        available: String,
    },

    /// A built-in component schema failed to parse.
    #[error("built-in schema for component '{name}' is not valid JSON: {reason}")]
    InvalidComponentSchema {
        /// Component whose schema is broken.
        name: String,
        /// Parser message.
        reason: String,
    },

    /// A template directory contained an unreadable schema.
    #[error("template discovery failed at {}: {reason}", path.display())]
    Discovery {
        /// The offending file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// Filesystem error while scanning a template directory.
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl Classify for CatalogError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownComponent { .. } => ErrorKind::UnknownComponent,
            Self::UnknownPageChrome { .. } | Self::InvalidPageChromeSpec(_) => {
                ErrorKind::UnknownPageChrome
            }
            Self::UnknownTemplate { .. } => ErrorKind::UnknownTemplate,
            Self::InvalidComponentSchema { .. } | Self::Discovery { .. } | Self::Io { .. } => {
                ErrorKind::Configuration
            }
        }
    }
}

/// Joins names the way every "Available: ..." message lists them.
pub(crate) fn join_names<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    let mut names: Vec<&str> = names.into_iter().collect();
    names.sort_unstable();
    names.join(", ")
}
