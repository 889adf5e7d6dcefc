//! # klartex-assembly — From Payload to Expansion Context
//!
//! Two assemblers share one contract: take a validated, escaped payload and
//! produce the context map a base template expects.
//!
//! - [`block`] — free-form documents whose `body` is an ordered list of
//!   typed blocks. Also owns the escaping rules for block payloads.
//! - [`recipe`] — declarative recipes (`recipe.yaml`) that bind component
//!   parameters and metadata rows to payload fields.
//! - [`expression`] — evaluation of the small template expressions recipes
//!   use for titles and page-chrome names, with an observable fallback.
//! - [`context`] — the context types and their fixed key sets.
//!
//! ## Crate Policy
//!
//! - Assemblers never validate. They run after both schema passes and
//!   assume the payload already conforms.
//! - Assemblers never expand the base template themselves; the
//!   [`TemplateEngine`](klartex_core::TemplateEngine) is only used for
//!   recipe expressions.

pub mod block;
pub mod context;
pub mod error;
pub mod expression;
pub mod recipe;

pub use block::{assemble_blocks, escape_block_payload, extract_doc_title};
pub use context::{BlockContext, ExpansionContext, MetadataRow, RecipeContext, ResolvedComponent};
pub use error::AssemblyError;
pub use expression::{evaluate, Evaluation};
pub use recipe::{
    assemble_recipe, load_recipe, parse_recipe, resolve_metadata, MetadataRule, Recipe,
    RecipeComponent, RecipeDocument,
};
