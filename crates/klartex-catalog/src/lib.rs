//! # klartex-catalog — Components, Page Chrome & Template Discovery
//!
//! The read-only catalogs every render consults:
//!
//! - [`components`] — the component registry. Each kind carries an optional
//!   support package and an optional payload schema, compiled into the
//!   binary.
//! - [`page_chrome`] — the built-in header/footer layouts and the resolver
//!   that applies per-document overrides.
//! - [`registry`] — discovery of named templates on disk and their
//!   classification by assembly mode.
//!
//! ## Crate Policy
//!
//! - The component and page-chrome catalogs are `static` data and are never
//!   mutated.
//! - Discovered template registries are memoized per directory behind
//!   [`registry::shared`], with [`registry::reset_shared`] as the only way
//!   to drop a cached registry.
//! - Lookup failures are hard errors that list the valid names. Nothing
//!   here falls back to a default silently.

pub mod components;
pub mod error;
pub mod page_chrome;
pub mod registry;

pub use components::{
    block_kinds, component_schema, extract_fields, list_components, lookup, ComponentSpec,
    DataMap, RAW_BLOCK_KIND,
};
pub use error::CatalogError;
pub use page_chrome::{
    list_page_chrome, resolve, source, PageChrome, PageChromeDefaults, PageChromeInfo,
    PageChromeSpec, DEFAULT_PAGE_CHROME,
};
pub use registry::{TemplateInfo, TemplateRegistry, TemplateSummary, BLOCK_ENGINE_TEMPLATE};
