//! # klartex-render — The Render Pipeline
//!
//! Wires the catalogs, validator and assemblers to the two external
//! collaborators: the Handlebars expansion engine and the typesetting
//! compiler.
//!
//! - [`config`] — asset locations and compiler settings.
//! - [`branding`] — organisation profiles exposed to templates as `brand`.
//! - [`engine`] — the Handlebars [`TemplateEngine`](klartex_core::TemplateEngine).
//! - [`compiler`] — isolated, multi-pass, time-bounded compiler runs.
//! - [`pipeline`] — the staged [`RenderPipeline`] and discovery entry points.
//!
//! ## Crate Policy
//!
//! - The pipeline is the only place that escapes payloads; validation
//!   always runs on the raw payload first.
//! - Compilation is the only suspending operation. Everything before it is
//!   synchronous and side-effect free.

pub mod branding;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;

pub use branding::{Branding, BrandingError, DEFAULT_BRANDING};
pub use compiler::{CompileError, Compiler, WorkspaceBinding};
pub use config::{CompilerConfig, ConfigError, RenderConfig};
pub use engine::{format_amount, EngineLoadError, HandlebarsEngine};
pub use error::{RenderError, Stage};
pub use pipeline::{
    select_engine, Engine, ExpandedDocument, RenderPipeline, RenderRequest, PAGE_CHROME_TEX_KEY,
};
