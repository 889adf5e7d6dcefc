//! # API Route Modules
//!
//! - `render` — `POST /render`, the full pipeline returning a PDF.
//! - `catalog` — read-only discovery of templates, components and page
//!   chrome, with their schemas.

pub mod catalog;
pub mod render;
