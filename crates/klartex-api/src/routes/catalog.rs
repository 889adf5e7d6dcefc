//! # Catalog Endpoints
//!
//! Read-only discovery: templates and their schemas, components and their
//! payload schemas, and the built-in page-chrome layouts.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{AppError, ErrorBody};
use crate::state::AppState;

/// A template and the assembly modes it supports.
#[derive(Debug, Serialize, ToSchema)]
pub struct TemplateEntry {
    pub name: String,
    pub description: String,
    pub supports_block_mode: bool,
    pub supports_recipe_mode: bool,
}

/// A registered component kind.
#[derive(Debug, Serialize, ToSchema)]
pub struct ComponentEntry {
    pub name: String,
    pub description: String,
    /// Support package loaded when the component is used.
    pub support_package: Option<String>,
    /// Whether the kind is usable as a block.
    pub has_schema: bool,
}

/// Default flags of a page-chrome layout.
#[derive(Debug, Serialize, ToSchema)]
pub struct PageChromeDefaultsEntry {
    pub page_numbers: bool,
    pub first_page_header: bool,
}

/// A built-in page-chrome layout.
#[derive(Debug, Serialize, ToSchema)]
pub struct PageChromeEntry {
    pub name: String,
    pub description: String,
    pub defaults: PageChromeDefaultsEntry,
}

/// Build the catalog router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/templates", get(list_templates))
        .route("/templates/{name}/schema", get(template_schema))
        .route("/components", get(list_components))
        .route("/components/{name}/schema", get(component_schema))
        .route("/page-templates", get(list_page_templates))
}

/// GET /templates — List templates.
#[utoipa::path(
    get,
    path = "/templates",
    responses((status = 200, description = "Templates sorted by name", body = Vec<TemplateEntry>)),
    tag = "catalog"
)]
pub async fn list_templates(State(state): State<AppState>) -> Json<Vec<TemplateEntry>> {
    let entries = state
        .pipeline
        .list_templates()
        .into_iter()
        .map(|t| TemplateEntry {
            name: t.name,
            description: t.description,
            supports_block_mode: t.supports_block_mode,
            supports_recipe_mode: t.supports_recipe_mode,
        })
        .collect();
    Json(entries)
}

/// GET /templates/{name}/schema — A template's document schema.
#[utoipa::path(
    get,
    path = "/templates/{name}/schema",
    params(("name" = String, Path, description = "Template name")),
    responses(
        (status = 200, description = "JSON Schema of the payload"),
        (status = 404, description = "Unknown template", body = ErrorBody),
    ),
    tag = "catalog"
)]
pub async fn template_schema(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let schema = state.pipeline.schema(&name).map_err(AppError::lookup)?;
    Ok(Json(schema.clone()))
}

/// GET /components — List component kinds.
#[utoipa::path(
    get,
    path = "/components",
    responses((status = 200, description = "Components sorted by name", body = Vec<ComponentEntry>)),
    tag = "catalog"
)]
pub async fn list_components(State(state): State<AppState>) -> Json<Vec<ComponentEntry>> {
    let entries = state
        .pipeline
        .list_components()
        .into_iter()
        .map(|c| ComponentEntry {
            name: c.name.to_string(),
            description: c.description.to_string(),
            support_package: c.support_package.map(str::to_string),
            has_schema: c.has_payload_schema(),
        })
        .collect();
    Json(entries)
}

/// GET /components/{name}/schema — A component's payload schema.
#[utoipa::path(
    get,
    path = "/components/{name}/schema",
    params(("name" = String, Path, description = "Component name")),
    responses(
        (status = 200, description = "JSON Schema of the block payload"),
        (status = 404, description = "Unknown component, or one without a payload schema", body = ErrorBody),
    ),
    tag = "catalog"
)]
pub async fn component_schema(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    match state.pipeline.component_schema(&name).map_err(AppError::lookup)? {
        Some(schema) => Ok(Json(schema)),
        None => Err(AppError::NotFound(format!(
            "Component '{name}' has no payload schema"
        ))),
    }
}

/// GET /page-templates — List built-in page-chrome layouts.
#[utoipa::path(
    get,
    path = "/page-templates",
    responses((status = 200, description = "Layouts sorted by name", body = Vec<PageChromeEntry>)),
    tag = "catalog"
)]
pub async fn list_page_templates(State(state): State<AppState>) -> Json<Vec<PageChromeEntry>> {
    let entries = state
        .pipeline
        .list_page_chrome()
        .into_iter()
        .map(|p| PageChromeEntry {
            name: p.name.to_string(),
            description: p.description.to_string(),
            defaults: PageChromeDefaultsEntry {
                page_numbers: p.defaults.page_numbers,
                first_page_header: p.defaults.first_page_header,
            },
        })
        .collect();
    Json(entries)
}
