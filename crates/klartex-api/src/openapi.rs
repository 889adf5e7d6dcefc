//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into a single OpenAPI spec served
//! at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "klartex",
        version = "0.1.0",
        description = "PDF generation from structured payloads via LaTeX templates."
    ),
    paths(
        crate::routes::render::render_pdf,
        crate::routes::catalog::list_templates,
        crate::routes::catalog::template_schema,
        crate::routes::catalog::list_components,
        crate::routes::catalog::component_schema,
        crate::routes::catalog::list_page_templates,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::render::RenderBody,
        crate::routes::catalog::TemplateEntry,
        crate::routes::catalog::ComponentEntry,
        crate::routes::catalog::PageChromeEntry,
        crate::routes::catalog::PageChromeDefaultsEntry,
    )),
    tags(
        (name = "render", description = "Document rendering"),
        (name = "catalog", description = "Templates, components and page chrome"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
