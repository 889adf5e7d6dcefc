//! # Render Endpoint
//!
//! `POST /render` runs validation, assembly, expansion and compilation and
//! answers with the PDF as an attachment named after the template.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use klartex_render::{Engine, RenderRequest, DEFAULT_BRANDING};

use crate::error::{AppError, ErrorBody};
use crate::extractors::extract_json;
use crate::state::AppState;

/// Render request body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RenderBody {
    /// Template name, e.g. `protokoll` or `_block`.
    pub template: String,
    /// Document payload.
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
    /// Branding profile. Defaults to `default`.
    #[serde(default)]
    pub branding: Option<String>,
    /// `auto`, `block` or `recipe`. Defaults to `auto`.
    #[serde(default)]
    pub engine: Option<String>,
    /// Replaces the built-in page-chrome fragment.
    #[serde(default)]
    pub page_chrome_source: Option<String>,
}

impl RenderBody {
    fn into_request(self) -> Result<RenderRequest, AppError> {
        let engine = match self.engine.as_deref() {
            None => Engine::Auto,
            Some(s) => s.parse::<Engine>().map_err(AppError::BadRequest)?,
        };
        let mut request = RenderRequest::new(self.template, self.data)
            .with_branding(self.branding.unwrap_or_else(|| DEFAULT_BRANDING.to_string()))
            .with_engine(engine);
        if let Some(source) = self.page_chrome_source {
            request = request.with_page_chrome_source(source);
        }
        Ok(request)
    }
}

/// Build the render router.
pub fn router() -> Router<AppState> {
    Router::new().route("/render", post(render_pdf))
}

/// POST /render — Render a payload to PDF.
#[utoipa::path(
    post,
    path = "/render",
    request_body = RenderBody,
    responses(
        (status = 200, description = "Rendered PDF, served as an application/pdf attachment"),
        (status = 400, description = "Malformed request or unknown name", body = ErrorBody),
        (status = 422, description = "Payload rejected by its schema", body = ErrorBody),
        (status = 500, description = "Compiler or host failure", body = ErrorBody),
    ),
    tag = "render"
)]
pub async fn render_pdf(
    State(state): State<AppState>,
    body: Result<Json<RenderBody>, JsonRejection>,
) -> Result<Response, AppError> {
    let request = extract_json(body)?.into_request()?;
    let pdf = state.pipeline.render(&request).await?;
    let disposition = format!("attachment; filename={}.pdf", request.template);
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    )
        .into_response())
}
