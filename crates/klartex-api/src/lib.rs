//! # klartex-api — HTTP Front End
//!
//! Marshals HTTP requests into calls on [`klartex_render::RenderPipeline`].
//!
//! ## API Surface
//!
//! | Route                            | Module               |
//! |----------------------------------|----------------------|
//! | `POST /render`                   | [`routes::render`]   |
//! | `GET /templates`                 | [`routes::catalog`]  |
//! | `GET /templates/{name}/schema`   | [`routes::catalog`]  |
//! | `GET /components`                | [`routes::catalog`]  |
//! | `GET /components/{name}/schema`  | [`routes::catalog`]  |
//! | `GET /page-templates`            | [`routes::catalog`]  |
//! | `GET /openapi.json`              | [`openapi`]          |
//! | `GET /health/*`                  | this module          |
//!
//! Errors are JSON bodies of the form `{"error": {"code", "message"}}`;
//! see [`error::AppError`] for the status mapping.

pub mod error;
pub mod extractors;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::render::router())
        .merge(routes::catalog::router())
        .merge(openapi::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .with_state(state);

    Router::new().merge(health).merge(api)
}

/// Liveness check: 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness check: 503 with the reasons while the pipeline's base templates
/// or support directory are missing.
async fn readiness(State(state): State<AppState>) -> Response {
    let problems = state.pipeline.readiness_problems();
    if problems.is_empty() {
        return (StatusCode::OK, "ready").into_response();
    }
    tracing::warn!(?problems, "readiness check failed");
    (StatusCode::SERVICE_UNAVAILABLE, problems.join("; ")).into_response()
}
