//! # Application State
//!
//! One [`RenderPipeline`] shared by every handler. The pipeline is
//! immutable after construction, so handlers share it through an `Arc`
//! without locking.

use std::sync::Arc;

use klartex_render::{RenderConfig, RenderError, RenderPipeline};

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8000;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub render: RenderConfig,
}

impl AppConfig {
    /// Read `PORT` and the `KLARTEX_*` variables.
    pub fn from_env() -> Result<Self, RenderError> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        Ok(Self {
            port,
            render: RenderConfig::from_env()?,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            render: RenderConfig::default(),
        }
    }
}

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub pipeline: Arc<RenderPipeline>,
}

impl AppState {
    /// Build the pipeline from a render configuration.
    pub fn new(config: RenderConfig) -> Result<Self, RenderError> {
        Ok(Self::with_pipeline(RenderPipeline::new(config)?))
    }

    pub fn with_pipeline(pipeline: RenderPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}
