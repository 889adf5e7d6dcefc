//! # klartex-cli — Command-Line Front End
//!
//! Thin marshalling over [`klartex_render::RenderPipeline`]:
//!
//! ```bash
//! klartex render -t protokoll -d meeting.json -o protokoll.pdf
//! klartex render -t _block -d doc.yaml --emit-source
//! klartex templates
//! klartex schema avtal
//! klartex components
//! klartex component-schema signatures
//! klartex page-chrome
//! klartex validate -t faktura invoice.json
//! ```
//!
//! Handlers return the process exit code: 0 on success, 1 when the request
//! was rejected or the render failed. Operational errors propagate as
//! [`anyhow::Error`].

pub mod discover;
pub mod render;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use klartex_core::Classify;
use klartex_render::{RenderConfig, RenderError};

/// Asset and compiler overrides shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct AssetArgs {
    /// Templates directory (overrides KLARTEX_TEMPLATES_DIR).
    #[arg(long, global = true, value_name = "DIR")]
    pub templates_dir: Option<PathBuf>,

    /// Support-package directory (overrides KLARTEX_CLS_DIR).
    #[arg(long, global = true, value_name = "DIR")]
    pub cls_dir: Option<PathBuf>,

    /// Branding directory (overrides KLARTEX_BRANDING_DIR).
    #[arg(long, global = true, value_name = "DIR")]
    pub branding_dir: Option<PathBuf>,

    /// Compiler executable (overrides KLARTEX_COMPILER).
    #[arg(long, global = true, value_name = "PROGRAM")]
    pub compiler: Option<String>,
}

impl AssetArgs {
    /// Environment configuration with the command-line overrides applied.
    pub fn config(&self) -> Result<RenderConfig> {
        let config = RenderConfig::from_env().context("invalid KLARTEX_* environment")?;
        Ok(self.apply(config))
    }

    fn apply(&self, mut config: RenderConfig) -> RenderConfig {
        if let Some(dir) = &self.templates_dir {
            config.templates_dir = dir.clone();
        }
        if let Some(dir) = &self.cls_dir {
            config.support_dir = dir.clone();
        }
        if let Some(dir) = &self.branding_dir {
            config.branding_dir = dir.clone();
        }
        if let Some(program) = &self.compiler {
            config.compiler.program = program.clone();
        }
        config
    }
}

/// Read a JSON or YAML payload file.
pub fn load_payload(path: &Path) -> Result<Value> {
    if !path.is_file() {
        anyhow::bail!("data file not found: {}", path.display());
    }
    klartex_schema::load_document(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Print a pipeline error with its kind and, for compiler failures, the
/// diagnostic tail.
pub fn report(err: &RenderError) {
    eprintln!("Error [{}]: {err}", err.kind());
    if let Some(tail) = err.diagnostic_tail() {
        if !err.to_string().contains(tail) {
            eprintln!("{tail}");
        }
    }
}
