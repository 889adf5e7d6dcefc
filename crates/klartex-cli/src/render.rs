//! # Render Subcommand
//!
//! Loads a JSON or YAML payload and runs it through the full pipeline,
//! writing the PDF. With `--emit-source` the compiler is skipped and the
//! expanded typesetting source is written instead.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use klartex_render::{Engine, RenderPipeline, RenderRequest, DEFAULT_BRANDING};

use crate::{load_payload, report};

/// Arguments for the `klartex render` subcommand.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Template name, e.g. `protokoll` or `_block`.
    #[arg(short, long)]
    pub template: String,

    /// Payload file (JSON, or YAML by `.yaml`/`.yml` extension).
    #[arg(short, long)]
    pub data: PathBuf,

    /// Output path. Defaults to `output.pdf`, or stdout with `--emit-source`.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Branding profile.
    #[arg(short, long, default_value = DEFAULT_BRANDING)]
    pub branding: String,

    /// Assembly engine: auto, block or recipe.
    #[arg(long, default_value = "auto")]
    pub engine: Engine,

    /// File whose content replaces the built-in page-chrome fragment.
    #[arg(long, value_name = "FILE")]
    pub page_chrome_source: Option<PathBuf>,

    /// Write the expanded source instead of compiling it.
    #[arg(long)]
    pub emit_source: bool,
}

impl RenderArgs {
    fn request(&self) -> Result<RenderRequest> {
        let data = load_payload(&self.data)?;
        let mut request = RenderRequest::new(&self.template, data)
            .with_branding(&self.branding)
            .with_engine(self.engine);
        if let Some(path) = &self.page_chrome_source {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read page chrome source {}", path.display()))?;
            request = request.with_page_chrome_source(source);
        }
        Ok(request)
    }
}

/// Execute `klartex render`.
pub async fn run_render(args: &RenderArgs, pipeline: &RenderPipeline) -> Result<u8> {
    let request = args.request()?;

    if args.emit_source {
        let expanded = match pipeline.expand(&request) {
            Ok(expanded) => expanded,
            Err(e) => {
                report(&e);
                return Ok(1);
            }
        };
        match &args.output {
            Some(path) => {
                std::fs::write(path, &expanded.source)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("Wrote {} ({} engine)", path.display(), expanded.engine);
            }
            None => print!("{}", expanded.source),
        }
        return Ok(0);
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from("output.pdf"));
    let pdf = match pipeline.render(&request).await {
        Ok(pdf) => pdf,
        Err(e) => {
            report(&e);
            return Ok(1);
        }
    };
    std::fs::write(&output, &pdf).with_context(|| format!("failed to write {}", output.display()))?;
    println!("Wrote {} ({} bytes)", output.display(), pdf.len());
    Ok(0)
}
