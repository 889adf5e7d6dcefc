//! # Validate Subcommand
//!
//! Checks a payload file against a template without assembling or
//! compiling anything. Prints `OK:` or `FAIL:` lines.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use klartex_core::Classify;
use klartex_render::{Engine, RenderPipeline};

use crate::load_payload;

/// Arguments for the `klartex validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Template to validate against.
    #[arg(short, long)]
    pub template: String,

    /// Assembly engine whose validation passes apply.
    #[arg(long, default_value = "auto")]
    pub engine: Engine,

    /// Payload file (JSON or YAML).
    pub data: PathBuf,
}

/// Execute `klartex validate`.
pub fn run_validate(args: &ValidateArgs, pipeline: &RenderPipeline) -> Result<u8> {
    let data = load_payload(&args.data)?;
    match pipeline.validate(&args.template, args.engine, &data) {
        Ok(engine) => {
            println!(
                "OK: {} is valid for template '{}' ({engine} engine)",
                args.data.display(),
                args.template
            );
            Ok(0)
        }
        Err(e) => {
            println!("FAIL: {} [{}]", args.data.display(), e.kind());
            for line in e.to_string().lines() {
                println!("  {line}");
            }
            Ok(1)
        }
    }
}
