//! # Discovery Subcommands
//!
//! `templates`, `schema`, `components`, `component-schema` and
//! `page-chrome`. Listings are plain text; schemas are pretty JSON.

use std::io::Write;

use anyhow::Result;
use clap::Args;

use klartex_render::RenderPipeline;

use crate::report;

/// Arguments for `klartex schema`.
#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Template name.
    pub template: String,
}

/// Arguments for `klartex component-schema`.
#[derive(Args, Debug)]
pub struct ComponentSchemaArgs {
    /// Component name.
    pub name: String,
}

/// Mode indicator shown next to each template.
fn modes(block: bool, recipe: bool) -> &'static str {
    match (block, recipe) {
        (true, true) => "block+recipe",
        (true, false) => "block",
        (false, true) => "recipe",
        (false, false) => "-",
    }
}

pub fn write_templates(pipeline: &RenderPipeline, out: &mut impl Write) -> Result<()> {
    for t in pipeline.list_templates() {
        let mode = modes(t.supports_block_mode, t.supports_recipe_mode);
        writeln!(out, "  {:<16} [{mode:<12}] {}", t.name, t.description)?;
    }
    Ok(())
}

pub fn write_components(pipeline: &RenderPipeline, out: &mut impl Write) -> Result<()> {
    for c in pipeline.list_components() {
        let package = c.support_package.unwrap_or("-");
        let usage = if c.has_payload_schema() { "block" } else { "recipe" };
        writeln!(out, "  {:<22} {usage:<7} {package:<24} {}", c.name, c.description)?;
    }
    Ok(())
}

pub fn write_page_chrome(pipeline: &RenderPipeline, out: &mut impl Write) -> Result<()> {
    for chrome in pipeline.list_page_chrome() {
        writeln!(
            out,
            "  {:<10} page_numbers={:<5} first_page_header={:<5} {}",
            chrome.name,
            chrome.defaults.page_numbers,
            chrome.defaults.first_page_header,
            chrome.description
        )?;
    }
    Ok(())
}

/// Execute `klartex templates`.
pub fn run_templates(pipeline: &RenderPipeline) -> Result<u8> {
    write_templates(pipeline, &mut std::io::stdout().lock())?;
    Ok(0)
}

/// Execute `klartex schema <template>`.
pub fn run_schema(args: &SchemaArgs, pipeline: &RenderPipeline) -> Result<u8> {
    match pipeline.schema(&args.template) {
        Ok(schema) => {
            println!("{}", serde_json::to_string_pretty(schema)?);
            Ok(0)
        }
        Err(e) => {
            report(&e);
            Ok(1)
        }
    }
}

/// Execute `klartex components`.
pub fn run_components(pipeline: &RenderPipeline) -> Result<u8> {
    write_components(pipeline, &mut std::io::stdout().lock())?;
    Ok(0)
}

/// Execute `klartex component-schema <name>`.
pub fn run_component_schema(args: &ComponentSchemaArgs, pipeline: &RenderPipeline) -> Result<u8> {
    match pipeline.component_schema(&args.name) {
        Ok(Some(schema)) => {
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(0)
        }
        Ok(None) => {
            println!("Component '{}' has no payload schema (recipe use only)", args.name);
            Ok(0)
        }
        Err(e) => {
            report(&e);
            Ok(1)
        }
    }
}

/// Execute `klartex page-chrome`.
pub fn run_page_chrome(pipeline: &RenderPipeline) -> Result<u8> {
    write_page_chrome(pipeline, &mut std::io::stdout().lock())?;
    Ok(0)
}
