//! # klartex CLI
//!
//! Entry point for the `klartex` binary. Parses arguments, configures
//! logging, builds the render pipeline, and dispatches to the subcommand
//! handlers in the library crate.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use klartex_cli::discover::{
    run_component_schema, run_components, run_page_chrome, run_schema, run_templates,
    ComponentSchemaArgs, SchemaArgs,
};
use klartex_cli::render::{run_render, RenderArgs};
use klartex_cli::validate::{run_validate, ValidateArgs};
use klartex_cli::AssetArgs;
use klartex_render::RenderPipeline;

/// Render typeset PDF documents from structured JSON or YAML payloads.
#[derive(Parser, Debug)]
#[command(name = "klartex", version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    assets: AssetArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a payload to PDF.
    Render(RenderArgs),

    /// List available templates and the modes they support.
    Templates,

    /// Print a template's document schema.
    Schema(SchemaArgs),

    /// List registered components.
    Components,

    /// Print a component's payload schema.
    ComponentSchema(ComponentSchemaArgs),

    /// List built-in page-chrome layouts.
    PageChrome,

    /// Validate a payload file against a template.
    Validate(ValidateArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = run(&cli).await;

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<u8> {
    let config = cli.assets.config()?;
    let pipeline = RenderPipeline::new(config)?;
    match &cli.command {
        Commands::Render(args) => run_render(args, &pipeline).await,
        Commands::Templates => run_templates(&pipeline),
        Commands::Schema(args) => run_schema(args, &pipeline),
        Commands::Components => run_components(&pipeline),
        Commands::ComponentSchema(args) => run_component_schema(args, &pipeline),
        Commands::PageChrome => run_page_chrome(&pipeline),
        Commands::Validate(args) => run_validate(args, &pipeline),
    }
}
