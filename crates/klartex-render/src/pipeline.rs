//! # Render Pipeline
//!
//! `Resolving → Validating → Assembling → Expanding → Compiling → Done`.
//!
//! 1. **Resolving** looks up the template, picks the assembly engine and
//!    loads the branding profile.
//! 2. **Validating** checks the raw payload against the template's document
//!    schema and, in block mode, every block against its component schema.
//!    Validation always sees the unescaped payload.
//! 3. **Assembling** escapes the payload and builds the expansion context.
//! 4. **Expanding** expands the page-chrome fragment into `page_chrome_tex`
//!    and then the base template.
//! 5. **Compiling** runs the external compiler and returns the artifact.
//!
//! A failure in any stage ends the render with the originating error;
//! nothing is retried. The catalogs the pipeline reads are shared,
//! immutable and safe to use from concurrent renders.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use klartex_assembly::{
    assemble_blocks, assemble_recipe, escape_block_payload, load_recipe, BlockContext,
    ExpansionContext, RecipeContext,
};
use klartex_catalog::{
    components, page_chrome, registry, ComponentSpec, PageChromeInfo, TemplateInfo,
    TemplateRegistry, TemplateSummary,
};
use klartex_core::{escape_value, TemplateEngine, TemplateRef};
use klartex_schema::SchemaValidator;

use crate::branding::{Branding, DEFAULT_BRANDING};
use crate::compiler::{Compiler, WorkspaceBinding};
use crate::config::RenderConfig;
use crate::engine::HandlebarsEngine;
use crate::error::{RenderError, Stage};

/// Context key holding the expanded page-chrome fragment.
pub const PAGE_CHROME_TEX_KEY: &str = "page_chrome_tex";

/// Assembly engine requested for a render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// Block mode when the template supports it and the payload has a
    /// `body`; otherwise recipe mode when supported; otherwise block mode.
    #[default]
    Auto,
    Block,
    Recipe,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Block => "block",
            Self::Recipe => "recipe",
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "block" => Ok(Self::Block),
            "recipe" => Ok(Self::Recipe),
            other => Err(format!(
                "invalid engine '{other}'. Must be 'auto', 'block', or 'recipe'"
            )),
        }
    }
}

/// One render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub template: String,
    pub data: Value,
    #[serde(default = "default_branding")]
    pub branding: String,
    #[serde(default)]
    pub engine: Engine,
    /// Page-chrome fragment source replacing the built-in one.
    #[serde(default)]
    pub page_chrome_source: Option<String>,
}

fn default_branding() -> String {
    DEFAULT_BRANDING.to_string()
}

impl RenderRequest {
    pub fn new(template: impl Into<String>, data: Value) -> Self {
        Self {
            template: template.into(),
            data,
            branding: default_branding(),
            engine: Engine::Auto,
            page_chrome_source: None,
        }
    }

    pub fn with_branding(mut self, branding: impl Into<String>) -> Self {
        self.branding = branding.into();
        self
    }

    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_page_chrome_source(mut self, source: impl Into<String>) -> Self {
        self.page_chrome_source = Some(source.into());
        self
    }
}

/// Compiler source produced by [`RenderPipeline::expand`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpandedDocument {
    pub source: String,
    /// The engine actually used; never [`Engine::Auto`].
    pub engine: Engine,
    /// Stages passed through, in order.
    pub stages: Vec<Stage>,
}

struct StageTrail<'r> {
    template: &'r str,
    stages: Vec<Stage>,
}

impl<'r> StageTrail<'r> {
    fn new(template: &'r str) -> Self {
        Self {
            template,
            stages: Vec::with_capacity(6),
        }
    }

    fn enter(&mut self, stage: Stage) {
        tracing::debug!(template = self.template, stage = %stage, "render stage");
        self.stages.push(stage);
    }
}

/// Pick the engine for `info` given the requested one and the payload.
pub fn select_engine(info: &TemplateInfo, requested: Engine, data: &Value) -> Result<Engine, RenderError> {
    let unsupported = |engine| RenderError::UnsupportedEngine {
        template: info.name.clone(),
        engine,
    };
    match requested {
        Engine::Block if info.supports_block_mode => Ok(Engine::Block),
        Engine::Recipe if info.supports_recipe_mode => Ok(Engine::Recipe),
        Engine::Block | Engine::Recipe => Err(unsupported(requested)),
        Engine::Auto => {
            if info.supports_block_mode && data.get("body").is_some() {
                Ok(Engine::Block)
            } else if info.supports_recipe_mode {
                Ok(Engine::Recipe)
            } else if info.supports_block_mode {
                Ok(Engine::Block)
            } else {
                Err(unsupported(requested))
            }
        }
    }
}

/// The document render pipeline.
#[derive(Debug)]
pub struct RenderPipeline {
    config: RenderConfig,
    registry: Arc<TemplateRegistry>,
    validator: SchemaValidator,
    engine: HandlebarsEngine,
    compiler: Compiler,
}

impl RenderPipeline {
    /// Discover templates, compile block schemas and load base templates.
    ///
    /// # Errors
    ///
    /// Any broken host asset: template tree, block schema or base template.
    pub fn new(config: RenderConfig) -> Result<Self, RenderError> {
        let registry = registry::shared(&config.templates_dir)?;
        let validator = SchemaValidator::new()?;
        let engine = HandlebarsEngine::from_dir(&config.templates_dir)?;
        let compiler = Compiler::new(config.compiler.clone());
        tracing::info!(
            templates = registry.len(),
            templates_dir = %config.templates_dir.display(),
            compiler = %config.compiler.program,
            "render pipeline ready"
        );
        Ok(Self {
            config,
            registry,
            validator,
            engine,
            compiler,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Host problems that would fail every render; empty when ready.
    ///
    /// Checks that the base template of each engine some template uses is
    /// registered and that the support-package directory exists.
    pub fn readiness_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let summaries = self.registry.list();
        let wanted = [
            (
                BlockContext::TEMPLATE,
                summaries.iter().any(|t| t.supports_block_mode),
            ),
            (
                RecipeContext::TEMPLATE,
                summaries.iter().any(|t| t.supports_recipe_mode),
            ),
        ];
        for (base, used) in wanted {
            if used && !self.engine.has_template(base) {
                problems.push(format!(
                    "base template '{base}' not found in {}",
                    self.config.templates_dir.display()
                ));
            }
        }
        if !self.config.support_dir.is_dir() {
            problems.push(format!(
                "support directory {} does not exist",
                self.config.support_dir.display()
            ));
        }
        problems
    }

    /// Render `request` to artifact bytes.
    pub async fn render(&self, request: &RenderRequest) -> Result<Vec<u8>, RenderError> {
        let started_at = Instant::now();
        let result = self.render_inner(request).await;
        match &result {
            Ok(bytes) => tracing::info!(
                template = %request.template,
                pdf_bytes = bytes.len(),
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                "render finished"
            ),
            Err(e) => tracing::warn!(
                template = %request.template,
                stage = %e.stage(),
                error_code = %klartex_core::Classify::kind(e),
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                error = %e,
                "render failed"
            ),
        }
        result
    }

    async fn render_inner(&self, request: &RenderRequest) -> Result<Vec<u8>, RenderError> {
        let expanded = self.expand(request)?;

        tracing::debug!(template = %request.template, stage = %Stage::Compiling, "render stage");
        let support_dir = canonical(&self.config.support_dir);
        let branding_dir = canonical(&self.config.branding_dir);
        let bindings = WorkspaceBinding::standard(&support_dir, Some(&branding_dir));
        let bytes = self
            .compiler
            .compile(&expanded.source, &bindings, &support_dir)
            .await?;

        tracing::debug!(template = %request.template, stage = %Stage::Done, "render stage");
        Ok(bytes)
    }

    /// Run every stage up to, not including, compilation.
    pub fn expand(&self, request: &RenderRequest) -> Result<ExpandedDocument, RenderError> {
        let mut trail = StageTrail::new(&request.template);

        trail.enter(Stage::Resolving);
        let info = self.registry.lookup(&request.template)?;
        let engine = select_engine(info, request.engine, &request.data)?;
        let branding = Branding::load(&request.branding, &self.config.branding_dir)?;
        tracing::debug!(template = %info.name, engine = %engine, "engine selected");

        trail.enter(Stage::Validating);
        self.validate_with(info, engine, &request.data)?;

        trail.enter(Stage::Assembling);
        let brand = branding.to_context();
        let chrome_source = request.page_chrome_source.as_deref();
        let source = match engine {
            Engine::Block => {
                let escaped = escape_block_payload(&request.data);
                let context = assemble_blocks(&escaped, chrome_source, &brand)?;
                trail.enter(Stage::Expanding);
                self.expand_context(&context)?
            }
            Engine::Recipe | Engine::Auto => {
                let recipe_path = info.recipe_path.as_deref().ok_or_else(|| {
                    RenderError::UnsupportedEngine {
                        template: info.name.clone(),
                        engine: Engine::Recipe,
                    }
                })?;
                let recipe = load_recipe(recipe_path)?;
                let escaped = escape_value(&request.data);
                let context = assemble_recipe(&recipe, &escaped, &self.engine, chrome_source, &brand)?;
                trail.enter(Stage::Expanding);
                self.expand_context(&context)?
            }
        };

        Ok(ExpandedDocument {
            source,
            engine,
            stages: trail.stages,
        })
    }

    /// Run only the validation passes the render of `template` would run.
    pub fn validate(&self, template: &str, engine: Engine, data: &Value) -> Result<Engine, RenderError> {
        let info = self.registry.lookup(template)?;
        let engine = select_engine(info, engine, data)?;
        self.validate_with(info, engine, data)?;
        Ok(engine)
    }

    fn validate_with(&self, info: &TemplateInfo, engine: Engine, data: &Value) -> Result<(), RenderError> {
        let subject = format!("Data for template '{}'", info.name);
        self.validator.validate_document(data, &info.schema, &subject)?;
        if engine == Engine::Block {
            // A missing body is reported by the assembler.
            if let Some(body) = data.get("body") {
                self.validator.validate_blocks(body)?;
            }
        }
        Ok(())
    }

    fn expand_context<C: ExpansionContext>(&self, context: &C) -> Result<String, RenderError> {
        let mut map = context.to_map()?;
        let chrome = self
            .engine
            .expand(TemplateRef::Inline(context.page_chrome_source()), &Value::Object(map.clone()))?;
        map.insert(PAGE_CHROME_TEX_KEY.to_string(), Value::String(chrome));
        Ok(self.engine.expand(TemplateRef::Named(C::TEMPLATE), &Value::Object(map))?)
    }

    pub fn list_templates(&self) -> Vec<TemplateSummary> {
        self.registry.list()
    }

    pub fn schema(&self, template: &str) -> Result<&Value, RenderError> {
        Ok(self.registry.schema(template)?)
    }

    pub fn list_components(&self) -> Vec<&'static ComponentSpec> {
        components::list_components()
    }

    /// `Ok(None)` for a known component without a payload schema.
    pub fn component_schema(&self, name: &str) -> Result<Option<Value>, RenderError> {
        Ok(components::component_schema(name)?)
    }

    pub fn list_page_chrome(&self) -> Vec<PageChromeInfo> {
        page_chrome::list_page_chrome()
    }
}

fn canonical(path: &Path) -> std::path::PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
