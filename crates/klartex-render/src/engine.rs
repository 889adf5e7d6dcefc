//! # Handlebars Expansion Engine
//!
//! The [`TemplateEngine`] used by the pipeline. Base templates are the
//! `*.tex.hbs` files at the top level of the templates directory, each
//! registered under its file stem (`_block_engine`, `_recipe_base`, ...).
//! Component fragments live in `_partials/` and are registered the same
//! way; any registered template can be used as a partial.
//!
//! Output is compiler source, not HTML: the HTML escape function is
//! disabled and every untrusted value arrives already escaped. Strict mode
//! is off so absent optional fields expand to nothing.
//!
//! ## Helpers
//!
//! | Helper          | Example                          | Output      |
//! |-----------------|----------------------------------|-------------|
//! | `format_amount` | `{{format_amount 1234.5}}`       | `1 234,50`  |
//! | `add`           | `{{add @index 1}}`               | `3`         |

use std::path::{Path, PathBuf};

use handlebars::{
    no_escape, Context, Handlebars, Helper, HelperResult, Output,
    RenderContext as HandlebarsRenderContext,
};
use serde_json::Value;
use thiserror::Error;

use klartex_core::{Classify, ErrorKind, ExpansionError, TemplateEngine, TemplateRef};

const TEMPLATE_SUFFIX: &str = ".tex.hbs";
const PARTIALS_DIR: &str = "_partials";

/// A base template on disk could not be registered.
#[derive(Error, Debug)]
pub enum EngineLoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid expansion template {}: {reason}", path.display())]
    Template { path: PathBuf, reason: String },
}

impl Classify for EngineLoadError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

/// Formats a number with two decimals, a space as the thousands separator
/// and a decimal comma. Non-numeric input is written through unchanged.
fn format_amount_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut HandlebarsRenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let Some(param) = h.param(0).map(|p| p.value()) else {
        return Ok(());
    };
    let amount = match param {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(' ', "").replace(',', ".").parse().ok(),
        _ => None,
    };
    match amount {
        Some(amount) => out.write(&format_amount(amount))?,
        None => out.write(&klartex_core::display_value(param))?,
    }
    Ok(())
}

/// `1234.5` → `1 234,50`.
pub fn format_amount(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped},{frac_part}")
}

fn add_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut HandlebarsRenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let sum: i64 = h
        .params()
        .iter()
        .filter_map(|p| p.value().as_i64())
        .sum();
    out.write(&sum.to_string())?;
    Ok(())
}

/// Handlebars-backed expansion of base templates and inline fragments.
pub struct HandlebarsEngine {
    registry: Handlebars<'static>,
}

impl std::fmt::Debug for HandlebarsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.registry.get_templates().keys().collect();
        names.sort();
        f.debug_struct("HandlebarsEngine")
            .field("templates", &names)
            .finish()
    }
}

impl Default for HandlebarsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlebarsEngine {
    /// An engine with the helpers registered and no named templates.
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        registry.register_escape_fn(no_escape);
        registry.register_helper("format_amount", Box::new(format_amount_helper));
        registry.register_helper("add", Box::new(add_helper));
        Self { registry }
    }

    /// An engine with every `*.tex.hbs` file directly under `dir`, and under
    /// its `_partials` sub-directory, registered by file stem.
    ///
    /// A missing directory yields an engine without named templates.
    pub fn from_dir(dir: &Path) -> Result<Self, EngineLoadError> {
        let mut engine = Self::new();
        if !dir.is_dir() {
            tracing::warn!(dir = %dir.display(), "templates directory not found, no base templates registered");
            return Ok(engine);
        }
        engine.register_dir(dir)?;
        let partials = dir.join(PARTIALS_DIR);
        if partials.is_dir() {
            engine.register_dir(&partials)?;
        }
        Ok(engine)
    }

    fn register_dir(&mut self, dir: &Path) -> Result<(), EngineLoadError> {
        let entries = std::fs::read_dir(dir).map_err(|source| EngineLoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        files.sort();

        for path in files {
            let Some(name) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(TEMPLATE_SUFFIX))
                .map(str::to_string)
            else {
                continue;
            };
            let source = std::fs::read_to_string(&path).map_err(|source| EngineLoadError::Io {
                path: path.clone(),
                source,
            })?;
            self.register(&name, &source).map_err(|e| EngineLoadError::Template {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            tracing::debug!(template = %name, "registered expansion template");
        }
        Ok(())
    }

    /// Register `source` under `name`, replacing any previous template.
    pub fn register(&mut self, name: &str, source: &str) -> Result<(), ExpansionError> {
        self.registry
            .register_template_string(name, source)
            .map_err(|e| ExpansionError::Render {
                target: format!("template '{name}'"),
                reason: e.to_string(),
            })
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.registry.has_template(name)
    }
}

impl TemplateEngine for HandlebarsEngine {
    fn expand(&self, template: TemplateRef<'_>, context: &Value) -> Result<String, ExpansionError> {
        let rendered = match template {
            TemplateRef::Named(name) => {
                if !self.registry.has_template(name) {
                    return Err(ExpansionError::NotRegistered(name.to_string()));
                }
                self.registry.render(name, context)
            }
            TemplateRef::Inline(source) => self.registry.render_template(source, context),
        };
        rendered.map_err(|e| ExpansionError::Render {
            target: template.to_string(),
            reason: e.to_string(),
        })
    }
}
