//! # Template Registry — Discovery & Classification
//!
//! Scans a templates directory for `<name>/schema.json` and classifies each
//! template by the assembly paths it can serve:
//!
//! - **recipe mode** when a `recipe.yaml` sits beside the schema;
//! - **block mode** when the schema declares a `body` property of
//!   `type: array`.
//!
//! Directories whose name starts with `_` are never templates. A directory
//! supporting neither mode is skipped with a warning. The free-form block
//! engine is always registered under [`BLOCK_ENGINE_TEMPLATE`], whatever the
//! directory holds.
//!
//! ## Sharing
//!
//! Discovery touches the filesystem, so [`shared`] memoizes one registry per
//! directory. A memoized registry is immutable; [`reset_shared`] drops every
//! cached registry and exists for test isolation.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;

use crate::error::{join_names, CatalogError};

/// Name of the built-in free-form block engine template.
pub const BLOCK_ENGINE_TEMPLATE: &str = "_block";

const BLOCK_DOCUMENT_SCHEMA: &str = include_str!("../schemas/block_document.schema.json");
const RECIPE_FILE: &str = "recipe.yaml";
const SCHEMA_FILE: &str = "schema.json";

/// A discovered template.
#[derive(Debug, Clone)]
pub struct TemplateInfo {
    pub name: String,
    pub description: String,
    /// Document-level schema validated against the whole payload.
    pub schema: Value,
    pub supports_block_mode: bool,
    pub supports_recipe_mode: bool,
    /// Location of `recipe.yaml` when recipe mode is supported.
    pub recipe_path: Option<PathBuf>,
}

impl TemplateInfo {
    /// Listing view without the schema.
    pub fn summary(&self) -> TemplateSummary {
        TemplateSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            supports_block_mode: self.supports_block_mode,
            supports_recipe_mode: self.supports_recipe_mode,
        }
    }
}

/// Entry returned by [`TemplateRegistry::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateSummary {
    pub name: String,
    pub description: String,
    pub supports_block_mode: bool,
    pub supports_recipe_mode: bool,
}

/// Immutable set of discovered templates, keyed by name.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, TemplateInfo>,
}

impl TemplateRegistry {
    /// A registry holding only the built-in block engine.
    pub fn builtin() -> Result<Self, CatalogError> {
        let schema: Value =
            serde_json::from_str(BLOCK_DOCUMENT_SCHEMA).map_err(|e| CatalogError::Discovery {
                path: PathBuf::from(BLOCK_ENGINE_TEMPLATE),
                reason: e.to_string(),
            })?;
        let info = TemplateInfo {
            name: BLOCK_ENGINE_TEMPLATE.to_string(),
            description: description_of(&schema),
            schema,
            supports_block_mode: true,
            supports_recipe_mode: false,
            recipe_path: None,
        };
        let mut templates = BTreeMap::new();
        templates.insert(info.name.clone(), info);
        Ok(Self { templates })
    }

    /// Scans `templates_dir`. A missing directory yields only the built-ins.
    pub fn discover(templates_dir: &Path) -> Result<Self, CatalogError> {
        let mut registry = Self::builtin()?;

        if !templates_dir.is_dir() {
            tracing::warn!(
                dir = %templates_dir.display(),
                "templates directory not found, only built-in templates are available"
            );
            return Ok(registry);
        }

        let io_err = |source| CatalogError::Io {
            path: templates_dir.to_path_buf(),
            source,
        };
        let mut dirs: Vec<PathBuf> = std::fs::read_dir(templates_dir)
            .map_err(io_err)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();

        for dir in dirs {
            let Some(name) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            if name.starts_with('_') {
                continue;
            }
            let schema_path = dir.join(SCHEMA_FILE);
            if !schema_path.is_file() {
                continue;
            }
            let schema = read_schema(&schema_path)?;

            let supports_block_mode = declares_block_body(&schema);
            let recipe_path = Some(dir.join(RECIPE_FILE)).filter(|p| p.is_file());
            let supports_recipe_mode = recipe_path.is_some();

            if !supports_block_mode && !supports_recipe_mode {
                tracing::warn!(
                    template = %name,
                    "template supports neither block nor recipe mode, skipping"
                );
                continue;
            }

            tracing::debug!(
                template = %name,
                block = supports_block_mode,
                recipe = supports_recipe_mode,
                "discovered template"
            );
            registry.templates.insert(
                name.clone(),
                TemplateInfo {
                    name,
                    description: description_of(&schema),
                    schema,
                    supports_block_mode,
                    supports_recipe_mode,
                    recipe_path,
                },
            );
        }

        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&TemplateInfo> {
        self.templates.get(name)
    }

    /// Like [`get`](Self::get), but an unknown name lists the registered ones.
    pub fn lookup(&self, name: &str) -> Result<&TemplateInfo, CatalogError> {
        self.get(name).ok_or_else(|| CatalogError::UnknownTemplate {
            name: name.to_string(),
            available: join_names(self.templates.keys().map(String::as_str)),
        })
    }

    /// Document schema of a template.
    pub fn schema(&self, name: &str) -> Result<&Value, CatalogError> {
        self.lookup(name).map(|info| &info.schema)
    }

    /// All templates, sorted by name.
    pub fn list(&self) -> Vec<TemplateSummary> {
        self.templates.values().map(TemplateInfo::summary).collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn read_schema(path: &Path) -> Result<Value, CatalogError> {
    let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|e| CatalogError::Discovery {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn declares_block_body(schema: &Value) -> bool {
    schema
        .pointer("/properties/body/type")
        .and_then(Value::as_str)
        == Some("array")
}

fn description_of(schema: &Value) -> String {
    schema
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

type SharedRegistries = RwLock<HashMap<PathBuf, Arc<TemplateRegistry>>>;

fn shared_registries() -> &'static SharedRegistries {
    static SHARED: OnceLock<SharedRegistries> = OnceLock::new();
    SHARED.get_or_init(|| RwLock::new(HashMap::new()))
}

/// The memoized registry for `templates_dir`, discovering it on first use.
///
/// Concurrent first calls may both run discovery; the first result stored
/// wins and every caller receives that same registry.
pub fn shared(templates_dir: &Path) -> Result<Arc<TemplateRegistry>, CatalogError> {
    if let Some(registry) = shared_registries().read().get(templates_dir) {
        return Ok(Arc::clone(registry));
    }
    let discovered = Arc::new(TemplateRegistry::discover(templates_dir)?);
    let mut cache = shared_registries().write();
    let registry = cache
        .entry(templates_dir.to_path_buf())
        .or_insert(discovered);
    Ok(Arc::clone(registry))
}

/// Drops every memoized registry.
pub fn reset_shared() {
    shared_registries().write().clear();
}
