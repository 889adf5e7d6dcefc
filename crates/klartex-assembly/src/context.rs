//! # Expansion Contexts
//!
//! Each base template expects a fixed key set. The structs below are those
//! key sets; serializing one yields exactly the map the template reads.
//!
//! | Base template   | Keys |
//! |-----------------|------|
//! | `_block_engine` | `body`, `lang`, `doc_title`, `page_chrome`, `page_chrome_source`, `support_packages`, `brand` |
//! | `_recipe_base`  | `recipe`, `data`, `title`, `page_chrome`, `page_chrome_source`, `metadata`, `components`, `support_packages`, `lang`, `brand` |

use serde::Serialize;
use serde_json::{Map, Value};

use klartex_catalog::PageChrome;

use crate::error::AssemblyError;
use crate::expression::Evaluation;
use crate::recipe::Recipe;

/// A context bound to the base template that consumes it.
pub trait ExpansionContext: Serialize {
    /// Registered name of the base template.
    const TEMPLATE: &'static str;

    /// The page-chrome fragment source carried by this context.
    fn page_chrome_source(&self) -> &str;

    /// Serialize into the map handed to the expansion engine.
    fn to_map(&self) -> Result<Map<String, Value>, AssemblyError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(AssemblyError::Context(format!(
                "context serialized to {other} instead of a map"
            ))),
            Err(e) => Err(AssemblyError::Context(e.to_string())),
        }
    }
}

/// Context of the free-form block engine.
#[derive(Debug, Clone, Serialize)]
pub struct BlockContext {
    pub body: Value,
    pub lang: String,
    pub doc_title: String,
    pub page_chrome: PageChrome,
    pub page_chrome_source: String,
    pub support_packages: Vec<&'static str>,
    pub brand: Value,
}

impl ExpansionContext for BlockContext {
    const TEMPLATE: &'static str = "_block_engine";

    fn page_chrome_source(&self) -> &str {
        &self.page_chrome_source
    }
}

/// A metadata row shown under a recipe document's title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataRow {
    pub label: String,
    pub value: String,
}

/// A recipe component with its parameters bound to payload values.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedComponent<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub data: Map<String, Value>,
    pub options: &'a Map<String, Value>,
    pub support_package: Option<&'static str>,
}

/// Context of the recipe base template.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeContext<'a> {
    pub recipe: &'a Recipe,
    pub data: &'a Value,
    pub title: Evaluation,
    pub page_chrome: PageChrome,
    pub page_chrome_source: String,
    pub metadata: Vec<MetadataRow>,
    pub components: Vec<ResolvedComponent<'a>>,
    pub support_packages: Vec<&'static str>,
    pub lang: String,
    pub brand: Value,
}

impl ExpansionContext for RecipeContext<'_> {
    const TEMPLATE: &'static str = "_recipe_base";

    fn page_chrome_source(&self) -> &str {
        &self.page_chrome_source
    }
}

/// Appends `package` unless already present, keeping first-seen order.
pub(crate) fn push_unique(packages: &mut Vec<&'static str>, package: Option<&'static str>) {
    if let Some(package) = package {
        if !packages.contains(&package) {
            packages.push(package);
        }
    }
}
