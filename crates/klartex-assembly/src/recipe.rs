//! # Recipes
//!
//! A recipe (`recipe.yaml` beside a template's `schema.json`) declares a
//! document as an ordered list of components whose parameters are bound to
//! payload fields by dotted paths, plus a title, a page-chrome choice and
//! metadata rows.
//!
//! ## Loading
//!
//! [`parse_recipe`] checks the YAML against the recipe schema, projects it
//! into typed form and resolves every component kind against the component
//! registry. An unknown kind fails here, at load time, never at render time.
//! A parsed [`Recipe`] is never mutated.
//!
//! ## Assembly
//!
//! [`assemble_recipe`] binds a recipe to an escaped payload and produces the
//! `_recipe_base` context.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use klartex_catalog::{
    components, page_chrome, ComponentSpec, DataMap, PageChromeSpec, DEFAULT_PAGE_CHROME,
};
use klartex_core::{display_value, present, resolve_dotted_path, TemplateEngine, DEFAULT_LANG};
use klartex_schema::{parse_yaml, validate_against};

use crate::context::{push_unique, MetadataRow, RecipeContext, ResolvedComponent};
use crate::error::AssemblyError;
use crate::expression::evaluate;

const RECIPE_SCHEMA: &str = include_str!("../schemas/recipe.schema.json");

fn default_page_template() -> String {
    DEFAULT_PAGE_CHROME.to_string()
}

fn default_suffix_separator() -> String {
    ", ".to_string()
}

/// A parsed recipe.
#[derive(Debug, Clone, Serialize)]
pub struct Recipe {
    pub name: String,
    pub description: String,
    pub lang: String,
    pub document: RecipeDocument,
    pub components: Vec<RecipeComponent>,
    pub content_fields: Map<String, Value>,
    /// The recipe's own reference to its document schema, if declared.
    #[serde(skip)]
    pub schema_ref: Option<String>,
    /// Where the recipe was loaded from, for error messages.
    #[serde(skip)]
    pub source: String,
}

/// Document-level settings of a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeDocument {
    /// Title expression.
    #[serde(default)]
    pub title: String,
    /// Page-chrome name or expression yielding one.
    #[serde(default = "default_page_template")]
    pub page_template: String,
    #[serde(default)]
    pub metadata: Vec<MetadataRule>,
}

impl Default for RecipeDocument {
    fn default() -> Self {
        Self {
            title: String::new(),
            page_template: default_page_template(),
            metadata: Vec::new(),
        }
    }
}

/// How one metadata row is derived from the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetadataRule {
    /// Dotted path of the primary value.
    pub field: String,
    pub label: String,
    /// Omit the row when the primary value is absent.
    #[serde(default)]
    pub optional: bool,
    /// Dotted paths appended after the primary value.
    #[serde(default)]
    pub suffix_fields: Vec<String>,
    #[serde(default = "default_suffix_separator")]
    pub suffix_separator: String,
}

/// One component entry of a recipe, resolved against the registry.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeComponent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data_map: DataMap,
    pub options: Map<String, Value>,
    #[serde(skip)]
    pub spec: &'static ComponentSpec,
}

#[derive(Deserialize)]
struct RawRecipe {
    #[serde(default)]
    schema: Option<String>,
    template: RawTemplate,
    #[serde(default)]
    document: RecipeDocument,
    #[serde(default)]
    components: Vec<RawComponent>,
    #[serde(default)]
    content_fields: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawTemplate {
    name: String,
    description: String,
    #[serde(default)]
    lang: Option<String>,
}

#[derive(Deserialize)]
struct RawComponent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data_map: DataMap,
    #[serde(default)]
    options: Map<String, Value>,
}

/// Parse recipe YAML. `source_name` identifies the recipe in errors.
///
/// # Errors
///
/// - [`AssemblyError::RecipeLoad`] for YAML that does not parse or project.
/// - [`AssemblyError::RecipeSchema`] when the recipe schema is violated.
/// - [`AssemblyError::Catalog`] (`UnknownComponent`) for an unknown
///   component kind.
pub fn parse_recipe(text: &str, source_name: &str) -> Result<Recipe, AssemblyError> {
    let load_err = |reason: String| AssemblyError::RecipeLoad {
        source_name: source_name.to_string(),
        reason,
    };

    let value = parse_yaml(text).map_err(|e| load_err(e.to_string()))?;
    let schema: Value = serde_json::from_str(RECIPE_SCHEMA)
        .map_err(|e| load_err(format!("built-in recipe schema is broken: {e}")))?;
    validate_against(&value, &schema, &format!("recipe '{source_name}'")).map_err(|error| {
        AssemblyError::RecipeSchema {
            source_name: source_name.to_string(),
            error,
        }
    })?;

    let raw: RawRecipe = serde_json::from_value(value).map_err(|e| load_err(e.to_string()))?;

    let resolved = raw
        .components
        .into_iter()
        .map(|c| -> Result<RecipeComponent, AssemblyError> {
            let spec = components::lookup(&c.kind)?;
            Ok(RecipeComponent {
                kind: c.kind,
                data_map: c.data_map,
                options: c.options,
                spec,
            })
        })
        .collect::<Result<Vec<_>, AssemblyError>>()?;

    tracing::debug!(
        recipe = %raw.template.name,
        components = resolved.len(),
        source = source_name,
        "loaded recipe"
    );

    Ok(Recipe {
        name: raw.template.name,
        description: raw.template.description,
        lang: raw.template.lang.unwrap_or_else(|| DEFAULT_LANG.to_string()),
        document: raw.document,
        components: resolved,
        content_fields: raw.content_fields,
        schema_ref: raw.schema,
        source: source_name.to_string(),
    })
}

/// Read and parse a recipe file.
pub fn load_recipe(path: &Path) -> Result<Recipe, AssemblyError> {
    let source_name = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|e| AssemblyError::RecipeLoad {
        source_name: source_name.clone(),
        reason: e.to_string(),
    })?;
    parse_recipe(&text, &source_name)
}

/// Apply metadata rules to a payload.
///
/// A rule whose primary value is absent (or null) is skipped when optional,
/// and otherwise shows an empty value. Present suffix values are joined by
/// the rule's separator and appended after `", "`.
pub fn resolve_metadata(rules: &[MetadataRule], payload: &Value) -> Vec<MetadataRow> {
    let mut rows = Vec::with_capacity(rules.len());
    for rule in rules {
        let value = present(resolve_dotted_path(payload, &rule.field));
        if value.is_none() && rule.optional {
            continue;
        }
        let mut display = value.map(display_value).unwrap_or_default();

        let suffixes: Vec<String> = rule
            .suffix_fields
            .iter()
            .filter_map(|path| present(resolve_dotted_path(payload, path)))
            .map(display_value)
            .filter(|s| !s.is_empty())
            .collect();
        if !suffixes.is_empty() {
            display = format!("{display}, {}", suffixes.join(&rule.suffix_separator));
        }

        rows.push(MetadataRow {
            label: rule.label.clone(),
            value: display,
        });
    }
    rows
}

/// Bind `recipe` to an escaped payload.
///
/// `page_chrome_source`, when given, replaces the built-in chrome fragment.
/// `brand` must already be escaped.
///
/// # Errors
///
/// [`AssemblyError::Catalog`] when the evaluated page-chrome name is unknown.
pub fn assemble_recipe<'a>(
    recipe: &'a Recipe,
    payload: &'a Value,
    engine: &dyn TemplateEngine,
    page_chrome_source: Option<&str>,
    brand: &Value,
) -> Result<RecipeContext<'a>, AssemblyError> {
    let title = evaluate(engine, &recipe.document.title, payload);

    let chrome_name = evaluate(engine, &recipe.document.page_template, payload);
    let chrome_name = match chrome_name.as_str().trim() {
        "" => DEFAULT_PAGE_CHROME,
        name => name,
    };
    let chrome = page_chrome::resolve(&PageChromeSpec::named(chrome_name))?;
    let chrome_source = page_chrome_source
        .map(str::to_string)
        .unwrap_or_else(|| page_chrome::source(&chrome).to_string());

    let metadata = resolve_metadata(&recipe.document.metadata, payload);

    let mut support_packages = Vec::new();
    let resolved: Vec<ResolvedComponent<'a>> = recipe
        .components
        .iter()
        .map(|c| {
            push_unique(&mut support_packages, c.spec.support_package);
            ResolvedComponent {
                kind: &c.kind,
                data: components::extract_fields(Some(&c.data_map), payload),
                options: &c.options,
                support_package: c.spec.support_package,
            }
        })
        .collect();

    tracing::debug!(
        recipe = %recipe.name,
        title_fallback = title.is_fallback(),
        page_chrome = chrome.name,
        metadata_rows = metadata.len(),
        "assembled recipe context"
    );

    Ok(RecipeContext {
        recipe,
        data: payload,
        title,
        page_chrome: chrome,
        page_chrome_source: chrome_source,
        metadata,
        components: resolved,
        support_packages,
        lang: recipe.lang.clone(),
        brand: brand.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExpansionContext;
    use crate::expression::Evaluation;
    use klartex_core::{Classify, ErrorKind, ExpansionError, TemplateRef};
    use serde_json::json;

    /// Expands `{{data.<path>}}` placeholders; rejects any other markup.
    struct PlaceholderEngine;

    impl TemplateEngine for PlaceholderEngine {
        fn expand(&self, template: TemplateRef<'_>, context: &Value) -> Result<String, ExpansionError> {
            let TemplateRef::Inline(mut rest) = template else {
                return Err(ExpansionError::NotRegistered(template.to_string()));
            };
            let mut out = String::new();
            while let Some(start) = rest.find("{{") {
                out.push_str(&rest[..start]);
                let after = &rest[start + 2..];
                let end = after.find("}}").ok_or_else(|| render_err("unclosed"))?;
                let path = after[..end]
                    .trim()
                    .strip_prefix("data.")
                    .ok_or_else(|| render_err("unsupported expression"))?;
                if let Some(v) = resolve_dotted_path(&context["data"], path) {
                    out.push_str(&display_value(v));
                }
                rest = &after[end + 2..];
            }
            out.push_str(rest);
            Ok(out)
        }
    }

    fn render_err(reason: &str) -> ExpansionError {
        ExpansionError::Render {
            target: "inline template".to_string(),
            reason: reason.to_string(),
        }
    }

    const PROTOKOLL: &str = r#"
schema: schema.json
template:
  name: protokoll
  description: Mötesprotokoll
document:
  title: "{{data.meeting_type}} {{data.date}}"
  page_template: "{{data.page_template}}"
  metadata:
    - {field: date, label: "Datum:", suffix_fields: [time_start, time_end], suffix_separator: "–"}
    - {field: location, label: "Plats:", optional: true}
    - {field: org.name, label: "Organisation:"}
components:
  - type: heading
    data_map: {title: meeting_type, subtitle: org.name}
  - type: attendees
    data_map: {attendees: attendees}
  - type: adjuster_signatures
    data_map: {adjusters: adjusters}
    options: {place_date: true}
  - type: signaturblock
content_fields:
  decisions: {description: "Beslut"}
"#;

    fn protokoll() -> Recipe {
        parse_recipe(PROTOKOLL, "protokoll/recipe.yaml").unwrap()
    }

    #[test]
    fn test_parse_recipe() {
        let recipe = protokoll();
        assert_eq!(recipe.name, "protokoll");
        assert_eq!(recipe.lang, "sv");
        assert_eq!(recipe.schema_ref.as_deref(), Some("schema.json"));
        assert_eq!(recipe.components.len(), 4);
        assert_eq!(recipe.components[2].spec.support_package, Some("klartex-signaturblock"));
        assert_eq!(recipe.document.metadata[0].suffix_separator, "–");
        assert_eq!(recipe.document.metadata[1].suffix_separator, ", ");
        assert!(recipe.document.metadata[1].optional);
        assert_eq!(recipe.content_fields["decisions"]["description"], "Beslut");
    }

    #[test]
    fn test_unknown_component_fails_at_load() {
        let text = "template: {name: x, description: y}\ncomponents:\n  - type: nonexistent\n";
        let err = parse_recipe(text, "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownComponent);
        assert!(err.to_string().contains("Unknown component 'nonexistent'"));
    }

    #[test]
    fn test_schema_violation_fails_at_load() {
        let err = parse_recipe("template: {name: x}\ncomponents: []\n", "x").unwrap_err();
        assert!(matches!(err, AssemblyError::RecipeSchema { .. }));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_invalid_yaml_fails_at_load() {
        let err = parse_recipe("template: [unclosed", "x").unwrap_err();
        assert!(matches!(err, AssemblyError::RecipeLoad { .. }));
    }

    #[test]
    fn test_defaults_when_document_omitted() {
        let text = "template: {name: x, description: y, lang: en}\ncomponents: []\n";
        let recipe = parse_recipe(text, "x").unwrap();
        assert_eq!(recipe.lang, "en");
        assert_eq!(recipe.document.page_template, "formal");
        assert!(recipe.document.title.is_empty());
    }

    #[test]
    fn test_metadata_optional_row_omitted() {
        let rules = vec![MetadataRule {
            field: "location".to_string(),
            label: "Plats:".to_string(),
            optional: true,
            suffix_fields: vec![],
            suffix_separator: ", ".to_string(),
        }];
        assert!(resolve_metadata(&rules, &json!({"date": "2025-01-01"})).is_empty());
        assert!(resolve_metadata(&rules, &json!({"location": null})).is_empty());
    }

    #[test]
    fn test_metadata_suffixes() {
        let rows = resolve_metadata(
            &protokoll().document.metadata,
            &json!({"date": "2025-03-01", "time_start": "18:00", "time_end": "19:30", "org": {"name": "BRF"}}),
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value, "2025-03-01, 18:00–19:30");
        assert_eq!(rows[1], MetadataRow { label: "Organisation:".into(), value: "BRF".into() });
    }

    #[test]
    fn test_metadata_missing_suffix_dropped() {
        let rows = resolve_metadata(
            &protokoll().document.metadata[..1],
            &json!({"date": "2025-03-01", "time_end": "19:30"}),
        );
        assert_eq!(rows[0].value, "2025-03-01, 19:30");
    }

    #[test]
    fn test_metadata_required_absent_shows_empty() {
        let rows = resolve_metadata(&protokoll().document.metadata[2..], &json!({}));
        assert_eq!(rows[0].value, "");
    }

    #[test]
    fn test_assemble_recipe_context() {
        let recipe = protokoll();
        let payload = json!({
            "meeting_type": "Styrelsemöte",
            "date": "2025-03-01",
            "page_template": "clean",
            "org": {"name": "BRF Solen"},
            "attendees": ["A", "B"],
            "adjusters": ["C"]
        });
        let brand = json!({"name": "Acme"});
        let ctx = assemble_recipe(&recipe, &payload, &PlaceholderEngine, None, &brand).unwrap();

        assert_eq!(ctx.title, Evaluation::Evaluated("Styrelsemöte 2025-03-01".into()));
        assert_eq!(ctx.page_chrome.name, "clean");
        assert!(ctx.page_chrome_source.contains("page chrome: clean"));
        assert_eq!(ctx.components[0].data["title"], "Styrelsemöte");
        assert_eq!(ctx.components[0].data["subtitle"], "BRF Solen");
        assert_eq!(ctx.components[2].options["place_date"], true);
        assert!(ctx.components[3].data.is_empty());
        assert_eq!(ctx.support_packages, vec!["klartex-signaturblock"]);
        assert_eq!(ctx.lang, "sv");

        let map = ctx.to_map().unwrap();
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "recipe",
                "data",
                "title",
                "page_chrome",
                "page_chrome_source",
                "metadata",
                "components",
                "support_packages",
                "lang",
                "brand"
            ]
        );
        assert_eq!(map["components"][0]["type"], "heading");
        assert_eq!(map["components"][2]["support_package"], "klartex-signaturblock");
        assert_eq!(map["recipe"]["components"][0]["data_map"]["title"], "meeting_type");
    }

    #[test]
    fn test_empty_page_template_defaults_to_formal() {
        let recipe = protokoll();
        let payload = json!({});
        let ctx = assemble_recipe(&recipe, &payload, &PlaceholderEngine, None, &json!({})).unwrap();
        assert_eq!(ctx.page_chrome.name, "formal");
    }

    #[test]
    fn test_unknown_page_template_fails() {
        let recipe = protokoll();
        let payload = json!({"page_template": "fancy"});
        let err = assemble_recipe(&recipe, &payload, &PlaceholderEngine, None, &json!({})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownPageChrome);
    }

    #[test]
    fn test_title_fallback_is_observable() {
        let mut recipe = protokoll();
        recipe.document.title = "{{#if data.x}}broken".to_string();
        let payload = json!({});
        let ctx = assemble_recipe(&recipe, &payload, &PlaceholderEngine, None, &json!({})).unwrap();
        assert!(ctx.title.is_fallback());
        assert_eq!(ctx.title.as_str(), "{{#if data.x}}broken");
    }

    #[test]
    fn test_support_packages_first_seen_order() {
        let text = r#"
template: {name: avtal, description: Avtal}
components:
  - {type: titelsida}
  - {type: klausuler}
  - {type: signaturblock}
  - {type: klausuler}
  - {type: invoice_note}
"#;
        let recipe = parse_recipe(text, "avtal").unwrap();
        let payload = json!({});
        let ctx = assemble_recipe(&recipe, &payload, &PlaceholderEngine, None, &json!({})).unwrap();
        assert_eq!(
            ctx.support_packages,
            vec!["klartex-titelsida", "klartex-klausuler", "klartex-signaturblock"]
        );
    }
}
