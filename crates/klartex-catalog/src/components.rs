//! # Component Registry
//!
//! A fixed table of every document-building-block kind the pipeline knows.
//! Block-mode kinds carry a payload schema (embedded at compile time from
//! `schemas/blocks/`); the legacy recipe-only kinds have none. `text` and
//! `preamble` share one schema.
//!
//! ## Invariant
//!
//! Every name referenced by a block or a recipe component must be present
//! here. [`lookup`] is the single gate and fails with the full list of
//! valid names; there is no fallback kind.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use klartex_core::resolve_dotted_path;

use crate::error::{join_names, CatalogError};

/// One registered component kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentSpec {
    /// Registered name, used as the block `type` or recipe component `type`.
    pub name: &'static str,
    /// Support package the compiled document must load, if any.
    pub support_package: Option<&'static str>,
    /// Human-readable description.
    pub description: &'static str,
    payload_schema: Option<&'static str>,
}

impl ComponentSpec {
    const fn new(
        name: &'static str,
        support_package: Option<&'static str>,
        description: &'static str,
        payload_schema: Option<&'static str>,
    ) -> Self {
        Self {
            name,
            support_package,
            description,
            payload_schema,
        }
    }

    /// Whether this kind declares a payload schema and is usable as a block.
    pub fn has_payload_schema(&self) -> bool {
        self.payload_schema.is_some()
    }

    /// Parses the declared payload schema.
    pub fn payload_schema(&self) -> Result<Option<Value>, CatalogError> {
        let Some(text) = self.payload_schema else {
            return Ok(None);
        };
        serde_json::from_str(text)
            .map(Some)
            .map_err(|e| CatalogError::InvalidComponentSchema {
                name: self.name.to_string(),
                reason: e.to_string(),
            })
    }
}

const TITELSIDA: Option<&str> = Some("klartex-titelsida");
const KLAUSULER: Option<&str> = Some("klartex-klausuler");
const SIGNATURBLOCK: Option<&str> = Some("klartex-signaturblock");

const TEXT_SCHEMA: &str = include_str!("../schemas/blocks/text.schema.json");

static COMPONENTS: &[ComponentSpec] = &[
    ComponentSpec::new(
        "heading",
        None,
        "Large bold heading text",
        Some(include_str!("../schemas/blocks/heading.schema.json")),
    ),
    ComponentSpec::new(
        "text",
        None,
        "Free-form text paragraph (also known as preamble)",
        Some(TEXT_SCHEMA),
    ),
    ComponentSpec::new(
        "preamble",
        None,
        "Introductory text paragraph (alias for text)",
        Some(TEXT_SCHEMA),
    ),
    ComponentSpec::new(
        "title_page",
        TITELSIDA,
        "Full-page title with party names and document title",
        Some(include_str!("../schemas/blocks/title_page.schema.json")),
    ),
    ComponentSpec::new(
        "parties",
        None,
        "Side-by-side display of two contract parties",
        Some(include_str!("../schemas/blocks/parties.schema.json")),
    ),
    ComponentSpec::new(
        "clause",
        KLAUSULER,
        "Numbered legal clause with title and items",
        Some(include_str!("../schemas/blocks/clause.schema.json")),
    ),
    ComponentSpec::new(
        "signatures",
        SIGNATURBLOCK,
        "Signature block for parties",
        Some(include_str!("../schemas/blocks/signatures.schema.json")),
    ),
    ComponentSpec::new(
        "adjuster_signatures",
        SIGNATURBLOCK,
        "Adjuster signature lines (for protocols)",
        Some(include_str!("../schemas/blocks/adjuster_signatures.schema.json")),
    ),
    ComponentSpec::new(
        "metadata_table",
        None,
        "Key-value metadata table (date, location, etc.)",
        Some(include_str!("../schemas/blocks/metadata_table.schema.json")),
    ),
    ComponentSpec::new(
        "attendees",
        None,
        "Attendee and adjuster list",
        Some(include_str!("../schemas/blocks/attendees.schema.json")),
    ),
    ComponentSpec::new(
        "agenda",
        Some("klartex-dagordning"),
        "§-numbered agenda with optional discussion and decisions",
        Some(include_str!("../schemas/blocks/agenda.schema.json")),
    ),
    ComponentSpec::new(
        "name_roster",
        Some("klartex-namnrollista"),
        "Name/role/note table for board listings",
        Some(include_str!("../schemas/blocks/name_roster.schema.json")),
    ),
    ComponentSpec::new(
        "page_break",
        None,
        "Force a page break",
        Some(include_str!("../schemas/blocks/page_break.schema.json")),
    ),
    ComponentSpec::new(
        "latex",
        None,
        "Raw markup passthrough (not escaped)",
        Some(include_str!("../schemas/blocks/latex.schema.json")),
    ),
    // Recipe-only kinds.
    ComponentSpec::new(
        "klausuler",
        KLAUSULER,
        "Legal clause numbering with \\clause command (recipe component)",
        None,
    ),
    ComponentSpec::new(
        "signaturblock",
        SIGNATURBLOCK,
        "Two-party signature block (recipe component)",
        None,
    ),
    ComponentSpec::new(
        "titelsida",
        TITELSIDA,
        "Title page with two party names and document title (recipe component)",
        None,
    ),
    ComponentSpec::new(
        "invoice_header",
        None,
        "Right-aligned invoice header with number, date, due date",
        None,
    ),
    ComponentSpec::new(
        "invoice_recipient",
        None,
        "Recipient info and references in two columns",
        None,
    ),
    ComponentSpec::new(
        "invoice_table",
        None,
        "Invoice line items table with VAT and totals",
        None,
    ),
    ComponentSpec::new(
        "payment_info",
        None,
        "Payment method table (bankgiro, IBAN, etc.)",
        None,
    ),
    ComponentSpec::new("invoice_note", None, "Optional invoice footer note", None),
];

/// The block kind whose raw `content` is never escaped.
pub const RAW_BLOCK_KIND: &str = "latex";

/// Looks up a component by name.
pub fn lookup(name: &str) -> Result<&'static ComponentSpec, CatalogError> {
    COMPONENTS
        .iter()
        .find(|spec| spec.name == name)
        .ok_or_else(|| CatalogError::UnknownComponent {
            name: name.to_string(),
            available: join_names(COMPONENTS.iter().map(|spec| spec.name)),
        })
}

/// All registered components, sorted by name.
pub fn list_components() -> Vec<&'static ComponentSpec> {
    let mut all: Vec<&'static ComponentSpec> = COMPONENTS.iter().collect();
    all.sort_by_key(|spec| spec.name);
    all
}

/// Names of the kinds usable as blocks (those with a payload schema), sorted.
pub fn block_kinds() -> Vec<&'static str> {
    let mut kinds: Vec<&'static str> = COMPONENTS
        .iter()
        .filter(|spec| spec.has_payload_schema())
        .map(|spec| spec.name)
        .collect();
    kinds.sort_unstable();
    kinds
}

/// The payload schema of a component, `None` for recipe-only kinds.
pub fn component_schema(name: &str) -> Result<Option<Value>, CatalogError> {
    lookup(name)?.payload_schema()
}

/// Ordered mapping from component parameter name to a dotted payload path.
///
/// Every value is a string; deserializing a non-string path fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct DataMap(Map<String, Value>);

impl DataMap {
    /// An empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `param` to `path`, replacing an earlier binding of `param` in place.
    pub fn insert(&mut self, param: impl Into<String>, path: impl Into<String>) {
        self.0.insert(param.into(), Value::String(path.into()));
    }

    /// Bindings in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter_map(|(p, v)| v.as_str().map(|path| (p.as_str(), path)))
    }

    /// The dotted path bound to `param`.
    pub fn get(&self, param: &str) -> Option<&str> {
        self.0.get(param).and_then(Value::as_str)
    }

    /// Number of bound parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no parameter is bound.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Map<String, Value>> for DataMap {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        match map.iter().find(|(_, v)| !v.is_string()) {
            Some((param, value)) => Err(format!(
                "data_map entry '{param}' must be a dotted-path string, got {value}"
            )),
            None => Ok(Self(map)),
        }
    }
}

impl<P: Into<String>, V: Into<String>> FromIterator<(P, V)> for DataMap {
    fn from_iter<I: IntoIterator<Item = (P, V)>>(iter: I) -> Self {
        let mut map = DataMap::new();
        for (param, path) in iter {
            map.insert(param, path);
        }
        map
    }
}

/// Resolves each bound parameter against `payload`.
///
/// Parameters keep their declared order. A path that does not resolve maps
/// its parameter to `null`. An absent or empty map yields an empty map.
pub fn extract_fields(data_map: Option<&DataMap>, payload: &Value) -> Map<String, Value> {
    let mut fields = Map::new();
    for (param, path) in data_map.into_iter().flat_map(DataMap::iter) {
        let value = resolve_dotted_path(payload, path)
            .cloned()
            .unwrap_or(Value::Null);
        fields.insert(param.to_string(), value);
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use klartex_core::{Classify, ErrorKind};
    use serde_json::json;

    #[test]
    fn test_lookup_known_component() {
        let spec = lookup("heading").unwrap();
        assert_eq!(spec.name, "heading");
        assert!(spec.support_package.is_none());
    }

    #[test]
    fn test_lookup_component_with_package() {
        assert_eq!(lookup("clause").unwrap().support_package, Some("klartex-klausuler"));
        assert_eq!(lookup("agenda").unwrap().support_package, Some("klartex-dagordning"));
    }

    #[test]
    fn test_lookup_unknown_lists_available() {
        let err = lookup("nonexistent").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownComponent);
        let msg = err.to_string();
        assert!(msg.contains("Unknown component 'nonexistent'"));
        assert!(msg.contains("heading"));
        assert!(msg.contains("invoice_note"));
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<&str> = COMPONENTS.iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), COMPONENTS.len());
    }

    #[test]
    fn test_list_components_sorted() {
        let names: Vec<&str> = list_components().iter().map(|s| s.name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 22);
    }

    #[test]
    fn test_block_kinds() {
        let kinds = block_kinds();
        assert_eq!(kinds.len(), 14);
        assert!(kinds.contains(&"latex"));
        assert!(kinds.contains(&"preamble"));
        assert!(!kinds.contains(&"klausuler"));
    }

    #[test]
    fn test_every_block_schema_parses_and_names_its_kind() {
        for kind in block_kinds() {
            let schema = component_schema(kind).unwrap().unwrap();
            assert_eq!(schema["type"], "object", "{kind}");
            let type_prop = &schema["properties"]["type"];
            let matches = type_prop["const"] == kind
                || type_prop["enum"]
                    .as_array()
                    .is_some_and(|e| e.iter().any(|v| v == kind));
            assert!(matches, "schema for {kind} does not accept its own type");
        }
    }

    #[test]
    fn test_text_and_preamble_share_schema() {
        assert_eq!(
            component_schema("text").unwrap(),
            component_schema("preamble").unwrap()
        );
    }

    #[test]
    fn test_recipe_only_kind_has_no_schema() {
        assert_eq!(component_schema("klausuler").unwrap(), None);
    }

    #[test]
    fn test_signatures_requires_two_parties() {
        let schema = component_schema("signatures").unwrap().unwrap();
        assert_eq!(schema["properties"]["parties"]["minItems"], 2);
    }

    #[test]
    fn test_latex_raw_field_is_content() {
        let schema = component_schema(RAW_BLOCK_KIND).unwrap().unwrap();
        assert_eq!(schema["required"], json!(["type", "content"]));
    }

    #[test]
    fn test_extract_fields() {
        let data = json!({"party1": {"name": "Acme"}, "title": "Agreement"});
        let map: DataMap = [("name", "party1.name"), ("heading", "title")]
            .into_iter()
            .collect();
        let fields = extract_fields(Some(&map), &data);
        assert_eq!(fields["name"], "Acme");
        assert_eq!(fields["heading"], "Agreement");
        let keys: Vec<&String> = fields.keys().collect();
        assert_eq!(keys, vec!["name", "heading"]);
    }

    #[test]
    fn test_extract_fields_missing_path_is_null() {
        let map: DataMap = [("x", "nope.deeper")].into_iter().collect();
        let fields = extract_fields(Some(&map), &json!({}));
        assert_eq!(fields["x"], Value::Null);
    }

    #[test]
    fn test_extract_fields_empty_map() {
        assert!(extract_fields(None, &json!({"a": 1})).is_empty());
        assert!(extract_fields(Some(&DataMap::new()), &json!({"a": 1})).is_empty());
    }

    #[test]
    fn test_data_map_serde_keeps_order() {
        let map: DataMap = serde_json::from_value(json!({"z": "a.b", "a": "c"})).unwrap();
        let entries: Vec<(&str, &str)> = map.iter().collect();
        assert_eq!(entries, vec![("z", "a.b"), ("a", "c")]);
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"z":"a.b","a":"c"}"#);
    }

    #[test]
    fn test_data_map_rejects_non_string_paths() {
        let err = serde_json::from_value::<DataMap>(json!({"name": "a", "x": 1})).unwrap_err();
        assert!(err.to_string().contains("data_map entry 'x'"));
    }

    #[test]
    fn test_data_map_get_and_len() {
        let map: DataMap = serde_json::from_value(json!({"title": "meeting_type"})).unwrap();
        assert_eq!(map.get("title"), Some("meeting_type"));
        assert_eq!(map.get("missing"), None);
        assert_eq!(map.len(), 1);
        assert!(!map.is_empty());
        assert!(DataMap::new().is_empty());
    }

    #[test]
    fn test_data_map_insert_replaces_in_place() {
        let mut map = DataMap::new();
        map.insert("a", "x");
        map.insert("b", "y");
        map.insert("a", "z");
        let entries: Vec<(&str, &str)> = map.iter().collect();
        assert_eq!(entries, vec![("a", "z"), ("b", "y")]);
    }
}
