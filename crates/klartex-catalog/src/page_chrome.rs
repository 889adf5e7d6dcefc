//! # Page Chrome — Header, Footer & Pagination Layouts
//!
//! A page-chrome reference in a payload is either a bare layout name or an
//! object naming the layout plus field-by-field overrides:
//!
//! ```json
//! "page_template": "formal"
//! "page_template": {"name": "formal", "page_numbers": false}
//! ```
//!
//! [`resolve`] turns the reference into a [`PageChrome`] descriptor. An
//! explicit override always wins over the layout default; an unspecified
//! field keeps the default. The chrome fragment for a layout ([`source`]) is
//! itself an expansion template consulting `page_chrome.*` and `brand.*`.

use serde::Serialize;
use serde_json::Value;

use crate::error::{join_names, CatalogError};

/// Layout used when a payload carries no page-chrome reference.
pub const DEFAULT_PAGE_CHROME: &str = "formal";

/// Boolean defaults of a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageChromeDefaults {
    pub page_numbers: bool,
    pub first_page_header: bool,
}

struct Layout {
    name: &'static str,
    description: &'static str,
    defaults: PageChromeDefaults,
    source: &'static str,
}

static LAYOUTS: [Layout; 3] = [
    Layout {
        name: "clean",
        description: "Minimal footer with page numbers only",
        defaults: PageChromeDefaults {
            page_numbers: true,
            first_page_header: false,
        },
        source: include_str!("../chrome/clean.tex.hbs"),
    },
    Layout {
        name: "formal",
        description: "Full header with branding and page numbers",
        defaults: PageChromeDefaults {
            page_numbers: true,
            first_page_header: true,
        },
        source: include_str!("../chrome/formal.tex.hbs"),
    },
    Layout {
        name: "none",
        description: "No header or footer",
        defaults: PageChromeDefaults {
            page_numbers: false,
            first_page_header: false,
        },
        source: include_str!("../chrome/none.tex.hbs"),
    },
];

fn layout(name: &str) -> Result<&'static Layout, CatalogError> {
    LAYOUTS
        .iter()
        .find(|l| l.name == name)
        .ok_or_else(|| CatalogError::UnknownPageChrome {
            name: name.to_string(),
            available: join_names(LAYOUTS.iter().map(|l| l.name)),
        })
}

/// An unresolved page-chrome reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageChromeSpec {
    pub name: String,
    pub page_numbers: Option<bool>,
    pub first_page_header: Option<bool>,
}

impl PageChromeSpec {
    /// A reference by name with no overrides.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            page_numbers: None,
            first_page_header: None,
        }
    }

    /// Reads the reference carried by a payload's `page_template` field,
    /// defaulting to [`DEFAULT_PAGE_CHROME`] when the field is absent or null.
    pub fn from_payload(payload: &Value) -> Result<Self, CatalogError> {
        match payload.get("page_template") {
            None | Some(Value::Null) => Ok(Self::named(DEFAULT_PAGE_CHROME)),
            Some(value) => Self::try_from(value),
        }
    }
}

impl Default for PageChromeSpec {
    fn default() -> Self {
        Self::named(DEFAULT_PAGE_CHROME)
    }
}

impl TryFrom<&Value> for PageChromeSpec {
    type Error = CatalogError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let map = match value {
            Value::String(name) => return Ok(Self::named(name.clone())),
            Value::Object(map) => map,
            other => {
                return Err(CatalogError::InvalidPageChromeSpec(format!(
                    "expected a name or an object, got {other}"
                )))
            }
        };

        let mut spec = match map.get("name") {
            Some(Value::String(name)) => Self::named(name.clone()),
            _ => {
                return Err(CatalogError::InvalidPageChromeSpec(
                    "object form requires a string 'name'".to_string(),
                ))
            }
        };

        for (key, value) in map {
            let slot = match key.as_str() {
                "name" => continue,
                "page_numbers" => &mut spec.page_numbers,
                "first_page_header" => &mut spec.first_page_header,
                other => {
                    return Err(CatalogError::InvalidPageChromeSpec(format!(
                        "unknown override '{other}'"
                    )))
                }
            };
            *slot = Some(value.as_bool().ok_or_else(|| {
                CatalogError::InvalidPageChromeSpec(format!("override '{key}' must be a boolean"))
            })?);
        }
        Ok(spec)
    }
}

/// A resolved page-chrome descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageChrome {
    pub name: &'static str,
    pub description: &'static str,
    pub page_numbers: bool,
    pub first_page_header: bool,
    /// The concrete chrome layout the fragment is taken from.
    pub include: &'static str,
}

/// Resolves a reference against the built-in catalog, applying overrides.
pub fn resolve(spec: &PageChromeSpec) -> Result<PageChrome, CatalogError> {
    let layout = layout(&spec.name)?;
    Ok(PageChrome {
        name: layout.name,
        description: layout.description,
        page_numbers: spec.page_numbers.unwrap_or(layout.defaults.page_numbers),
        first_page_header: spec
            .first_page_header
            .unwrap_or(layout.defaults.first_page_header),
        include: layout.name,
    })
}

/// The built-in chrome fragment of a resolved layout.
pub fn source(chrome: &PageChrome) -> &'static str {
    LAYOUTS
        .iter()
        .find(|l| l.name == chrome.include)
        .map_or("", |l| l.source)
}

/// Catalog listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageChromeInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub defaults: PageChromeDefaults,
}

/// All built-in layouts, sorted by name.
pub fn list_page_chrome() -> Vec<PageChromeInfo> {
    let mut all: Vec<PageChromeInfo> = LAYOUTS
        .iter()
        .map(|l| PageChromeInfo {
            name: l.name,
            description: l.description,
            defaults: l.defaults,
        })
        .collect();
    all.sort_by_key(|info| info.name);
    all
}
