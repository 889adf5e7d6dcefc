//! # Block Assembler
//!
//! Builds the `_block_engine` context from a payload of the form:
//!
//! ```json
//! {
//!   "page_template": "formal",
//!   "lang": "sv",
//!   "body": [
//!     {"type": "heading", "text": "My Document"},
//!     {"type": "signatures", "parties": [{"name": "A"}, {"name": "B"}]}
//!   ]
//! }
//! ```
//!
//! ## Escaping
//!
//! [`escape_block_payload`] escapes every string of the raw payload and then
//! puts back the values that must stay verbatim: each block's `type`
//! discriminator, the page-chrome reference, and whole `latex` blocks.

use serde_json::Value;

use klartex_catalog::{components, page_chrome, PageChromeSpec, RAW_BLOCK_KIND};
use klartex_core::{escape_value, DEFAULT_LANG};

use crate::context::{push_unique, BlockContext};
use crate::error::AssemblyError;

/// Escape a raw block payload for expansion.
///
/// Must be called on the validated, unescaped payload.
pub fn escape_block_payload(raw: &Value) -> Value {
    let mut escaped = escape_value(raw);

    if let (Some(original), Some(map)) = (raw.get("page_template"), escaped.as_object_mut()) {
        map.insert("page_template".to_string(), original.clone());
    }

    let raw_body = raw.get("body").and_then(Value::as_array);
    let escaped_body = escaped.get_mut("body").and_then(Value::as_array_mut);
    if let (Some(raw_body), Some(escaped_body)) = (raw_body, escaped_body) {
        for (original, block) in raw_body.iter().zip(escaped_body.iter_mut()) {
            let kind = original.get("type");
            if kind.and_then(Value::as_str) == Some(RAW_BLOCK_KIND) {
                *block = original.clone();
                continue;
            }
            if let (Some(kind), Some(fields)) = (kind, block.as_object_mut()) {
                fields.insert("type".to_string(), kind.clone());
            }
        }
    }
    escaped
}

/// Derive the document title from the blocks.
///
/// The first qualifying block in document order wins: a `title_page` with a
/// non-empty `title`, or a `heading` (its `text`). With neither, the title
/// is empty.
pub fn extract_doc_title(body: &[Value]) -> String {
    for block in body {
        match block.get("type").and_then(Value::as_str) {
            Some("title_page") => {
                if let Some(title) = block.get("title").and_then(Value::as_str) {
                    if !title.is_empty() {
                        return title.to_string();
                    }
                }
            }
            Some("heading") => {
                return block
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
            }
            _ => {}
        }
    }
    String::new()
}

/// Build the block-engine context from an escaped payload.
///
/// `page_chrome_source`, when given, replaces the built-in chrome fragment.
/// `brand` must already be escaped.
///
/// # Errors
///
/// - [`AssemblyError::MissingField`] when `body` is absent or not a list.
/// - [`AssemblyError::Catalog`] when the page-chrome reference or a block
///   kind does not resolve.
pub fn assemble_blocks(
    payload: &Value,
    page_chrome_source: Option<&str>,
    brand: &Value,
) -> Result<BlockContext, AssemblyError> {
    let body = payload
        .get("body")
        .and_then(Value::as_array)
        .ok_or_else(|| AssemblyError::MissingField {
            field: "body",
            message: "Block engine data must include a 'body' array".to_string(),
        })?;

    let chrome = page_chrome::resolve(&PageChromeSpec::from_payload(payload)?)?;
    let chrome_source = page_chrome_source
        .map(str::to_string)
        .unwrap_or_else(|| page_chrome::source(&chrome).to_string());

    let mut support_packages = Vec::new();
    for block in body {
        if let Some(kind) = block.get("type").and_then(Value::as_str) {
            push_unique(&mut support_packages, components::lookup(kind)?.support_package);
        }
    }

    let lang = payload
        .get("lang")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_LANG)
        .to_string();

    tracing::debug!(
        blocks = body.len(),
        page_chrome = chrome.name,
        packages = support_packages.len(),
        "assembled block context"
    );

    Ok(BlockContext {
        doc_title: extract_doc_title(body),
        body: Value::Array(body.clone()),
        lang,
        page_chrome: chrome,
        page_chrome_source: chrome_source,
        support_packages,
        brand: brand.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExpansionContext;
    use klartex_core::{Classify, ErrorKind};
    use serde_json::json;

    fn assemble(payload: Value) -> Result<BlockContext, AssemblyError> {
        assemble_blocks(&payload, None, &json!({}))
    }

    #[test]
    fn test_missing_body() {
        let err = assemble(json!({"lang": "sv"})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingField);
        assert!(err.to_string().contains("body"));
    }

    #[test]
    fn test_body_not_a_list() {
        let err = assemble(json!({"body": "text"})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingField);
    }

    #[test]
    fn test_defaults() {
        let ctx = assemble(json!({"body": []})).unwrap();
        assert_eq!(ctx.lang, "sv");
        assert_eq!(ctx.page_chrome.name, "formal");
        assert_eq!(ctx.doc_title, "");
        assert!(ctx.page_chrome_source.contains("page chrome: formal"));
        assert!(ctx.support_packages.is_empty());
    }

    #[test]
    fn test_lang_and_chrome_override() {
        let ctx = assemble(json!({
            "lang": "en",
            "page_template": {"name": "clean", "first_page_header": true},
            "body": []
        }))
        .unwrap();
        assert_eq!(ctx.lang, "en");
        assert_eq!(ctx.page_chrome.name, "clean");
        assert!(ctx.page_chrome.first_page_header);
        assert!(ctx.page_chrome.page_numbers);
    }

    #[test]
    fn test_unknown_page_chrome() {
        let err = assemble(json!({"page_template": "fancy", "body": []})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownPageChrome);
    }

    #[test]
    fn test_chrome_source_override() {
        let ctx = assemble_blocks(&json!({"body": []}), Some("% custom"), &json!({})).unwrap();
        assert_eq!(ctx.page_chrome_source, "% custom");
        assert_eq!(ctx.page_chrome.name, "formal");
    }

    #[test]
    fn test_title_page_wins() {
        let body = vec![
            json!({"type": "title_page", "title": "Agreement"}),
            json!({"type": "heading", "text": "Different"}),
        ];
        assert_eq!(extract_doc_title(&body), "Agreement");
    }

    #[test]
    fn test_earlier_heading_wins_over_later_title_page() {
        let body = vec![
            json!({"type": "heading", "text": "First"}),
            json!({"type": "title_page", "title": "Agreement"}),
        ];
        assert_eq!(extract_doc_title(&body), "First");
    }

    #[test]
    fn test_first_heading_used() {
        let body = vec![
            json!({"type": "text", "text": "intro"}),
            json!({"type": "heading", "text": "My Document"}),
            json!({"type": "heading", "text": "Later"}),
        ];
        assert_eq!(extract_doc_title(&body), "My Document");
    }

    #[test]
    fn test_empty_title_page_skipped() {
        let body = vec![
            json!({"type": "title_page", "title": ""}),
            json!({"type": "heading", "text": "Fallback"}),
        ];
        assert_eq!(extract_doc_title(&body), "Fallback");
    }

    #[test]
    fn test_no_qualifying_block() {
        let body = vec![json!({"type": "text", "text": "Hello"})];
        assert_eq!(extract_doc_title(&body), "");
    }

    #[test]
    fn test_support_packages_deduplicated_in_order() {
        let ctx = assemble(json!({"body": [
            {"type": "clause", "title": "A", "items": []},
            {"type": "signatures", "parties": []},
            {"type": "clause", "title": "B", "items": []},
            {"type": "adjuster_signatures", "adjusters": []},
            {"type": "heading", "text": "x"}
        ]}))
        .unwrap();
        assert_eq!(
            ctx.support_packages,
            vec!["klartex-klausuler", "klartex-signaturblock"]
        );
    }

    #[test]
    fn test_context_key_set() {
        let ctx = assemble(json!({"body": [{"type": "heading", "text": "T"}]})).unwrap();
        let map = ctx.to_map().unwrap();
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "body",
                "lang",
                "doc_title",
                "page_chrome",
                "page_chrome_source",
                "support_packages",
                "brand"
            ]
        );
        assert_eq!(map["page_chrome"]["page_numbers"], true);
    }

    #[test]
    fn test_escape_restores_type_and_latex() {
        let raw = json!({
            "page_template": "formal",
            "body": [
                {"type": "name_roster", "people": [{"name": "A_B & Co"}]},
                {"type": "latex", "content": "\\vspace{1cm} 100%"},
                {"type": "text", "text": "50% off"}
            ]
        });
        let escaped = escape_block_payload(&raw);
        assert_eq!(escaped["body"][0]["type"], "name_roster");
        assert_eq!(escaped["body"][0]["people"][0]["name"], "A\\_B \\& Co");
        assert_eq!(escaped["body"][1], raw["body"][1]);
        assert_eq!(escaped["body"][2]["text"], "50\\% off");
    }

    #[test]
    fn test_escape_restores_page_template_reference() {
        let raw = json!({"page_template": {"name": "my_layout"}, "body": []});
        let escaped = escape_block_payload(&raw);
        assert_eq!(escaped["page_template"]["name"], "my_layout");
    }
}
