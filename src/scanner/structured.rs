//! Structured data extraction
//!
//! JSON-LD blocks, microdata `itemtype` declarations and Open Graph tags.

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use std::sync::LazyLock;

static JSON_LD_SCRIPT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']?application/ld\+json["']?[^>]*>(.*?)</script>"#)
        .ok()
});

/// Structured data found on a page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredData {
    /// JSON-LD values plus one Open Graph object when `og:*` tags exist
    pub blobs: Vec<Value>,
    /// Schema.org types from JSON-LD `@type` and microdata `itemtype`
    pub schema_types: Vec<String>,
}

/// Extracts structured data from a parsed document and its raw markup
pub fn extract_structured_data(document: &Html, html: &str) -> StructuredData {
    let json_ld = extract_json_ld(html);

    let mut schema_types = Vec::new();
    for value in &json_ld {
        collect_types(value, &mut schema_types);
    }
    for item_type in extract_microdata_types(document) {
        push_unique(&mut schema_types, item_type);
    }

    let mut blobs = json_ld;
    if let Some(og) = extract_open_graph(document) {
        blobs.push(og);
    }

    StructuredData {
        blobs,
        schema_types,
    }
}

/// Parses every `<script type="application/ld+json">` block
///
/// Arrays are flattened; blocks that are not valid JSON are skipped.
pub fn extract_json_ld(html: &str) -> Vec<Value> {
    let Some(re) = JSON_LD_SCRIPT.as_ref() else {
        return Vec::new();
    };

    let mut values = Vec::new();
    for cap in re.captures_iter(html) {
        let Some(content) = cap.get(1) else {
            continue;
        };

        match serde_json::from_str::<Value>(content.as_str().trim()) {
            Ok(Value::Array(items)) => values.extend(items),
            Ok(value) => values.push(value),
            Err(e) => tracing::debug!("Skipping invalid JSON-LD block: {}", e),
        }
    }

    values
}

/// Collects `@type` values, descending into `@graph`
fn collect_types(value: &Value, out: &mut Vec<String>) {
    let Some(obj) = value.as_object() else {
        return;
    };

    match obj.get("@type") {
        Some(Value::String(t)) => push_unique(out, t.clone()),
        Some(Value::Array(types)) => {
            for t in types.iter().filter_map(Value::as_str) {
                push_unique(out, t.to_string());
            }
        }
        _ => {}
    }

    if let Some(Value::Array(graph)) = obj.get("@graph") {
        for node in graph {
            collect_types(node, out);
        }
    }
}

/// Microdata types, reduced to their last path segment
/// ("https://schema.org/Product" -> "Product")
fn extract_microdata_types(document: &Html) -> Vec<String> {
    let mut types = Vec::new();
    let Ok(selector) = Selector::parse("[itemtype]") else {
        return types;
    };

    for element in document.select(&selector) {
        let Some(item_type) = element.value().attr("itemtype") else {
            continue;
        };
        for t in item_type.split_whitespace() {
            let name = t.trim_end_matches('/').rsplit('/').next().unwrap_or(t);
            if !name.is_empty() {
                push_unique(&mut types, name.to_string());
            }
        }
    }

    types
}

/// Collects `og:*` meta tags into one JSON object
fn extract_open_graph(document: &Html) -> Option<Value> {
    let selector = Selector::parse(r#"meta[property^="og:"]"#).ok()?;

    let mut properties = Map::new();
    for element in document.select(&selector) {
        let property = element.value().attr("property");
        let content = element.value().attr("content");
        if let (Some(property), Some(content)) = (property, content) {
            properties
                .entry(property.to_string())
                .or_insert_with(|| Value::String(content.trim().to_string()));
        }
    }

    if properties.is_empty() {
        return None;
    }

    let mut og = Map::new();
    og.insert("@type".to_string(), Value::String("OpenGraph".to_string()));
    og.insert("properties".to_string(), Value::Object(properties));
    Some(Value::Object(og))
}

fn push_unique(out: &mut Vec<String>, value: String) {
    if !out.contains(&value) {
        out.push(value);
    }
}
