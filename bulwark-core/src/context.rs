//! Per-request inspection context.

use crate::extensions::Extensions;
use crate::value::{FieldMap, FieldValue, field_map_from_json};
use std::collections::HashMap;

/// The data a host extracts from one inbound request.
///
/// Header names are stored lowercased so lookups are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub path: String,
    pub method: String,
    headers: HashMap<String, String>,
    pub query: FieldMap,
    pub body: FieldMap,
    extensions: Extensions,
}

impl RequestContext {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert_header(name, value);
        self
    }

    pub fn with_query(mut self, query: FieldMap) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: FieldMap) -> Self {
        self.body = body;
        self
    }

    /// Set the query from a JSON object. Non-object values give an empty query.
    pub fn with_json_query(self, query: serde_json::Value) -> Self {
        self.with_query(field_map_from_json(query))
    }

    /// Set the body from a JSON object. Non-object values give an empty body.
    pub fn with_json_body(self, body: serde_json::Value) -> Self {
        self.with_body(field_map_from_json(body))
    }

    /// Add a single query field.
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Add a single body field.
    pub fn with_body_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.body.insert(name.into(), value.into());
        self
    }

    pub fn insert_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Replace body and query with sanitized copies.
    pub fn replace_fields(&mut self, body: FieldMap, query: FieldMap) {
        self.body = body;
        self.query = query;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_headers_are_case_insensitive() {
        let ctx = RequestContext::new("GET", "/").with_header("Origin", "https://a.example");
        assert_eq!(ctx.header("origin"), Some("https://a.example"));
        assert_eq!(ctx.header("ORIGIN"), Some("https://a.example"));
        assert_eq!(ctx.header("referer"), None);
    }

    #[test]
    fn test_json_fields() {
        let ctx = RequestContext::new("POST", "/comments")
            .with_json_query(json!({"page": 2}))
            .with_json_body(json!({"comment": "hi"}));
        assert_eq!(ctx.query.len(), 1);
        assert_eq!(ctx.body.get("comment").and_then(FieldValue::as_str), Some("hi"));
    }

    #[test]
    fn test_replace_fields() {
        let mut ctx = RequestContext::new("POST", "/").with_body_field("a", "<b>x</b>");
        let mut clean = FieldMap::new();
        clean.insert("a".to_string(), FieldValue::from("x"));
        ctx.replace_fields(clean, FieldMap::new());
        assert_eq!(ctx.body.get("a").and_then(FieldValue::as_str), Some("x"));
    }
}
