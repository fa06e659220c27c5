//! Scan-and-sanitize passes over cloned field trees.

use crate::catalog::{ANY_TAG, Category, Pattern, TAG_LIKE, remove_spans};
use crate::config::{SanitizeHistory, XssConfig};
use crate::normalizer::Normalizer;
use crate::result::{Context, DetectionResult};
use crate::severity::classify;
use bulwark_core::{FieldMap, FieldValue, checked_clone_map};
use std::borrow::Cow;
use std::time::Instant;
use tracing::{trace, warn};

/// Vector recorded for a string field over `maxFieldBytes`.
pub const LIMIT_FIELD_SIZE: &str = "limit-fieldSize";

/// Vector recorded once when the per-request time budget runs out.
pub const LIMIT_SCAN_BUDGET: &str = "limit-scanBudget";

/// Vector recorded for each container nested deeper than `maxDepth`.
pub const LIMIT_DEPTH: &str = "limit-depth";

/// Upper bound on strip-until-clean rounds for one string.
const MAX_SETTLE_PASSES: usize = 16;

/// Working copy of a request's body or query.
#[derive(Debug, Clone)]
pub struct FieldTree {
    source: &'static str,
    fields: FieldMap,
    max_depth: usize,
    partial: bool,
    overflow: Vec<String>,
}

impl FieldTree {
    /// Clone `fields` for inspection. When a structural clone is impossible
    /// the tree keeps a plain copy: binary leaves are skipped and containers
    /// nested deeper than `max_depth` are listed as overflow. Every other
    /// string is still scanned.
    pub fn prepare(source: &'static str, fields: &FieldMap, max_depth: usize) -> Self {
        let mut tree = Self {
            source,
            fields: FieldMap::new(),
            max_depth,
            partial: false,
            overflow: Vec::new(),
        };

        match checked_clone_map(fields, source, max_depth) {
            Ok(cloned) => tree.fields = cloned,
            Err(err) => {
                warn!(
                    source,
                    error = %err,
                    "Input cannot be fully cloned for inspection, skipping uninspectable values"
                );
                tree.fields = fields.clone();
                tree.partial = true;
                for (key, value) in &tree.fields {
                    collect_overflow(value, &format!("{source}.{key}"), 0, max_depth, &mut tree.overflow);
                }
            }
        }
        tree
    }

    pub fn source(&self) -> &'static str {
        self.source
    }

    /// Whether some values (binary leaves, over-deep containers) are not scanned.
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    /// Paths of containers nested deeper than the depth limit.
    pub fn overflow(&self) -> &[String] {
        &self.overflow
    }

    /// Replace every over-deep container with null.
    pub fn prune_overflow(&mut self) {
        let max_depth = self.max_depth;
        for value in self.fields.values_mut() {
            prune(value, 0, max_depth);
        }
        self.overflow.clear();
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn into_fields(self) -> FieldMap {
        self.fields
    }

    /// Visit every inspectable string leaf with its path.
    pub fn for_each_string<F>(&mut self, mut f: F)
    where
        F: FnMut(&str, &mut String),
    {
        let source = self.source;
        let max_depth = self.max_depth;
        for (key, value) in self.fields.iter_mut() {
            visit(value, &format!("{source}.{key}"), 0, max_depth, &mut f);
        }
    }

    /// Top-level string field by name.
    pub fn top_level_string(&mut self, key: &str) -> Option<(String, &mut String)> {
        match self.fields.get_mut(key) {
            Some(FieldValue::String(s)) => Some((format!("{}.{key}", self.source), s)),
            _ => None,
        }
    }
}

fn is_container(value: &FieldValue) -> bool {
    matches!(value, FieldValue::Array(_) | FieldValue::Object(_))
}

fn visit<F>(value: &mut FieldValue, path: &str, depth: usize, max_depth: usize, f: &mut F)
where
    F: FnMut(&str, &mut String),
{
    if is_container(value) && depth >= max_depth {
        return;
    }
    match value {
        FieldValue::String(s) => f(path, s),
        FieldValue::Array(items) => {
            for (i, item) in items.iter_mut().enumerate() {
                visit(item, &format!("{path}[{i}]"), depth + 1, max_depth, f);
            }
        }
        FieldValue::Object(map) => {
            for (key, item) in map.iter_mut() {
                visit(item, &format!("{path}.{key}"), depth + 1, max_depth, f);
            }
        }
        _ => {}
    }
}

fn collect_overflow(value: &FieldValue, path: &str, depth: usize, max_depth: usize, out: &mut Vec<String>) {
    if is_container(value) && depth >= max_depth {
        out.push(path.to_string());
        return;
    }
    match value {
        FieldValue::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_overflow(item, &format!("{path}[{i}]"), depth + 1, max_depth, out);
            }
        }
        FieldValue::Object(map) => {
            for (key, item) in map {
                collect_overflow(item, &format!("{path}.{key}"), depth + 1, max_depth, out);
            }
        }
        _ => {}
    }
}

fn prune(value: &mut FieldValue, depth: usize, max_depth: usize) {
    if is_container(value) && depth >= max_depth {
        *value = FieldValue::Null;
        return;
    }
    match value {
        FieldValue::Array(items) => items.iter_mut().for_each(|item| prune(item, depth + 1, max_depth)),
        FieldValue::Object(map) => map.values_mut().for_each(|item| prune(item, depth + 1, max_depth)),
        _ => {}
    }
}

/// Accumulates one request's detections across all passes.
#[derive(Debug)]
pub struct Scanner {
    result: DetectionResult,
    strip: bool,
    history: SanitizeHistory,
    max_field_bytes: usize,
    deadline: Option<Instant>,
    exhausted: bool,
}

impl Scanner {
    pub fn new(config: &XssConfig) -> Self {
        Self {
            result: DetectionResult::new(),
            strip: config.mode.strips(),
            history: config.sanitize_history,
            max_field_bytes: config.max_field_bytes,
            deadline: config
                .scan_budget()
                .and_then(|budget| Instant::now().checked_add(budget)),
            exhausted: false,
        }
    }

    pub fn mark_partial(&mut self) {
        self.result.shallow_scan = true;
    }

    pub fn strips(&self) -> bool {
        self.strip
    }

    pub fn result(&self) -> &DetectionResult {
        &self.result
    }

    /// True once the time budget has run out. Records the limit vector the
    /// first time.
    fn out_of_budget(&mut self) -> bool {
        if self.exhausted {
            return true;
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.exhausted = true;
                self.result.record_hit(LIMIT_SCAN_BUDGET, 1);
                warn!("XSS scan budget exhausted, remaining fields skipped");
                true
            }
            _ => false,
        }
    }

    fn within_limit(&self, value: &str) -> bool {
        value.len() <= self.max_field_bytes
    }

    /// Record oversized string fields and empty them when stripping.
    pub fn enforce_field_limit(&mut self, tree: &mut FieldTree) {
        tree.for_each_string(|path, value| {
            if self.within_limit(value) {
                return;
            }
            self.result.record_hit(LIMIT_FIELD_SIZE, 1);
            if self.strip {
                let original = std::mem::take(value);
                self.result
                    .record_change(path, original, String::new(), self.history);
            }
        });
    }

    /// Record containers nested past the depth limit. They cannot be
    /// scanned, so they count as detections and are dropped when stripping.
    pub fn enforce_depth_limit(&mut self, tree: &mut FieldTree) {
        let overflow = tree.overflow().len();
        if overflow == 0 {
            return;
        }
        self.result.record_hit(LIMIT_DEPTH, overflow);
        if self.strip {
            tree.prune_overflow();
        }
    }

    /// Decode every inspectable string in place.
    pub fn normalize(&mut self, tree: &mut FieldTree, normalizer: &Normalizer) {
        tree.for_each_string(|_, value| {
            if !self.within_limit(value) || self.out_of_budget() {
                return;
            }
            let decoded = match normalizer.normalize(value) {
                Cow::Owned(decoded) => decoded,
                Cow::Borrowed(_) => return,
            };
            *value = decoded;
        });
    }

    /// Apply every pattern of one category, pattern-major, to each tree in
    /// order. Returns whether anything matched.
    pub fn scan_category(
        &mut self,
        category: Category,
        patterns: &[Pattern],
        trees: &mut [&mut FieldTree],
    ) -> bool {
        let strip = self.strip && !category.is_check_only();
        let mut fired = false;

        for pattern in patterns {
            for tree in trees.iter_mut() {
                tree.for_each_string(|path, value| {
                    if !self.within_limit(value) || self.out_of_budget() {
                        return;
                    }
                    let spans = pattern.find_spans(value);
                    if spans.is_empty() {
                        return;
                    }

                    fired = true;
                    self.result.record_hit(pattern.vector(), spans.len());
                    if strip {
                        let sanitized = remove_spans(value, &spans);
                        let original = std::mem::replace(value, sanitized.clone());
                        self.result
                            .record_change(path, original, sanitized, self.history);
                    }
                });
            }
        }

        if fired {
            if let Some(context) = category.context() {
                self.result.add_context(context);
            }
        }
        trace!(category = category.prefix(), fired, "Category scanned");
        fired
    }

    /// Strict pass for top-level sensitive parameters: any tag-like content
    /// counts once and every tag is stripped.
    pub fn scan_sensitive(&mut self, params: &[String], trees: &mut [&mut FieldTree]) -> bool {
        let mut fired = false;

        for param in params {
            for tree in trees.iter_mut() {
                if self.out_of_budget() {
                    return fired;
                }
                let Some((path, value)) = tree.top_level_string(param) else {
                    continue;
                };
                if !self.within_limit(value) || !TAG_LIKE.is_match(value) {
                    continue;
                }

                fired = true;
                self.result.record_hit(&format!("sensitive-param-{param}"), 1);
                self.result.add_context(Context::Sensitive);
                if self.strip {
                    let sanitized = ANY_TAG.replace_all(value, "").into_owned();
                    let original = std::mem::replace(value, sanitized.clone());
                    self.result
                        .record_change(&path, original, sanitized, self.history);
                }
            }
        }

        trace!(fired, "Sensitive parameters scanned");
        fired
    }

    /// Strip with `sets` until none of their patterns matches any string,
    /// since removing one span can join the text around it into a new match.
    /// A string still matching after the pass limit is emptied. Matches found
    /// here are not counted again.
    pub fn settle(&mut self, tree: &mut FieldTree, sets: &[&[Pattern]]) {
        if !self.strip {
            return;
        }
        let patterns = || sets.iter().flat_map(|set| set.iter());

        tree.for_each_string(|path, value| {
            if !self.within_limit(value) {
                return;
            }
            for _ in 0..MAX_SETTLE_PASSES {
                let mut changed = false;
                for pattern in patterns() {
                    let spans = pattern.find_spans(value);
                    if spans.is_empty() {
                        continue;
                    }
                    changed = true;
                    let sanitized = remove_spans(value, &spans);
                    let original = std::mem::replace(value, sanitized.clone());
                    self.result
                        .record_change(path, original, sanitized, self.history);
                }
                if !changed {
                    return;
                }
            }
            if patterns().any(|pattern| pattern.count(value) > 0) {
                warn!(path, "Field still matches after repeated stripping, emptying it");
                let original = std::mem::take(value);
                self.result
                    .record_change(path, original, String::new(), self.history);
            }
        });
    }

    /// Classify severity and hand back the result.
    pub fn finish(mut self) -> DetectionResult {
        self.result.severity = classify(&self.result.contexts, self.result.count);
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::Mode;
    use crate::result::Severity;
    use serde_json::json;
    use std::time::Duration;

    fn tree(source: &'static str, json: serde_json::Value) -> FieldTree {
        FieldTree::prepare(source, &bulwark_core::field_map_from_json(json), 8)
    }

    fn patterns(category: Category) -> &'static [Pattern] {
        Catalog::builtin().compiled_patterns_for(category)
    }

    #[test]
    fn test_paths_cover_nested_values() {
        let mut t = tree("query", json!({"a": {"b": ["x", 1, "y"]}, "c": "z"}));
        let mut seen = Vec::new();
        t.for_each_string(|path, _| seen.push(path.to_string()));
        assert_eq!(seen, vec!["query.a.b[0]", "query.a.b[2]", "query.c"]);
    }

    #[test]
    fn test_binary_leaf_skipped_siblings_visited() {
        let mut fields = FieldMap::new();
        fields.insert("file".into(), FieldValue::Bytes(vec![1, 2]));
        fields.insert("name".into(), FieldValue::from("<script>x</script>"));
        fields.insert("nested".into(), FieldValue::from(json!({"deep": "<script>"})));

        let mut t = FieldTree::prepare("body", &fields, 8);
        assert!(t.is_partial());
        assert!(t.overflow().is_empty());
        let mut seen = Vec::new();
        t.for_each_string(|path, _| seen.push(path.to_string()));
        assert_eq!(seen, vec!["body.name", "body.nested.deep"]);
    }

    #[test]
    fn test_overflow_listed_and_not_visited() {
        let mut t = tree("body", json!({"a": [[["x"]]], "b": {"c": "y"}}));
        assert!(!t.is_partial());

        let mut t2 = FieldTree::prepare(
            "body",
            &bulwark_core::field_map_from_json(json!({"a": [[["x"]]], "b": {"c": "y"}})),
            2,
        );
        assert!(t2.is_partial());
        assert_eq!(t2.overflow(), ["body.a[0][0]".to_string()]);

        let mut seen = Vec::new();
        t2.for_each_string(|path, _| seen.push(path.to_string()));
        assert_eq!(seen, vec!["body.b.c"]);

        t2.prune_overflow();
        assert_eq!(t2.fields()["a"], FieldValue::from(json!([[null]])));
        assert!(t2.overflow().is_empty());

        let mut all = Vec::new();
        t.for_each_string(|path, _| all.push(path.to_string()));
        assert_eq!(all, vec!["body.a[0][0][0]", "body.b.c"]);
    }

    #[test]
    fn test_depth_limit_counts_each_subtree() {
        let config = XssConfig::default();
        let mut scanner = Scanner::new(&config);
        let mut body = FieldTree::prepare(
            "body",
            &bulwark_core::field_map_from_json(json!({"a": [[1]], "b": [[2]], "c": [3]})),
            1,
        );

        scanner.enforce_depth_limit(&mut body);
        let result = scanner.finish();
        assert!(result.detected);
        assert_eq!(result.vectors, vec![LIMIT_DEPTH]);
        assert_eq!(result.count, 2);
        // Block mode keeps the copy intact
        assert_eq!(body.overflow().len(), 2);
    }

    #[test]
    fn test_settle_strips_rebuilt_matches() {
        let config = XssConfig::default().with_mode(Mode::Sanitize);
        let mut scanner = Scanner::new(&config);
        let html = patterns(Category::Html);
        let mut body = tree("body", json!({"c": "<scr<script></script>ipt>alert(1)</scr<script></script>ipt>"}));

        scanner.scan_category(Category::Html, html, &mut [&mut body]);
        assert_eq!(
            body.fields().get("c").and_then(FieldValue::as_str),
            Some("<script>alert(1)</script>")
        );

        scanner.settle(&mut body, &[html]);
        let result = scanner.finish();
        assert_eq!(body.fields().get("c").and_then(FieldValue::as_str), Some(""));
        assert_eq!(result.count, 2);
        assert_eq!(result.sanitized_fields["body.c"].len(), 2);
    }

    #[test]
    fn test_settle_is_inert_without_stripping() {
        let config = XssConfig::default();
        let mut scanner = Scanner::new(&config);
        let mut body = tree("body", json!({"c": "<script>x</script>"}));

        scanner.settle(&mut body, &[patterns(Category::Html)]);
        let result = scanner.finish();
        assert!(!result.detected);
        assert_eq!(
            body.fields().get("c").and_then(FieldValue::as_str),
            Some("<script>x</script>")
        );
    }

    #[test]
    fn test_counts_every_occurrence() {
        let config = XssConfig::default();
        let mut scanner = Scanner::new(&config);
        let mut body = tree("body", json!({"a": "eval(1) eval(2)", "b": ["eval(3)"]}));
        let mut query = tree("query", json!({"q": "eval(4)"}));

        assert!(scanner.scan_category(
            Category::Javascript,
            patterns(Category::Javascript),
            &mut [&mut body, &mut query],
        ));
        let result = scanner.finish();
        assert_eq!(result.count, 4);
        assert_eq!(result.vectors, vec!["js-directEval"]);
        assert!(result.has_context(Context::Javascript));
        assert_eq!(result.severity, Severity::High);
        assert!(result.sanitized_fields.is_empty());
    }

    #[test]
    fn test_strip_records_history() {
        let config = XssConfig::default().with_mode(Mode::Sanitize);
        let mut scanner = Scanner::new(&config);
        let mut body = tree("body", json!({"c": "hi <iframe src=x> there"}));

        scanner.scan_category(Category::Html, patterns(Category::Html), &mut [&mut body]);
        scanner.scan_category(Category::Form, patterns(Category::Form), &mut [&mut body]);
        let result = scanner.finish();

        assert_eq!(
            body.fields().get("c").and_then(FieldValue::as_str),
            Some("hi  there")
        );
        let changes = &result.sanitized_fields["body.c"];
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].original, "hi <iframe src=x> there");
        assert_eq!(result.vectors, vec!["html-dangerousTags"]);
    }

    #[test]
    fn test_check_only_never_strips() {
        let config = XssConfig::default().with_mode(Mode::Remove);
        let mut scanner = Scanner::new(&config);
        let mut body = tree("body", json!({"c": "a /* hidden */ b"}));

        scanner.scan_category(Category::Evasion, patterns(Category::Evasion), &mut [&mut body]);
        let result = scanner.finish();
        assert_eq!(result.vectors, vec!["evasion-commentedCode"]);
        assert!(result.sanitized_fields.is_empty());
        assert!(result.contexts.is_empty());
        assert_eq!(
            body.fields().get("c").and_then(FieldValue::as_str),
            Some("a /* hidden */ b")
        );
    }

    #[test]
    fn test_sensitive_strips_all_tags() {
        let config = XssConfig::default().with_mode(Mode::Sanitize);
        let mut scanner = Scanner::new(&config);
        let mut body = tree("body", json!({"bio": "<b>hi</b>", "nested": {"bio": "<i>"}}));
        let mut query = tree("query", json!({"bio": "plain"}));

        assert!(scanner.scan_sensitive(&["bio".into()], &mut [&mut body, &mut query]));
        let result = scanner.finish();
        assert_eq!(result.count, 1);
        assert_eq!(result.vectors, vec!["sensitive-param-bio"]);
        assert!(result.has_context(Context::Sensitive));
        assert_eq!(body.fields().get("bio").and_then(FieldValue::as_str), Some("hi"));
    }

    #[test]
    fn test_field_size_limit() {
        let config = XssConfig::default()
            .with_mode(Mode::Sanitize)
            .with_max_field_bytes(8);
        let mut scanner = Scanner::new(&config);
        let mut body = tree("body", json!({"big": "<script>x</script>", "ok": "short"}));

        scanner.enforce_field_limit(&mut body);
        let result = scanner.finish();
        assert_eq!(result.vectors, vec![LIMIT_FIELD_SIZE]);
        assert_eq!(result.count, 1);
        assert_eq!(body.fields().get("big").and_then(FieldValue::as_str), Some(""));
        assert_eq!(body.fields().get("ok").and_then(FieldValue::as_str), Some("short"));
    }

    #[test]
    fn test_oversized_fields_skipped_in_block_mode() {
        let config = XssConfig::default().with_max_field_bytes(8);
        let mut scanner = Scanner::new(&config);
        let mut body = tree("body", json!({"big": "<script>x</script>"}));

        scanner.enforce_field_limit(&mut body);
        scanner.scan_category(Category::Html, patterns(Category::Html), &mut [&mut body]);
        let result = scanner.finish();
        assert_eq!(result.vectors, vec![LIMIT_FIELD_SIZE]);
    }

    #[test]
    fn test_exhausted_budget_recorded_once() {
        let config = XssConfig::default().with_scan_budget(Some(Duration::ZERO));
        let mut scanner = Scanner::new(&config);
        let mut body = tree("body", json!({"a": "<script>x</script>", "b": "eval(1)"}));

        scanner.scan_category(Category::Html, patterns(Category::Html), &mut [&mut body]);
        scanner.scan_category(Category::Javascript, patterns(Category::Javascript), &mut [&mut body]);
        let result = scanner.finish();
        assert!(result.detected);
        assert_eq!(result.vectors, vec![LIMIT_SCAN_BUDGET]);
        assert_eq!(result.count, 1);
    }
}
