//! Per-request detection results.

use crate::config::SanitizeHistory;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Coarse payload category used for severity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Context {
    Html,
    Javascript,
    Url,
    Css,
    Sensitive,
}

impl Context {
    pub fn as_str(&self) -> &'static str {
        match self {
            Context::Html => "html",
            Context::Javascript => "javascript",
            Context::Url => "url",
            Context::Css => "css",
            Context::Sensitive => "sensitive",
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One transformation applied to a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub original: String,
    pub sanitized: String,
}

/// Everything one inspection found.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub detected: bool,
    /// Match occurrences across every field and category
    pub count: usize,
    /// Unique vector identifiers in first-seen order
    pub vectors: Vec<String>,
    pub contexts: BTreeSet<Context>,
    pub severity: Severity,
    /// Field path to the transformations applied to it
    pub sanitized_fields: BTreeMap<String, Vec<FieldChange>>,
    /// Set when body or query held values that could not be inspected
    /// (binary leaves, containers past the depth limit)
    pub shallow_scan: bool,
}

impl DetectionResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count `occurrences` matches of `vector`.
    pub fn record_hit(&mut self, vector: &str, occurrences: usize) {
        if occurrences == 0 {
            return;
        }
        self.detected = true;
        self.count += occurrences;
        if !self.has_vector(vector) {
            self.vectors.push(vector.to_string());
        }
    }

    pub fn record_change(
        &mut self,
        path: &str,
        original: String,
        sanitized: String,
        history: SanitizeHistory,
    ) {
        let change = FieldChange {
            original,
            sanitized,
        };
        let entry = self.sanitized_fields.entry(path.to_string()).or_default();
        if history == SanitizeHistory::LastWriteWins {
            entry.clear();
        }
        entry.push(change);
    }

    pub fn add_context(&mut self, context: Context) {
        self.contexts.insert(context);
    }

    pub fn has_vector(&self, vector: &str) -> bool {
        self.vectors.iter().any(|v| v == vector)
    }

    pub fn has_context(&self, context: Context) -> bool {
        self.contexts.contains(&context)
    }

    /// Vectors joined for reasons and log lines.
    pub fn vector_list(&self) -> String {
        self.vectors.join(", ")
    }
}

/// Detection attached to the request context in report mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct XssReport(pub DetectionResult);

impl XssReport {
    pub fn result(&self) -> &DetectionResult {
        &self.0
    }
}
