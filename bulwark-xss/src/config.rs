//! XSS module configuration

use crate::error::{XssError, XssResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What happens to a request once a payload is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Reject the request
    #[default]
    Block,
    /// Strip matched content and continue
    Sanitize,
    /// Same as `Sanitize`
    Remove,
    /// Allow unchanged and attach the detection to the request context
    Report,
}

impl Mode {
    /// Whether detections strip content from the working copies.
    pub fn strips(&self) -> bool {
        matches!(self, Mode::Sanitize | Mode::Remove)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Block => "block",
            Mode::Sanitize => "sanitize",
            Mode::Remove => "remove",
            Mode::Report => "report",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How repeated sanitization of one field is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SanitizeHistory {
    /// Keep every transformation in order
    #[default]
    Accumulate,
    /// Keep only the most recent transformation
    LastWriteWins,
}

pub const DEFAULT_MAX_DEPTH: usize = 32;
pub const DEFAULT_MAX_FIELD_BYTES: usize = 1024 * 1024;
pub const DEFAULT_MAX_DECODE_PASSES: usize = 16;
pub const DEFAULT_SCAN_BUDGET_MS: u64 = 250;

/// XSS module configuration
///
/// Deserializes from the camelCase JSON shape hosts usually keep in their
/// settings files:
///
/// ```rust
/// use bulwark_xss::{Mode, XssConfig};
///
/// let config = XssConfig::from_json_str(r#"{
///     "blockMode": "sanitize",
///     "sensitiveParams": ["bio"],
///     "whitelistedDomains": ["admin.example.com"]
/// }"#).unwrap();
///
/// assert_eq!(config.mode, Mode::Sanitize);
/// assert!(config.dynamic_content);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct XssConfig {
    /// Initial enabled state of the module
    pub enabled: bool,

    /// Event handler attributes and script API usage
    pub inline_event_handlers: bool,

    /// Script tags, dangerous tags and attributes, SVG/MathML/XMP payloads
    pub dynamic_content: bool,

    /// Dangerous URI schemes
    pub url_parameters: bool,

    /// Embedded form elements in the body
    pub form_inputs: bool,

    /// Evasion encodings, polyglot payloads and CSS vectors
    pub user_generated_content: bool,

    #[serde(alias = "blockMode")]
    pub mode: Mode,

    /// Top-level parameters that must never contain markup
    pub sensitive_params: Vec<String>,

    /// Origin/referer hostnames that bypass inspection
    pub whitelisted_domains: Vec<String>,

    /// Request paths that bypass inspection
    pub whitelisted_paths: Vec<String>,

    /// Extra case-insensitive regular expressions
    pub custom_payloads: Vec<String>,

    pub sanitize_history: SanitizeHistory,

    /// Container nesting scanned. Deeper containers are reported as `limit-depth`
    pub max_depth: usize,

    /// String fields longer than this are never scanned
    pub max_field_bytes: usize,

    pub max_decode_passes: usize,

    /// Wall-clock budget per request, `None` disables it
    pub scan_budget_ms: Option<u64>,
}

impl XssConfig {
    pub fn new() -> Self {
        Self {
            enabled: true,
            inline_event_handlers: true,
            dynamic_content: true,
            url_parameters: true,
            form_inputs: true,
            user_generated_content: true,
            mode: Mode::Block,
            sensitive_params: Vec::new(),
            whitelisted_domains: Vec::new(),
            whitelisted_paths: Vec::new(),
            custom_payloads: Vec::new(),
            sanitize_history: SanitizeHistory::Accumulate,
            max_depth: DEFAULT_MAX_DEPTH,
            max_field_bytes: DEFAULT_MAX_FIELD_BYTES,
            max_decode_passes: DEFAULT_MAX_DECODE_PASSES,
            scan_budget_ms: Some(DEFAULT_SCAN_BUDGET_MS),
        }
    }

    /// A configuration with every category toggle switched off.
    pub fn none() -> Self {
        Self {
            inline_event_handlers: false,
            dynamic_content: false,
            url_parameters: false,
            form_inputs: false,
            user_generated_content: false,
            ..Self::new()
        }
    }

    pub fn from_json_str(json: &str) -> XssResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> XssResult<()> {
        if self.max_depth == 0 {
            return Err(XssError::config("maxDepth must be at least 1"));
        }
        if self.max_field_bytes == 0 {
            return Err(XssError::config("maxFieldBytes must be at least 1"));
        }
        if self.max_decode_passes == 0 {
            return Err(XssError::config("maxDecodePasses must be at least 1"));
        }
        Ok(())
    }

    pub fn scan_budget(&self) -> Option<Duration> {
        self.scan_budget_ms.map(Duration::from_millis)
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_inline_event_handlers(mut self, enable: bool) -> Self {
        self.inline_event_handlers = enable;
        self
    }

    pub fn with_dynamic_content(mut self, enable: bool) -> Self {
        self.dynamic_content = enable;
        self
    }

    pub fn with_url_parameters(mut self, enable: bool) -> Self {
        self.url_parameters = enable;
        self
    }

    pub fn with_form_inputs(mut self, enable: bool) -> Self {
        self.form_inputs = enable;
        self
    }

    pub fn with_user_generated_content(mut self, enable: bool) -> Self {
        self.user_generated_content = enable;
        self
    }

    pub fn with_sensitive_params(mut self, params: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.sensitive_params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_whitelisted_domains(
        mut self,
        domains: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.whitelisted_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_whitelisted_paths(mut self, paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.whitelisted_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_custom_payloads(
        mut self,
        patterns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.custom_payloads = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sanitize_history(mut self, history: SanitizeHistory) -> Self {
        self.sanitize_history = history;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_field_bytes(mut self, bytes: usize) -> Self {
        self.max_field_bytes = bytes;
        self
    }

    pub fn with_scan_budget(mut self, budget: Option<Duration>) -> Self {
        self.scan_budget_ms = budget.map(|d| d.as_millis() as u64);
        self
    }
}

impl Default for XssConfig {
    fn default() -> Self {
        Self::new()
    }
}
