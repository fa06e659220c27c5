//! The XSS firewall module.

use crate::catalog::{Catalog, Category, Pattern, compile_custom};
use crate::config::{Mode, XssConfig};
use crate::error::XssResult;
use crate::normalizer::Normalizer;
use crate::policy;
use crate::reporter::{DetectionEvent, DetectionSink, TracingSink};
use crate::result::{DetectionResult, XssReport};
use crate::scanner::{FieldTree, Scanner};
use crate::whitelist::Whitelist;
use async_trait::async_trait;
use bulwark_core::{Action, FirewallModule, RequestContext};
use std::sync::Arc;
use tracing::debug;

/// Action plus the detection details behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct Inspection {
    pub action: Action,
    pub result: DetectionResult,
}

/// Detects and neutralizes XSS payloads in request bodies and queries.
///
/// Configuration, the catalog and the whitelist are read-only after
/// construction, so one module can serve concurrent requests.
pub struct XssModule {
    config: Arc<XssConfig>,
    catalog: &'static Catalog,
    custom: Vec<Pattern>,
    whitelist: Whitelist,
    normalizer: Normalizer,
    sink: Arc<dyn DetectionSink>,
}

impl XssModule {
    pub const NAME: &'static str = "xss";

    /// Validate `config` and compile its custom patterns.
    pub fn new(config: XssConfig) -> XssResult<Self> {
        config.validate()?;
        let custom = compile_custom(&config.custom_payloads)?;

        debug!(
            mode = %config.mode,
            custom_patterns = custom.len(),
            sensitive_params = config.sensitive_params.len(),
            "XSS module configured"
        );

        Ok(Self {
            catalog: Catalog::builtin(),
            custom,
            whitelist: Whitelist::from_config(&config),
            normalizer: Normalizer::new(config.max_decode_passes),
            sink: Arc::new(TracingSink),
            config: Arc::new(config),
        })
    }

    /// Report detections to `sink` instead of the log.
    pub fn with_sink(mut self, sink: Arc<dyn DetectionSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &XssConfig {
        &self.config
    }

    /// Inspect one request.
    ///
    /// The context's body and query are never modified. In report mode a
    /// detection is attached to the context as an [`XssReport`].
    pub fn inspect(&self, ctx: &mut RequestContext) -> Inspection {
        if self.whitelist.allows(ctx) {
            debug!(path = %ctx.path, "Whitelisted request, XSS inspection skipped");
            return Inspection {
                action: Action::Allow,
                result: DetectionResult::new(),
            };
        }

        let config = &self.config;
        let mut body = FieldTree::prepare("body", &ctx.body, config.max_depth);
        let mut query = FieldTree::prepare("query", &ctx.query, config.max_depth);
        let mut scanner = Scanner::new(config);
        if body.is_partial() || query.is_partial() {
            scanner.mark_partial();
        }

        scanner.enforce_depth_limit(&mut body);
        scanner.enforce_depth_limit(&mut query);
        scanner.enforce_field_limit(&mut body);
        scanner.enforce_field_limit(&mut query);
        scanner.normalize(&mut body, &self.normalizer);
        scanner.normalize(&mut query, &self.normalizer);

        self.run_passes(&mut scanner, &mut body, &mut query);

        let result = scanner.finish();
        let action = policy::decide(config.mode, &result, body.into_fields(), query.into_fields());

        if result.detected {
            self.sink.record(&DetectionEvent {
                module: Self::NAME,
                path: &ctx.path,
                mode: config.mode,
                result: &result,
            });
            if config.mode == Mode::Report {
                ctx.extensions_mut().insert(XssReport(result.clone()));
            }
        }

        debug!(
            path = %ctx.path,
            detected = result.detected,
            count = result.count,
            severity = %result.severity,
            "XSS inspection complete"
        );
        Inspection { action, result }
    }

    fn run_passes(&self, scanner: &mut Scanner, body: &mut FieldTree, query: &mut FieldTree) {
        let config = &self.config;
        let catalog = self.catalog;
        // Stripping sets that ran on both trees, replayed by the settle pass
        let mut stripping: Vec<&[Pattern]> = Vec::new();
        let mut form: Option<&[Pattern]> = None;

        if config.inline_event_handlers {
            let patterns = catalog.compiled_patterns_for(Category::Javascript);
            scanner.scan_category(Category::Javascript, patterns, &mut [&mut *body, &mut *query]);
            stripping.push(patterns);
        }

        if config.dynamic_content {
            let patterns = catalog.compiled_patterns_for(Category::Html);
            scanner.scan_category(Category::Html, patterns, &mut [&mut *body, &mut *query]);
            stripping.push(patterns);
        }

        if config.url_parameters {
            let patterns = catalog.compiled_patterns_for(Category::Url);
            scanner.scan_category(Category::Url, patterns, &mut [&mut *body, &mut *query]);
            stripping.push(patterns);
        }

        if config.form_inputs {
            let patterns = catalog.compiled_patterns_for(Category::Form);
            scanner.scan_category(Category::Form, patterns, &mut [&mut *body]);
            form = Some(patterns);
        }

        if config.user_generated_content {
            for category in [Category::Evasion, Category::Polyglot] {
                let patterns = catalog.compiled_patterns_for(category);
                scanner.scan_category(category, patterns, &mut [&mut *body, &mut *query]);
                if !category.is_check_only() {
                    stripping.push(patterns);
                }
            }
        }

        if !config.sensitive_params.is_empty() {
            scanner.scan_sensitive(&config.sensitive_params, &mut [&mut *body, &mut *query]);
        }

        if config.user_generated_content {
            let patterns = catalog.compiled_patterns_for(Category::Css);
            scanner.scan_category(Category::Css, patterns, &mut [&mut *body, &mut *query]);
            stripping.push(patterns);
        }

        if !self.custom.is_empty() {
            scanner.scan_category(Category::Custom, &self.custom, &mut [&mut *body, &mut *query]);
            stripping.push(&self.custom);
        }

        if scanner.strips() {
            scanner.settle(query, &stripping);
            stripping.extend(form);
            scanner.settle(body, &stripping);
        }
    }
}

impl std::fmt::Debug for XssModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XssModule")
            .field("config", &self.config)
            .field("custom_patterns", &self.custom.len())
            .field("whitelist", &self.whitelist)
            .finish()
    }
}

#[async_trait]
impl FirewallModule for XssModule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn enabled_by_default(&self) -> bool {
        self.config.enabled
    }

    async fn analyze(&self, ctx: &mut RequestContext) -> Action {
        self.inspect(ctx).action
    }
}
