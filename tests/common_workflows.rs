//! Integration tests for common Bulwark workflows.
//!
//! These tests drive the facade the way a host would: build a firewall from a
//! configuration document, inspect a request, act on the verdict.

use bulwark::prelude::*;
use serde_json::json;

fn comment(ctx: &RequestContext) -> Option<&str> {
    ctx.body.get("comment").and_then(|v| v.as_str())
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_config_document_builds_firewall() {
    let firewall = FirewallConfig::from_json_str(
        r#"{
            "enabled": true,
            "modules": {
                "xss": {
                    "blockMode": "block",
                    "userGeneratedContent": false,
                    "whitelistedPaths": ["/health"]
                }
            }
        }"#,
    )
    .unwrap()
    .build()
    .unwrap();

    assert!(firewall.is_enabled());
    assert_eq!(firewall.module_names(), vec!["xss"]);
    assert_eq!(firewall.is_module_enabled("xss"), Some(true));
}

#[test]
fn test_config_rejects_bad_custom_pattern() {
    let result = FirewallConfig::from_json_str(
        r#"{"modules": {"xss": {"customPayloads": ["[unclosed"]}}}"#,
    )
    .unwrap()
    .build();

    let err = result.unwrap_err();
    assert!(err.to_string().contains("Invalid custom pattern #0"));
}

#[test]
fn test_config_rejects_zero_limits() {
    let result = FirewallConfig::new()
        .with_xss(XssConfig::default().with_max_depth(0))
        .build();
    assert!(matches!(result, Err(bulwark::ConfigError::Xss(_))));
}

// =============================================================================
// Block Workflow
// =============================================================================

#[tokio::test]
async fn test_block_workflow() {
    let firewall = FirewallConfig::new()
        .with_xss(XssConfig::default())
        .build()
        .unwrap();

    let mut ctx = RequestContext::new("GET", "/search")
        .with_query_param("q", "<script>alert(1)</script>");
    let verdict = firewall.inspect(&mut ctx).await;

    assert!(verdict.is_reject());
    assert_eq!(verdict.status_code(), Some(403));
    assert!(verdict.reasons()[0].starts_with("XSS attack detected: "));
    assert!(!verdict.apply_to(&mut ctx));
}

#[tokio::test]
async fn test_clean_request_passes() {
    let firewall = FirewallConfig::new()
        .with_xss(XssConfig::default())
        .build()
        .unwrap();

    let mut ctx = RequestContext::new("POST", "/comments")
        .with_json_body(json!({"comment": "Looks good to me", "rating": 5}))
        .with_query_param("page", "2");
    let verdict = firewall.inspect(&mut ctx).await;

    assert_eq!(verdict, Verdict::Pass);
    assert!(verdict.apply_to(&mut ctx));
    assert_eq!(comment(&ctx), Some("Looks good to me"));
}

// =============================================================================
// Sanitize Workflow
// =============================================================================

#[tokio::test]
async fn test_sanitize_workflow_rewrites_body() {
    let firewall = FirewallConfig::new()
        .with_xss(XssConfig::default().with_mode(Mode::Sanitize))
        .build()
        .unwrap();

    let mut ctx = RequestContext::new("POST", "/comments")
        .with_body_field("comment", "hi<script>alert(1)</script>there")
        .with_body_field("author", "sam");
    let verdict = firewall.inspect(&mut ctx).await;

    assert!(matches!(verdict, Verdict::Rewrite { .. }));
    assert_eq!(verdict.status_code(), None);
    assert!(verdict.reasons()[0].starts_with("XSS sanitized: "));
    assert!(verdict.apply_to(&mut ctx));

    assert_eq!(comment(&ctx), Some("hithere"));
    assert_eq!(ctx.body.get("author").and_then(|v| v.as_str()), Some("sam"));
}

// =============================================================================
// Report Workflow
// =============================================================================

#[tokio::test]
async fn test_report_workflow_attaches_result() {
    let firewall = FirewallConfig::new()
        .with_xss(XssConfig::default().with_mode(Mode::Report))
        .build()
        .unwrap();

    let mut ctx = RequestContext::new("POST", "/comments")
        .with_body_field("comment", "<img src=x onerror=alert(1)>");
    let verdict = firewall.inspect(&mut ctx).await;

    assert_eq!(verdict, Verdict::Pass);
    let report = ctx.extensions().get::<XssReport>().unwrap();
    assert!(report.result().detected);
    assert!(report.result().has_vector("js-eventHandlers"));
    assert_eq!(comment(&ctx), Some("<img src=x onerror=alert(1)>"));
}

// =============================================================================
// Runtime Toggles
// =============================================================================

#[tokio::test]
async fn test_runtime_toggles() {
    let firewall = FirewallConfig::new()
        .with_xss(XssConfig::default())
        .build()
        .unwrap();
    let request = || RequestContext::new("GET", "/").with_query_param("q", "<script>x</script>");

    assert!(firewall.inspect(&mut request()).await.is_reject());

    assert!(firewall.set_module_enabled("xss", false));
    assert_eq!(firewall.inspect(&mut request()).await, Verdict::Pass);

    assert!(firewall.set_module_enabled("xss", true));
    firewall.set_enabled(false);
    assert_eq!(firewall.inspect(&mut request()).await, Verdict::Pass);

    firewall.set_enabled(true);
    assert!(firewall.inspect(&mut request()).await.is_reject());
}

#[tokio::test]
async fn test_globally_disabled_document() {
    let firewall = FirewallConfig::from_json_str(r#"{"enabled": false, "modules": {"xss": {}}}"#)
        .unwrap()
        .build()
        .unwrap();

    let mut ctx = RequestContext::new("GET", "/").with_query_param("q", "<script>x</script>");
    assert_eq!(firewall.inspect(&mut ctx).await, Verdict::Pass);
}

// =============================================================================
// Direct Module Use
// =============================================================================

#[test]
fn test_module_without_firewall() {
    let module = XssModule::new(XssConfig::default()).unwrap();
    let mut ctx = RequestContext::new("GET", "/").with_query_param("next", "eval(atob('YWxlcnQoMSk='))");

    let inspection = module.inspect(&mut ctx);
    assert!(inspection.action.is_block());
    assert!(inspection.result.has_vector("js-directEval"));
    assert_eq!(inspection.result.severity, Severity::High);
}
