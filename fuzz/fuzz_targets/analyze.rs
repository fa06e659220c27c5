//! Fuzz target for request inspection.
//!
//! Builds a request from arbitrary JSON-ish fields and checks that inspection
//! never panics and that stripping only ever shrinks a field.

#![no_main]

use arbitrary::Arbitrary;
use bulwark_core::RequestContext;
use bulwark_xss::{Mode, XssConfig, XssModule};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzRequest {
    path: String,
    query: Vec<(String, String)>,
    body: Vec<(String, String)>,
    nested: Option<String>,
    referer: Option<String>,
    mode: u8,
}

fuzz_target!(|input: FuzzRequest| {
    let mode = match input.mode % 4 {
        0 => Mode::Block,
        1 => Mode::Sanitize,
        2 => Mode::Remove,
        _ => Mode::Report,
    };
    let config = XssConfig::default()
        .with_mode(mode)
        .with_sensitive_params(["comment"])
        .with_whitelisted_domains(["trusted.example"])
        .with_max_depth(4)
        .with_scan_budget(None);
    let Ok(module) = XssModule::new(config) else {
        return;
    };

    let mut ctx = RequestContext::new("POST", input.path);
    for (name, value) in input.query {
        ctx = ctx.with_query_param(name, value);
    }
    for (name, value) in input.body {
        ctx = ctx.with_body_field(name, value);
    }
    if let Some(nested) = input.nested {
        ctx = ctx.with_json_body(serde_json::json!({"a": {"b": [nested]}}));
    }
    if let Some(referer) = input.referer {
        ctx = ctx.with_header("referer", referer);
    }

    let inspection = module.inspect(&mut ctx);
    for changes in inspection.result.sanitized_fields.values() {
        for change in changes {
            assert!(change.sanitized.len() < change.original.len());
        }
    }
});
