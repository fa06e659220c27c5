//! Integration tests for the module pipeline.

use async_trait::async_trait;
use bulwark_core::*;
use serde_json::json;

/// Uppercases every top-level body string.
struct Shout;

#[async_trait]
impl FirewallModule for Shout {
    fn name(&self) -> &str {
        "shout"
    }

    async fn analyze(&self, ctx: &mut RequestContext) -> Action {
        let body: FieldMap = ctx
            .body
            .iter()
            .map(|(k, v)| {
                let v = match v.as_str() {
                    Some(s) => FieldValue::String(s.to_uppercase()),
                    None => v.clone(),
                };
                (k.clone(), v)
            })
            .collect();
        Action::Sanitize {
            body,
            query: ctx.query.clone(),
            reason: "shouted".to_string(),
        }
    }
}

/// Blocks when a marker header is present and tags the request otherwise.
struct HeaderGate;

#[derive(Debug, PartialEq)]
struct Seen(&'static str);

#[async_trait]
impl FirewallModule for HeaderGate {
    fn name(&self) -> &str {
        "gate"
    }

    async fn analyze(&self, ctx: &mut RequestContext) -> Action {
        if ctx.header("x-deny").is_some() {
            return Action::block("denied by header");
        }
        ctx.extensions_mut().insert(Seen("gate"));
        Action::Allow
    }
}

fn firewall() -> Firewall {
    Firewall::new()
        .with_module(Shout)
        .unwrap()
        .with_module(HeaderGate)
        .unwrap()
}

#[tokio::test]
async fn test_rewrite_reaches_host() {
    let firewall = firewall();
    let mut ctx = RequestContext::new("POST", "/").with_json_body(json!({"msg": "hi", "n": 1}));

    let verdict = firewall.inspect(&mut ctx).await;
    assert_eq!(verdict.reasons(), ["shouted".to_string()]);
    assert!(verdict.apply_to(&mut ctx));

    assert_eq!(ctx.body.get("msg").and_then(|v| v.as_str()), Some("HI"));
    assert_eq!(ctx.body.get("n"), Some(&FieldValue::Number(1.into())));
    assert_eq!(ctx.extensions().get::<Seen>(), Some(&Seen("gate")));
}

#[tokio::test]
async fn test_block_overrides_sanitize() {
    let firewall = firewall();
    let mut ctx = RequestContext::new("POST", "/")
        .with_body_field("msg", "hi")
        .with_header("X-Deny", "1");

    let actions = firewall.handle(&mut ctx).await;
    assert_eq!(actions.len(), 2);
    assert!(actions[0].is_sanitize());
    assert!(actions[1].is_block());

    let verdict = resolve(actions);
    assert_eq!(verdict.status_code(), Some(403));
    assert_eq!(verdict.reasons(), ["denied by header".to_string()]);
    assert!(!verdict.apply_to(&mut ctx));
    assert_eq!(ctx.body.get("msg").and_then(|v| v.as_str()), Some("hi"));
}

#[tokio::test]
async fn test_disabled_modules_are_skipped() {
    let firewall = firewall();
    assert!(firewall.set_module_enabled("shout", false));
    assert!(!firewall.set_module_enabled("missing", false));

    let mut ctx = RequestContext::new("POST", "/").with_body_field("msg", "hi");
    assert_eq!(firewall.inspect(&mut ctx).await, Verdict::Pass);
}

#[test]
fn test_duplicate_registration() {
    let err = Firewall::new()
        .with_module(Shout)
        .unwrap()
        .with_module(Shout)
        .unwrap_err();
    assert!(matches!(err, FirewallError::DuplicateModule(name) if name == "shout"));
}
