// Inspection module contract

use crate::action::Action;
use crate::context::RequestContext;
use async_trait::async_trait;

/// A detection module run by the [`Firewall`](crate::Firewall) once per request.
///
/// Implementations must not fail: every request yields exactly one action.
#[async_trait]
pub trait FirewallModule: Send + Sync {
    /// Unique name used to toggle the module.
    fn name(&self) -> &str;

    /// Whether the module starts enabled when registered.
    fn enabled_by_default(&self) -> bool {
        true
    }

    /// Analyze the request and decide what should happen to it.
    async fn analyze(&self, ctx: &mut RequestContext) -> Action;
}
