//! # Bulwark Core
//!
//! Framework-agnostic plumbing for request inspection:
//!
//! - [`RequestContext`] - the query, body, headers and path of one request
//! - [`FieldValue`] / [`FieldMap`] - JSON-like field trees with a checked clone
//! - [`FirewallModule`] - the contract every detection module implements
//! - [`Firewall`] - runs enabled modules in order and collects their [`Action`]s
//! - [`resolve`] / [`Verdict`] - reconcile actions for the host
//!
//! ## Quick Start
//!
//! ```rust
//! use bulwark_core::{Action, Firewall, FirewallModule, RequestContext, Verdict};
//! use async_trait::async_trait;
//!
//! struct DenyAdmin;
//!
//! #[async_trait]
//! impl FirewallModule for DenyAdmin {
//!     fn name(&self) -> &str {
//!         "deny-admin"
//!     }
//!
//!     async fn analyze(&self, ctx: &mut RequestContext) -> Action {
//!         if ctx.path.starts_with("/admin") {
//!             Action::block("admin area")
//!         } else {
//!             Action::Allow
//!         }
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let firewall = Firewall::new().with_module(DenyAdmin).unwrap();
//! let mut ctx = RequestContext::new("GET", "/admin/users");
//! assert_eq!(firewall.inspect(&mut ctx).await.status_code(), Some(403));
//! # });
//! ```

pub mod action;
pub mod context;
pub mod error;
pub mod extensions;
pub mod firewall;
pub mod logging;
pub mod module;
pub mod value;

pub use action::{Action, Verdict, resolve};
pub use context::RequestContext;
pub use error::{FirewallError, FirewallResult};
pub use extensions::Extensions;
pub use firewall::Firewall;
pub use module::FirewallModule;
pub use value::{FieldMap, FieldValue, checked_clone_map, field_map_from_json};
