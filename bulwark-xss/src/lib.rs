//! # Bulwark XSS
//!
//! Heuristic cross-site scripting detection for request query and body
//! fields.
//!
//! ## Features
//!
//! - **Pattern catalog** - HTML, JavaScript, URL, CSS, evasion, form and
//!   polyglot detectors compiled once on a linear-time regex engine
//! - **Normalization** - layered percent-encoding and HTML entities are
//!   decoded before matching
//! - **Modes** - block, sanitize/remove (strip and continue) or report
//! - **Whitelist** - bypass by origin/referer hostname or request path
//! - **Bounded work** - per-field size cap and per-request time budget
//!
//! ## Quick Start
//!
//! ```rust
//! use bulwark_core::{Action, RequestContext};
//! use bulwark_xss::{Mode, XssConfig, XssModule};
//!
//! let module = XssModule::new(XssConfig::default().with_mode(Mode::Sanitize)).unwrap();
//!
//! let mut ctx = RequestContext::new("POST", "/comments")
//!     .with_body_field("comment", "nice post<script>alert(1)</script>");
//!
//! let inspection = module.inspect(&mut ctx);
//! assert!(inspection.result.vectors.contains(&"html-scriptTags".to_string()));
//!
//! match inspection.action {
//!     Action::Sanitize { body, .. } => {
//!         assert_eq!(body["comment"].as_str(), Some("nice post"));
//!     }
//!     other => panic!("unexpected action: {other:?}"),
//! }
//! ```
//!
//! ## Report mode
//!
//! ```rust
//! use bulwark_core::RequestContext;
//! use bulwark_xss::{Mode, XssConfig, XssModule, XssReport};
//!
//! let module = XssModule::new(XssConfig::default().with_mode(Mode::Report)).unwrap();
//! let mut ctx = RequestContext::new("GET", "/").with_query_param("q", "<svg onload=alert(1)>");
//!
//! assert!(module.inspect(&mut ctx).action.is_allow());
//! let report = ctx.extensions().get::<XssReport>().unwrap();
//! assert!(report.result().detected);
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod module;
pub mod normalizer;
pub mod policy;
pub mod reporter;
pub mod result;
pub mod scanner;
pub mod severity;
pub mod whitelist;

pub use catalog::{Catalog, Category, Pattern};
pub use config::{Mode, SanitizeHistory, XssConfig};
pub use error::{XssError, XssResult};
pub use module::{Inspection, XssModule};
pub use normalizer::Normalizer;
pub use policy::decide;
pub use reporter::{DetectionEvent, DetectionSink, MemorySink, RecordedDetection, TracingSink};
pub use result::{Context, DetectionResult, FieldChange, Severity, XssReport};
pub use scanner::{LIMIT_DEPTH, LIMIT_FIELD_SIZE, LIMIT_SCAN_BUDGET};
pub use severity::classify;
pub use whitelist::Whitelist;
