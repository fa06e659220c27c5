// Bulwark - a request inspection firewall
//
// Hosts extract query, body, headers and path into a RequestContext, run the
// Firewall, and act on the resulting Verdict.

// Re-export core functionality
pub use bulwark_core::*;

// Re-export optional crates
#[cfg(feature = "xss")]
pub use bulwark_xss;

pub mod config;

pub use config::{ConfigError, ConfigResult, FirewallConfig, ModulesConfig};

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Action, FieldMap, FieldValue, Firewall, FirewallConfig, FirewallError, FirewallModule,
        RequestContext, Verdict, resolve,
    };

    #[cfg(feature = "xss")]
    pub use bulwark_xss::{DetectionResult, Mode, Severity, XssConfig, XssModule, XssReport};
}
