//! Top-level firewall configuration document.

use bulwark_core::{Firewall, FirewallError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[cfg(feature = "xss")]
use bulwark_xss::{XssConfig, XssError, XssModule};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Firewall(#[from] FirewallError),

    #[cfg(feature = "xss")]
    #[error(transparent)]
    Xss(#[from] XssError),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Per-module sections. A missing section leaves the module unregistered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModulesConfig {
    #[cfg(feature = "xss")]
    pub xss: Option<XssConfig>,
}

/// Firewall configuration
///
/// ```rust
/// use bulwark::FirewallConfig;
///
/// let firewall = FirewallConfig::from_json_str(r#"{
///     "enabled": true,
///     "modules": { "xss": { "blockMode": "sanitize" } }
/// }"#)
/// .unwrap()
/// .build()
/// .unwrap();
///
/// assert_eq!(firewall.module_names(), vec!["xss"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FirewallConfig {
    pub enabled: bool,
    pub modules: ModulesConfig,
}

impl FirewallConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[cfg(feature = "xss")]
    pub fn with_xss(mut self, config: XssConfig) -> Self {
        self.modules.xss = Some(config);
        self
    }

    /// Create a firewall with every configured module registered.
    pub fn build(self) -> ConfigResult<Firewall> {
        let mut firewall = Firewall::new();

        #[cfg(feature = "xss")]
        if let Some(xss) = self.modules.xss {
            firewall.use_module(XssModule::new(xss)?)?;
        }

        firewall.set_enabled(self.enabled);
        info!(
            enabled = self.enabled,
            modules = ?firewall.module_names(),
            "Firewall configured"
        );
        Ok(firewall)
    }
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            modules: ModulesConfig::default(),
        }
    }
}
