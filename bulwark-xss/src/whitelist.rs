//! Pre-scan bypass keyed on origin/referer hostname or request path.

use crate::config::XssConfig;
use bulwark_core::RequestContext;
use std::collections::HashSet;
use tracing::warn;
use url::{Host, Url};

const URL_HEADERS: [&str; 2] = ["origin", "referer"];

#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    domains: HashSet<Host>,
    paths: HashSet<String>,
}

impl Whitelist {
    pub fn new(
        domains: impl IntoIterator<Item = impl AsRef<str>>,
        paths: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            domains: domains
                .into_iter()
                .filter_map(|d| parse_domain(d.as_ref()))
                .collect(),
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &XssConfig) -> Self {
        Self::new(&config.whitelisted_domains, config.whitelisted_paths.iter().cloned())
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty() && self.paths.is_empty()
    }

    /// Whether the request bypasses inspection entirely.
    pub fn allows(&self, ctx: &RequestContext) -> bool {
        if self.is_empty() {
            return false;
        }

        URL_HEADERS
            .iter()
            .filter_map(|name| ctx.header(name))
            .any(|value| self.allows_url(value))
            || self.paths.contains(&ctx.path)
    }

    /// Whether the hostname of `raw` is whitelisted. Unparseable URLs are not.
    pub fn allows_url(&self, raw: &str) -> bool {
        if self.domains.is_empty() {
            return false;
        }

        Url::parse(raw)
            .ok()
            .and_then(|url| url.host().map(|host| host.to_owned()))
            .is_some_and(|host| self.domains.contains(&host))
    }
}

/// Parse a configured entry the way URL hosts are parsed, so that Unicode
/// names compare as punycode and bare IPv6 addresses match bracketed hosts.
fn parse_domain(entry: &str) -> Option<Host> {
    let entry = entry.trim();
    let parsed = if entry.contains(':') && !entry.starts_with('[') {
        Host::parse(&format!("[{entry}]"))
    } else {
        Host::parse(entry)
    };

    match parsed {
        Ok(host) => Some(host),
        Err(err) => {
            warn!(entry, error = %err, "Ignoring unparseable whitelisted domain");
            None
        }
    }
}
