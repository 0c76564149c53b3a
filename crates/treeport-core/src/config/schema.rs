//! Configuration schema for treeport.toml

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::codehost::CodeHost;
use crate::source::MaterializeLimits;

/// Environment variable overriding [`ResolverConfig::proxy_https`].
pub const PROXY_ENV: &str = "TREEPORT_PROXY_HTTPS";

/// Root configuration structure for treeport.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// User-Agent sent with every provider request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Egress proxy for GitHub and public requests
    #[serde(default)]
    pub proxy_https: Option<Url>,

    /// Per-request network timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// GitHub REST API root used for `github` code hosts
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,

    /// Maximum concurrent file downloads while materializing a tree
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    /// Maximum number of tree nodes accepted from one listing
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,

    /// Maximum cumulative bytes downloaded for one tree
    #[serde(default = "default_max_total_bytes")]
    pub max_total_bytes: u64,

    /// Registered code hosts served by the file-backed directory
    #[serde(default)]
    pub codehost: Vec<CodeHost>,
}

fn default_user_agent() -> String {
    concat!("treeport/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_fetch_concurrency() -> usize {
    8
}

fn default_max_nodes() -> usize {
    10_000
}

fn default_max_total_bytes() -> u64 {
    64 * 1024 * 1024
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            proxy_https: None,
            timeout_secs: default_timeout_secs(),
            github_api_url: default_github_api_url(),
            fetch_concurrency: default_fetch_concurrency(),
            max_nodes: default_max_nodes(),
            max_total_bytes: default_max_total_bytes(),
            codehost: Vec::new(),
        }
    }
}

impl ResolverConfig {
    /// Validate configuration values
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.fetch_concurrency == 0 {
            anyhow::bail!("fetch_concurrency must be at least 1");
        }
        if self.max_nodes == 0 {
            anyhow::bail!("max_nodes must be at least 1");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be at least 1");
        }

        let mut seen = HashSet::new();
        for host in &self.codehost {
            if !seen.insert(host.id) {
                anyhow::bail!("Duplicate code host id: {}", host.id);
            }
        }
        Ok(())
    }

    /// Apply environment overrides using the given variable lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(PROXY_ENV).filter(|v| !v.trim().is_empty()) {
            let proxy = Url::parse(raw.trim())
                .map_err(|e| anyhow::anyhow!("Invalid {} value '{}': {}", PROXY_ENV, raw, e))?;
            self.proxy_https = Some(proxy);
        }
        Ok(())
    }

    /// Size and concurrency limits for tree materialization.
    pub fn limits(&self) -> MaterializeLimits {
        MaterializeLimits {
            max_nodes: self.max_nodes,
            max_total_bytes: self.max_total_bytes,
            concurrency: self.fetch_concurrency,
        }
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}
