//! Resolver configuration
//!
//! Loaded from treeport.toml, with environment overrides applied last.

pub mod parser;
pub mod paths;
pub mod schema;

use std::path::Path;

pub use parser::{parse_config, parse_config_str};
pub use paths::{default_config_path, CONFIG_FILE_NAME};
pub use schema::{ResolverConfig, PROXY_ENV};

/// Load configuration from `explicit` or the default location.
///
/// A missing file at the default location yields the defaults; a missing
/// explicit file is an error.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<ResolverConfig> {
    let mut config = match explicit {
        Some(path) => parse_config(path)?,
        None => {
            let path = default_config_path()?;
            if path.exists() {
                parse_config(&path)?
            } else {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                ResolverConfig::default()
            }
        }
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}
