//! Config path resolution helpers.

use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "treeport.toml";

/// Default location: `<config dir>/treeport/treeport.toml`.
pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(config_path_in(&dir))
}

pub fn config_path_in(config_dir: &Path) -> PathBuf {
    config_dir.join("treeport").join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_namespaced() {
        let path = config_path_in(Path::new("/home/u/.config"));
        assert_eq!(path, PathBuf::from("/home/u/.config/treeport/treeport.toml"));
    }
}
