//! Code host directory implementations.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::config::parse_config_str;
use crate::error::{Result, SourceError};

use super::CodeHost;

/// Resolves a code host id to its stored connection metadata.
#[async_trait]
pub trait CodeHostDirectory: Send + Sync {
    /// Fails with [`SourceError::NotFound`] when the id is unknown.
    async fn lookup(&self, id: i64) -> Result<CodeHost>;
}

/// In-memory directory.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    hosts: HashMap<i64, CodeHost>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_hosts(hosts: impl IntoIterator<Item = CodeHost>) -> Self {
        Self {
            hosts: hosts.into_iter().map(|h| (h.id, h)).collect(),
        }
    }

    pub fn with_host(mut self, host: CodeHost) -> Self {
        self.hosts.insert(host.id, host);
        self
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

#[async_trait]
impl CodeHostDirectory for StaticDirectory {
    async fn lookup(&self, id: i64) -> Result<CodeHost> {
        self.hosts
            .get(&id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("code host {}", id)))
    }
}

/// Directory backed by the `[[codehost]]` tables of a treeport.toml file.
///
/// The file is re-read on every lookup so credential rotations apply
/// without a restart.
#[derive(Debug, Clone)]
pub struct FileDirectory {
    path: PathBuf,
}

impl FileDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl CodeHostDirectory for FileDirectory {
    async fn lookup(&self, id: i64) -> Result<CodeHost> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            SourceError::Directory(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        let config = parse_config_str(&content).map_err(|e| {
            SourceError::Directory(format!("failed to parse {}: {:#}", self.path.display(), e))
        })?;
        config
            .codehost
            .into_iter()
            .find(|h| h.id == id)
            .ok_or_else(|| SourceError::NotFound(format!("code host {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn gitlab_host(id: i64) -> CodeHost {
        CodeHost {
            id,
            r#type: "gitlab".into(),
            address: "https://gitlab.example.com".into(),
            access_token: "glpat-123".into(),
        }
    }

    #[tokio::test]
    async fn static_lookup_finds_registered_host() {
        let dir = StaticDirectory::new().with_host(gitlab_host(7));
        let host = dir.lookup(7).await.unwrap();
        assert_eq!(host.r#type, "gitlab");
        assert_eq!(dir.len(), 1);
    }

    #[tokio::test]
    async fn static_lookup_unknown_id_is_not_found() {
        let dir = StaticDirectory::from_hosts([gitlab_host(7)]);
        let err = dir.lookup(8).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn file_directory_reads_codehost_tables() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[[codehost]]
id = 3
type = "github"
access_token = "ghp_abc"
"#
        )
        .unwrap();

        let dir = FileDirectory::new(file.path());
        let host = dir.lookup(3).await.unwrap();
        assert_eq!(host.r#type, "github");
        assert_eq!(host.access_token, "ghp_abc");
        assert_eq!(dir.lookup(4).await.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn file_directory_missing_file_is_directory_error() {
        let dir = FileDirectory::new("/nonexistent/treeport.toml");
        let err = dir.lookup(1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Directory);
    }
}
