//! Provider clients: one capability contract over heterogeneous code host APIs.
//!
//! - [`GitHubClient`] - GitHub REST v3 (github.com or Enterprise)
//! - [`GitLabClient`] - GitLab REST v4
//! - [`PublicClient`] - anonymous GitHub-compatible access derived from a repo link
//!
//! [`ProviderClient`] is the closed set the selector hands out.

mod github;
mod gitlab;
pub(crate) mod http;
mod public;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::codehost::ProviderKind;
use crate::error::Result;
use crate::source::{MaterializeLimits, TreeMaterializer};
use crate::vfs::MemoryFs;

pub use github::GitHubClient;
pub use gitlab::GitLabClient;
pub use http::ClientSettings;
pub use public::PublicClient;

/// One entry of a provider tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeNode {
    /// Path from the repository root
    pub path: String,
    pub is_dir: bool,
    /// Provider object id (blob/tree sha)
    pub sha: String,
}

impl TreeNode {
    pub fn file(path: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
            sha: sha.into(),
        }
    }

    pub fn dir(path: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
            sha: sha.into(),
        }
    }

    /// Last path segment.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Capability contract every provider implements.
#[async_trait]
pub trait TreeGetter: Send + Sync {
    /// Raw bytes of exactly one file at `branch`.
    async fn get_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<Vec<u8>>;

    /// Every node below `path` at `branch`, recursively.
    async fn get_tree(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<Vec<TreeNode>>;

    /// Bounds applied by [`TreeGetter::get_tree_contents`].
    fn materialize_limits(&self) -> MaterializeLimits {
        MaterializeLimits::default()
    }

    /// Fetch the subtree below `path` with all file contents.
    ///
    /// Dropping the returned future abandons in-flight downloads; use
    /// [`TreeMaterializer::with_cancellation`] for token-driven cancellation.
    async fn get_tree_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<MemoryFs> {
        TreeMaterializer::new(self.materialize_limits())
            .materialize(self, owner, repo, path, branch)
            .await
    }
}

/// The provider variants the selector can produce.
#[derive(Debug, Clone)]
pub enum ProviderClient {
    GitHub(GitHubClient),
    GitLab(GitLabClient),
    Public(PublicClient),
}

impl ProviderClient {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::GitHub(_) => ProviderKind::GitHub,
            Self::GitLab(_) => ProviderKind::GitLab,
            Self::Public(_) => ProviderKind::PublicUnauthenticated,
        }
    }
}

#[async_trait]
impl TreeGetter for ProviderClient {
    fn materialize_limits(&self) -> MaterializeLimits {
        match self {
            Self::GitHub(c) => c.materialize_limits(),
            Self::GitLab(c) => c.materialize_limits(),
            Self::Public(c) => c.materialize_limits(),
        }
    }

    async fn get_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<Vec<u8>> {
        match self {
            Self::GitHub(c) => c.get_file_content(owner, repo, path, branch).await,
            Self::GitLab(c) => c.get_file_content(owner, repo, path, branch).await,
            Self::Public(c) => c.get_file_content(owner, repo, path, branch).await,
        }
    }

    async fn get_tree(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<Vec<TreeNode>> {
        match self {
            Self::GitHub(c) => c.get_tree(owner, repo, path, branch).await,
            Self::GitLab(c) => c.get_tree(owner, repo, path, branch).await,
            Self::Public(c) => c.get_tree(owner, repo, path, branch).await,
        }
    }
}
