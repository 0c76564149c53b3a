//! Anonymous access to a public repository identified only by its link.

use async_trait::async_trait;
use url::Url;

use crate::error::{Result, SourceError};
use crate::source::MaterializeLimits;

use super::http::ClientSettings;
use super::{GitHubClient, TreeGetter, TreeNode};

/// Unauthenticated GitHub-compatible client bound to a link's host.
///
/// `github.com` links use `api.github.com`; any other host is assumed to
/// serve the Enterprise API under `/api/v3`.
#[derive(Debug, Clone)]
pub struct PublicClient {
    host: String,
    inner: GitHubClient,
}

impl PublicClient {
    pub fn for_link(repo_link: &str, settings: &ClientSettings) -> Result<Self> {
        let link = Url::parse(repo_link.trim()).map_err(|e| {
            SourceError::ProviderInit(format!("invalid repository link '{}': {}", repo_link, e))
        })?;
        let host = link.host_str().ok_or_else(|| {
            SourceError::ProviderInit(format!("repository link has no host: '{}'", repo_link))
        })?;
        if link
            .path_segments()
            .is_some_and(|mut segments| segments.any(|s| s == "-"))
        {
            return Err(SourceError::ProviderInit(format!(
                "GitLab-style links are not supported for public access: '{}'",
                repo_link
            )));
        }
        let api_base = api_base_for(&link, host);
        let inner = GitHubClient::new(&api_base, None, settings)?;
        Ok(Self {
            host: host.to_string(),
            inner,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn api_base(&self) -> &Url {
        self.inner.api_base()
    }
}

fn api_base_for(link: &Url, host: &str) -> String {
    match host {
        "github.com" | "www.github.com" => "https://api.github.com".to_string(),
        _ => {
            let port = link.port().map(|p| format!(":{}", p)).unwrap_or_default();
            format!("{}://{}{}/api/v3", link.scheme(), host, port)
        }
    }
}

#[async_trait]
impl TreeGetter for PublicClient {
    fn materialize_limits(&self) -> MaterializeLimits {
        self.inner.materialize_limits()
    }

    async fn get_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<Vec<u8>> {
        self.inner.get_file_content(owner, repo, path, branch).await
    }

    async fn get_tree(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<Vec<TreeNode>> {
        self.inner.get_tree(owner, repo, path, branch).await
    }
}
