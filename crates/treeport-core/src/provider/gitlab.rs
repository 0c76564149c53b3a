//! GitLab REST v4 adapter.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{Result, SourceError};
use crate::source::MaterializeLimits;

use super::http::{
    build_http_client, check_status, header_str, join_segments, normalize_repo_path,
    parse_base_url, ClientSettings,
};
use super::{TreeGetter, TreeNode};

const PER_PAGE: &str = "100";

/// Client for a GitLab instance.
#[derive(Clone)]
pub struct GitLabClient {
    http: reqwest::Client,
    /// `<base address>/api/v4`
    api: Url,
    token: Option<String>,
    limits: MaterializeLimits,
}

impl std::fmt::Debug for GitLabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabClient")
            .field("api", &self.api.as_str())
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    path: String,
}

impl GitLabClient {
    /// Create a client for the instance at `base_address`.
    ///
    /// Fails with [`SourceError::ProviderInit`] when the address is not an
    /// absolute http(s) URL.
    pub fn new(base_address: &str, token: Option<String>, settings: &ClientSettings) -> Result<Self> {
        let base = parse_base_url(base_address)?;
        let api = join_segments(&base, ["api", "v4"])?;
        // GitLab instances are reached directly, not through the egress proxy.
        let http = build_http_client(settings, None)?;
        Ok(Self {
            http,
            api,
            token: token.filter(|t| !t.is_empty()),
            limits: settings.limits,
        })
    }

    pub fn api_base(&self) -> &Url {
        &self.api
    }

    fn request(&self, url: Url) -> reqwest::RequestBuilder {
        let builder = self.http.get(url);
        match &self.token {
            Some(token) => builder.header("PRIVATE-TOKEN", token),
            None => builder,
        }
    }

    fn project_url<'a>(
        &self,
        owner: &str,
        repo: &str,
        rest: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url> {
        let project = format!("{}/{}", owner, repo);
        let mut url = join_segments(&self.api, ["projects", project.as_str()])?;
        url = join_segments(&url, rest)?;
        Ok(url)
    }
}

#[async_trait]
impl TreeGetter for GitLabClient {
    fn materialize_limits(&self) -> MaterializeLimits {
        self.limits
    }

    async fn get_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<Vec<u8>> {
        let file_path = normalize_repo_path(path);
        let mut url = self.project_url(
            owner,
            repo,
            ["repository", "files", file_path.as_str(), "raw"],
        )?;
        url.query_pairs_mut().append_pair("ref", branch);
        debug!(owner, repo, path, branch, "gitlab raw file request");

        let what = format!("{}/{}:{}@{}", owner, repo, file_path, branch);
        let response = self.request(url).send().await?;
        let response = check_status(response, &what).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn get_tree(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<Vec<TreeNode>> {
        let root = normalize_repo_path(path);
        let what = format!("{}/{}:{}@{}", owner, repo, root, branch);
        let mut nodes = Vec::new();
        let mut page = String::from("1");

        loop {
            let mut url = self.project_url(owner, repo, ["repository", "tree"])?;
            {
                let mut query = url.query_pairs_mut();
                if !root.is_empty() {
                    query.append_pair("path", &root);
                }
                query
                    .append_pair("ref", branch)
                    .append_pair("recursive", "true")
                    .append_pair("per_page", PER_PAGE)
                    .append_pair("page", &page);
            }
            debug!(owner, repo, branch, path = root.as_str(), page = page.as_str(), "gitlab tree page");

            let response = self.request(url).send().await?;
            let response = check_status(response, &what).await?;
            let next_page = header_str(response.headers(), "x-next-page")
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string);
            let entries: Vec<TreeEntry> = response
                .json()
                .await
                .map_err(|e| SourceError::Decode(format!("tree of {}: {}", what, e)))?;

            for entry in entries {
                match entry.kind.as_str() {
                    "tree" => nodes.push(TreeNode::dir(entry.path, entry.id)),
                    "blob" => nodes.push(TreeNode::file(entry.path, entry.id)),
                    // submodule pointers
                    _ => continue,
                }
            }
            if nodes.len() > self.limits.max_nodes {
                return Err(SourceError::TooLarge(format!(
                    "{} has more than {} nodes",
                    what, self.limits.max_nodes
                )));
            }

            match next_page {
                Some(next) if next != page => page = next,
                _ => break,
            }
        }

        if nodes.is_empty() && !root.is_empty() {
            return Err(SourceError::NotFound(what));
        }
        Ok(nodes)
    }
}
