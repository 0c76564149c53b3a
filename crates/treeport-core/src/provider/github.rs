//! GitHub REST v3 adapter.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Result, SourceError};
use crate::source::MaterializeLimits;

use super::http::{
    build_http_client, check_status, join_segments, normalize_repo_path, parse_base_url,
    path_segments, ClientSettings,
};
use super::{TreeGetter, TreeNode};

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// Client for the GitHub REST API.
///
/// An empty token means anonymous access (60 requests/hour on github.com).
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api: Url,
    token: Option<String>,
    limits: MaterializeLimits,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api", &self.api.as_str())
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct GitTreeResponse {
    #[serde(default)]
    tree: Vec<GitTreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct GitTreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    sha: String,
    #[serde(default)]
    mode: String,
}

const SYMLINK_MODE: &str = "120000";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Listing(Vec<ContentEntry>),
    Item(ContentEntry),
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    sha: String,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
}

impl GitHubClient {
    /// Create a client against `api_base` (e.g. `https://api.github.com`).
    pub fn new(api_base: &str, token: Option<String>, settings: &ClientSettings) -> Result<Self> {
        let api = parse_base_url(api_base)?;
        let http = build_http_client(settings, settings.proxy.as_ref())?;
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

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn request(&self, url: Url) -> reqwest::RequestBuilder {
        let builder = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn repo_url<'a>(
        &self,
        owner: &'a str,
        repo: &'a str,
        rest: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url> {
        join_segments(&self.api, ["repos", owner, repo].into_iter().chain(rest))
    }

    async fn contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<ContentsResponse> {
        let mut url = self.repo_url(owner, repo, ["contents"].into_iter().chain(path_segments(path)))?;
        url.query_pairs_mut().append_pair("ref", branch);
        debug!(owner, repo, path, branch, "github contents request");

        let response = self.request(url).send().await?;
        let what = format!("{}/{}:{}@{}", owner, repo, path, branch);
        let response = check_status(response, &what).await?;
        response
            .json::<ContentsResponse>()
            .await
            .map_err(|e| SourceError::Decode(format!("contents of {}: {}", what, e)))
    }

    /// Breadth-first walk of the contents API, one directory per request.
    async fn walk_contents(
        &self,
        owner: &str,
        repo: &str,
        root: &str,
        branch: &str,
    ) -> Result<Vec<TreeNode>> {
        let mut nodes = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([root.to_string()]);

        while let Some(dir) = queue.pop_front() {
            if !visited.insert(dir.clone()) {
                continue;
            }
            let entries = match self.contents(owner, repo, &dir, branch).await? {
                ContentsResponse::Listing(entries) => entries,
                ContentsResponse::Item(entry) => vec![entry],
            };
            for entry in entries {
                match entry.kind.as_str() {
                    "dir" => {
                        queue.push_back(entry.path.clone());
                        nodes.push(TreeNode::dir(entry.path, entry.sha));
                    }
                    "file" => nodes.push(TreeNode::file(entry.path, entry.sha)),
                    // symlinks and submodules have no fetchable content
                    _ => continue,
                }
                if nodes.len() > self.limits.max_nodes {
                    return Err(SourceError::TooLarge(format!(
                        "{}/{} has more than {} nodes below '{}'",
                        owner, repo, self.limits.max_nodes, root
                    )));
                }
            }
        }
        Ok(nodes)
    }

    async fn download_raw(&self, raw_url: &str, what: &str) -> Result<Vec<u8>> {
        let url = Url::parse(raw_url)
            .map_err(|e| SourceError::Decode(format!("bad download_url for {}: {}", what, e)))?;
        let response = self.request(url).send().await?;
        let response = check_status(response, what).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl TreeGetter for GitHubClient {
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
        let what = format!("{}/{}:{}@{}", owner, repo, path, branch);
        let entry = match self.contents(owner, repo, path, branch).await? {
            ContentsResponse::Item(entry) if entry.kind == "file" => entry,
            _ => return Err(SourceError::NotFound(format!("{} is not a file", what))),
        };

        match (entry.encoding.as_deref(), entry.content) {
            (Some("base64"), Some(content)) => {
                let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
                base64::engine::general_purpose::STANDARD
                    .decode(compact.as_bytes())
                    .map_err(|e| SourceError::Decode(format!("{}: {}", what, e)))
            }
            // Blobs above the inline limit come back without content.
            _ => match entry.download_url {
                Some(raw_url) => self.download_raw(&raw_url, &what).await,
                None => Err(SourceError::Decode(format!(
                    "{} has neither inline content nor a download_url",
                    what
                ))),
            },
        }
    }

    async fn get_tree(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<Vec<TreeNode>> {
        let root = normalize_repo_path(path);
        let mut url = self.repo_url(
            owner,
            repo,
            ["git", "trees"].into_iter().chain(path_segments(branch)),
        )?;
        url.query_pairs_mut().append_pair("recursive", "1");
        debug!(owner, repo, branch, "github recursive tree request");

        let what = format!("{}/{}@{}", owner, repo, branch);
        let response = self.request(url).send().await?;
        let response = check_status(response, &what).await?;
        let listing: GitTreeResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Decode(format!("tree of {}: {}", what, e)))?;

        if listing.truncated {
            warn!(
                owner,
                repo,
                branch,
                path = root.as_str(),
                "recursive tree truncated, walking directories"
            );
            return self.walk_contents(owner, repo, &root, branch).await;
        }

        let prefix = format!("{}/", root);
        let nodes: Vec<TreeNode> = listing
            .tree
            .into_iter()
            .filter(|e| root.is_empty() || e.path == root || e.path.starts_with(&prefix))
            .filter_map(|e| match e.kind.as_str() {
                "tree" if e.path == root => None,
                "tree" => Some(TreeNode::dir(e.path, e.sha)),
                "blob" if e.mode == SYMLINK_MODE => None,
                "blob" => Some(TreeNode::file(e.path, e.sha)),
                _ => None,
            })
            .collect();

        if nodes.is_empty() && !root.is_empty() {
            return Err(SourceError::NotFound(format!(
                "path '{}' in {}",
                root, what
            )));
        }
        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, token: Option<&str>) -> GitHubClient {
        GitHubClient::new(
            &server.uri(),
            token.map(str::to_string),
            &ClientSettings::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn get_tree_filters_recursive_listing_to_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/charts/git/trees/main"))
            .and(query_param("recursive", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": "root",
                "truncated": false,
                "tree": [
                    {"path": "README.md", "type": "blob", "sha": "r1"},
                    {"path": "svc", "type": "tree", "sha": "t0"},
                    {"path": "svc/svc-export", "type": "tree", "sha": "t1"},
                    {"path": "svc/svc-export/Chart.yaml", "type": "blob", "sha": "b1"},
                    {"path": "svc-other/values.yaml", "type": "blob", "sha": "x1"},
                    {"path": "svc/vendored", "type": "commit", "sha": "c1"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let nodes = client(&server, None)
            .get_tree("acme", "charts", "svc", "main")
            .await
            .unwrap();
        assert_eq!(
            nodes,
            vec![
                TreeNode::dir("svc/svc-export", "t1"),
                TreeNode::file("svc/svc-export/Chart.yaml", "b1"),
            ]
        );
    }

    #[tokio::test]
    async fn get_tree_missing_path_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/charts/git/trees/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "truncated": false,
                "tree": [{"path": "README.md", "type": "blob", "sha": "r1"}]
            })))
            .mount(&server)
            .await;

        let err = client(&server, None)
            .get_tree("acme", "charts", "missing", "main")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn truncated_tree_falls_back_to_contents_walk() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/charts/git/trees/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "truncated": true,
                "tree": []
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/charts/contents/svc"))
            .and(query_param("ref", "main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"path": "svc/Chart.yaml", "type": "file", "sha": "b1"},
                {"path": "svc/templates", "type": "dir", "sha": "t1"}
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/charts/contents/svc/templates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"path": "svc/templates/deploy.yaml", "type": "file", "sha": "b2"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let nodes = client(&server, None)
            .get_tree("acme", "charts", "svc", "main")
            .await
            .unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(nodes.contains(&TreeNode::file("svc/templates/deploy.yaml", "b2")));
    }

    #[tokio::test]
    async fn symlinks_are_left_out_of_listings() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/charts/git/trees/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "truncated": false,
                "tree": [
                    {"path": "svc/Chart.yaml", "type": "blob", "mode": "100644", "sha": "b1"},
                    {"path": "svc/current", "type": "blob", "mode": "120000", "sha": "l1"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let nodes = client(&server, None)
            .get_tree("acme", "charts", "svc", "main")
            .await
            .unwrap();
        assert_eq!(nodes, vec![TreeNode::file("svc/Chart.yaml", "b1")]);
    }

    #[tokio::test]
    async fn contents_walk_skips_symlinks() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/charts/git/trees/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "truncated": true,
                "tree": []
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/charts/contents/svc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"path": "svc/Chart.yaml", "type": "file", "sha": "b1"},
                {"path": "svc/current", "type": "symlink", "sha": "l1"},
                {"path": "svc/vendored", "type": "submodule", "sha": "c1"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let nodes = client(&server, None)
            .get_tree("acme", "charts", "svc", "main")
            .await
            .unwrap();
        assert_eq!(nodes, vec![TreeNode::file("svc/Chart.yaml", "b1")]);
    }

    #[tokio::test]
    async fn get_file_content_decodes_base64_and_sends_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/charts/contents/svc/Chart.yaml"))
            .and(query_param("ref", "main"))
            .and(header("authorization", "Bearer ghp_secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "file",
                "path": "svc/Chart.yaml",
                "sha": "b1",
                "encoding": "base64",
                "content": "bmFtZTog\nc3ZjCg==\n"
            })))
            .mount(&server)
            .await;

        let bytes = client(&server, Some("ghp_secret"))
            .get_file_content("acme", "charts", "svc/Chart.yaml", "main")
            .await
            .unwrap();
        assert_eq!(bytes, b"name: svc\n");
    }

    #[tokio::test]
    async fn large_file_uses_download_url() {
        let server = MockServer::start().await;
        let raw_url = format!("{}/raw/acme/charts/main/big.bin", server.uri());
        Mock::given(method("GET"))
            .and(path("/repos/acme/charts/contents/big.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "file",
                "path": "big.bin",
                "sha": "b9",
                "encoding": "none",
                "content": "",
                "download_url": raw_url
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/raw/acme/charts/main/big.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 32]))
            .mount(&server)
            .await;

        let bytes = client(&server, None)
            .get_file_content("acme", "charts", "big.bin", "main")
            .await
            .unwrap();
        assert_eq!(bytes, vec![7u8; 32]);
    }

    #[tokio::test]
    async fn directory_path_is_not_a_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/charts/contents/svc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let err = client(&server, None)
            .get_file_content("acme", "charts", "svc", "main")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn status_codes_map_to_error_kinds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/private/contents/a.txt"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/busy/contents/a.txt"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("x-ratelimit-remaining", "0")
                    .insert_header("x-ratelimit-reset", "1700000000"),
            )
            .mount(&server)
            .await;

        let gh = client(&server, Some("bad"));
        let auth = gh
            .get_file_content("acme", "private", "a.txt", "main")
            .await
            .unwrap_err();
        assert_eq!(auth.kind(), ErrorKind::Auth);

        let throttled = gh
            .get_file_content("acme", "busy", "a.txt", "main")
            .await
            .unwrap_err();
        assert!(throttled.is_retryable());

        let missing = gh
            .get_file_content("acme", "gone", "a.txt", "main")
            .await
            .unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn empty_token_is_anonymous() {
        let gh = GitHubClient::new(
            "https://api.github.com",
            Some(String::new()),
            &ClientSettings::default(),
        )
        .unwrap();
        assert!(!gh.is_authenticated());
    }
}
