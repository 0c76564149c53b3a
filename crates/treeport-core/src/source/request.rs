//! Source request and repository link types.

use serde::{Deserialize, Serialize};
use url::Url;

/// What to fetch and where from.
///
/// A non-empty `repo_link` takes precedence over `code_host_id` and selects
/// anonymous public access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRequest {
    #[serde(rename = "codeHostID", default)]
    pub code_host_id: Option<i64>,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub branch: String,
    #[serde(rename = "repoLink", default)]
    pub repo_link: Option<String>,
}

impl SourceRequest {
    /// Request against a registered code host.
    pub fn for_code_host(
        code_host_id: i64,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        Self {
            code_host_id: Some(code_host_id),
            owner: owner.into(),
            repo: repo.into(),
            ..Default::default()
        }
    }

    /// Request against a public repository link.
    ///
    /// Owner, repo, branch and path are taken from the link where present.
    pub fn from_repo_link(link: &str) -> anyhow::Result<Self> {
        let parsed = RepoLink::parse(link)?;
        Ok(Self {
            code_host_id: None,
            owner: parsed.owner,
            repo: parsed.repo,
            path: parsed.path.unwrap_or_default(),
            branch: parsed.branch.unwrap_or_default(),
            repo_link: Some(link.to_string()),
        })
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// The repo link, if one is set and non-blank.
    pub fn public_link(&self) -> Option<&str> {
        self.repo_link
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }
}

/// A parsed public repository link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoLink {
    pub host: String,
    pub owner: String,
    pub repo: String,
    pub branch: Option<String>,
    pub path: Option<String>,
}

impl RepoLink {
    /// Parse a repository link.
    ///
    /// Supports formats:
    /// - `github:org/repo`
    /// - `https://host/org/repo` (optionally ending in `.git`)
    /// - `https://host/org/repo/tree/ref/path`
    /// - `https://host/org/repo/-/tree/ref/path` (GitLab)
    pub fn parse(link: &str) -> anyhow::Result<Self> {
        let raw = link.trim();
        let raw = match raw.strip_prefix("github:") {
            Some(shorthand) => format!("https://github.com/{}", shorthand),
            None => raw.to_string(),
        };

        let url = Url::parse(&raw)
            .map_err(|e| anyhow::anyhow!("Invalid repository link '{}': {}", link, e))?;
        let host = url
            .host_str()
            .ok_or_else(|| anyhow::anyhow!("Repository link has no host: {}", link))?
            .to_string();
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();

        let [owner, repo, rest @ ..] = segments.as_slice() else {
            anyhow::bail!("Repository link must name an owner and a repo: {}", link);
        };
        let repo = repo.strip_suffix(".git").unwrap_or(*repo);

        let (branch, path) = Self::split_tree_path(rest);
        Ok(Self {
            host,
            owner: (*owner).to_string(),
            repo: repo.to_string(),
            branch,
            path,
        })
    }

    /// Split `tree/<ref>/<path...>` (or `-/tree/...`) into ref and path.
    fn split_tree_path(rest: &[&str]) -> (Option<String>, Option<String>) {
        let rest = match rest {
            ["-", tail @ ..] => tail,
            other => other,
        };
        match rest {
            ["tree" | "blob", reference, path @ ..] => {
                let path = (!path.is_empty()).then(|| path.join("/"));
                (Some((*reference).to_string()), path)
            }
            _ => (None, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_github_link() {
        let link = RepoLink::parse("https://github.com/acme/charts").unwrap();
        assert_eq!(link.host, "github.com");
        assert_eq!(link.owner, "acme");
        assert_eq!(link.repo, "charts");
        assert_eq!(link.branch, None);
        assert_eq!(link.path, None);
    }

    #[test]
    fn parse_strips_dot_git() {
        let link = RepoLink::parse("https://github.com/acme/charts.git").unwrap();
        assert_eq!(link.repo, "charts");
    }

    #[test]
    fn parse_tree_link_with_nested_path() {
        let link = RepoLink::parse("https://github.com/acme/charts/tree/v1.0.0/stable/svc").unwrap();
        assert_eq!(link.branch, Some("v1.0.0".to_string()));
        assert_eq!(link.path, Some("stable/svc".to_string()));
    }

    #[test]
    fn parse_gitlab_tree_link() {
        let link =
            RepoLink::parse("https://gitlab.example.com/acme/charts/-/tree/main/svc").unwrap();
        assert_eq!(link.host, "gitlab.example.com");
        assert_eq!(link.branch, Some("main".to_string()));
        assert_eq!(link.path, Some("svc".to_string()));
    }

    #[test]
    fn parse_github_shorthand() {
        let link = RepoLink::parse("github:acme/charts").unwrap();
        assert_eq!(link.host, "github.com");
        assert_eq!(link.owner, "acme");
    }

    #[test]
    fn parse_rejects_link_without_repo() {
        assert!(RepoLink::parse("https://github.com/acme").is_err());
        assert!(RepoLink::parse("acme/charts").is_err());
    }

    #[test]
    fn request_from_link_fills_fields() {
        let req = SourceRequest::from_repo_link("https://github.com/acme/charts/tree/main/svc")
            .unwrap();
        assert_eq!(req.owner, "acme");
        assert_eq!(req.repo, "charts");
        assert_eq!(req.branch, "main");
        assert_eq!(req.path, "svc");
        assert_eq!(req.public_link(), Some("https://github.com/acme/charts/tree/main/svc"));
    }

    #[test]
    fn blank_link_is_not_public() {
        let req = SourceRequest {
            repo_link: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(req.public_link(), None);
    }

    #[test]
    fn request_uses_wire_field_names() {
        let req: SourceRequest = serde_json::from_str(
            r#"{"codeHostID": 7, "owner": "acme", "repo": "charts", "path": "svc", "branch": "main", "repoLink": ""}"#,
        )
        .unwrap();
        assert_eq!(req.code_host_id, Some(7));
        assert_eq!(req.public_link(), None);
    }
}
