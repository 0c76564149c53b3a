//! Chooses and builds the provider client for a request.

use std::sync::Arc;

use tracing::{debug, error};

use crate::codehost::{CodeHostDirectory, ProviderCredential, ProviderKind};
use crate::config::ResolverConfig;
use crate::error::{Result, SourceError};
use crate::provider::{ClientSettings, GitHubClient, GitLabClient, ProviderClient, PublicClient};

use super::SourceRequest;

/// Log target for violated provider invariants.
pub const INVARIANT_TARGET: &str = "treeport::invariant";

/// Maps a [`SourceRequest`] to a ready [`ProviderClient`].
///
/// A repository link always wins and never touches the directory. Otherwise
/// the code host is looked up and its type decides the client.
#[derive(Clone)]
pub struct ProviderSelector {
    directory: Arc<dyn CodeHostDirectory>,
    settings: ClientSettings,
    github_api_url: String,
}

impl std::fmt::Debug for ProviderSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSelector")
            .field("settings", &self.settings)
            .field("github_api_url", &self.github_api_url)
            .finish_non_exhaustive()
    }
}

impl ProviderSelector {
    pub fn new(directory: Arc<dyn CodeHostDirectory>, settings: ClientSettings) -> Self {
        Self {
            directory,
            settings,
            github_api_url: ResolverConfig::default().github_api_url,
        }
    }

    pub fn from_config(directory: Arc<dyn CodeHostDirectory>, config: &ResolverConfig) -> Self {
        Self {
            directory,
            settings: ClientSettings::from_config(config),
            github_api_url: config.github_api_url.clone(),
        }
    }

    /// API root for `github` code hosts.
    pub fn with_github_api_url(mut self, url: impl Into<String>) -> Self {
        self.github_api_url = url.into();
        self
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Work out which provider and credential serve `request`.
    pub async fn credential(&self, request: &SourceRequest) -> Result<ProviderCredential> {
        if let Some(link) = request.public_link() {
            debug!(repo_link = link, "using public provider");
            return Ok(ProviderCredential::public(link));
        }

        let id = request.code_host_id.ok_or_else(|| {
            SourceError::NotFound("request names neither a code host nor a repo link".to_string())
        })?;
        let host = self.directory.lookup(id).await?;
        match ProviderKind::from_code_host_type(&host.r#type) {
            Some(kind) => {
                debug!(code_host_id = id, kind = kind.as_str(), "code host resolved");
                Ok(ProviderCredential::from_code_host(kind, &host))
            }
            None => {
                error!(
                    target: INVARIANT_TARGET,
                    code_host_id = id,
                    code_host_type = host.r#type.as_str(),
                    "code host has a provider type with no client"
                );
                Err(SourceError::UnsupportedProvider(format!(
                    "code host {} has type '{}'",
                    id, host.r#type
                )))
            }
        }
    }

    /// Build the client for `request`.
    pub async fn resolve(&self, request: &SourceRequest) -> Result<ProviderClient> {
        let credential = self.credential(request).await?;
        let client = match credential.kind {
            ProviderKind::GitHub => ProviderClient::GitHub(GitHubClient::new(
                &self.github_api_url,
                credential.token,
                &self.settings,
            )?),
            ProviderKind::GitLab => ProviderClient::GitLab(GitLabClient::new(
                &credential.base_address,
                credential.token,
                &self.settings,
            )?),
            ProviderKind::PublicUnauthenticated => ProviderClient::Public(PublicClient::for_link(
                &credential.base_address,
                &self.settings,
            )?),
        };
        Ok(client)
    }
}
