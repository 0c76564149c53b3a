//! Code host records and resolved credentials.

use serde::{Deserialize, Serialize};

/// Code host as stored by the directory.
///
/// `type` is kept as the directory's raw string; mapping it to a
/// [`ProviderKind`] is the selector's job.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeHost {
    pub id: i64,
    #[serde(rename = "type")]
    pub r#type: String,
    /// Base address of the provider instance (e.g. `https://gitlab.example.com`)
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub access_token: String,
}

// Keep tokens out of logs.
impl std::fmt::Debug for CodeHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeHost")
            .field("id", &self.id)
            .field("type", &self.r#type)
            .field("address", &self.address)
            .field("access_token", &redact(&self.access_token))
            .finish()
    }
}

/// Provider families the resolver can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "github")]
    GitHub,
    #[serde(rename = "gitlab")]
    GitLab,
    #[serde(rename = "public")]
    PublicUnauthenticated,
}

impl ProviderKind {
    /// Map a directory type string to a kind a code host may carry.
    ///
    /// `PublicUnauthenticated` is never a valid directory type; it is
    /// synthesized from repository links only.
    pub fn from_code_host_type(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "github" => Some(Self::GitHub),
            "gitlab" => Some(Self::GitLab),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::GitLab => "gitlab",
            Self::PublicUnauthenticated => "public",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection details for one provider instance.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredential {
    pub kind: ProviderKind,
    pub base_address: String,
    /// Access token; `None` means anonymous access.
    pub token: Option<String>,
}

impl ProviderCredential {
    /// Credential for anonymous access to the host of a public link.
    pub fn public(base_address: impl Into<String>) -> Self {
        Self {
            kind: ProviderKind::PublicUnauthenticated,
            base_address: base_address.into(),
            token: None,
        }
    }

    pub(crate) fn from_code_host(kind: ProviderKind, host: &CodeHost) -> Self {
        let token = Some(host.access_token.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        Self {
            kind,
            base_address: host.address.trim().to_string(),
            token,
        }
    }
}

impl std::fmt::Debug for ProviderCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredential")
            .field("kind", &self.kind)
            .field("base_address", &self.base_address)
            .field("token", &self.token.as_deref().map(redact))
            .finish()
    }
}

fn redact(token: &str) -> &'static str {
    if token.is_empty() { "" } else { "<redacted>" }
}
