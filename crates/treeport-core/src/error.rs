//! Error taxonomy shared by every stage of source resolution.

use chrono::{DateTime, Utc};

use crate::vfs::VfsError;

/// Errors produced while resolving, fetching or materializing a source tree.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// A code host identifier, repository, branch or path does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The code host directory could not be consulted.
    #[error("code host directory unavailable: {0}")]
    Directory(String),

    /// The provider rejected the credential.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// The provider is throttling the caller.
    #[error("rate limited by provider{}", reset_suffix(.reset_at))]
    RateLimit { reset_at: Option<DateTime<Utc>> },

    /// The provider configuration is malformed (e.g. a bad base address).
    #[error("failed to initialize provider: {0}")]
    ProviderInit(String),

    /// The code host directory returned a provider kind this crate does not know.
    ///
    /// This is an invariant violation of the directory, not a user error.
    #[error("unsupported provider kind: {0}")]
    UnsupportedProvider(String),

    /// The root directory could not be renamed.
    #[error("failed to rename root `{from}` to `{to}`: {source}")]
    Rename {
        from: String,
        to: String,
        #[source]
        source: VfsError,
    },

    /// The calling context cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// The remote tree exceeds the configured node or byte limits.
    #[error("tree too large: {0}")]
    TooLarge(String),

    /// The root name deriver failed.
    #[error("failed to derive root name: {0}")]
    Derive(String),

    /// Transport failure or an unexpected HTTP status.
    #[error("http error: {0}")]
    Http(String),

    /// The provider answered with a body that could not be decoded.
    #[error("failed to decode provider response: {0}")]
    Decode(String),

    /// The in-memory filesystem rejected an operation.
    #[error(transparent)]
    Fs(#[from] VfsError),
}

/// Stable classification of [`SourceError`] for caller policy decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Directory,
    Auth,
    RateLimit,
    ProviderInit,
    UnsupportedProvider,
    Rename,
    Cancelled,
    TooLarge,
    Derive,
    Http,
    Decode,
    Fs,
}

impl SourceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Directory(_) => ErrorKind::Directory,
            Self::Auth(_) => ErrorKind::Auth,
            Self::RateLimit { .. } => ErrorKind::RateLimit,
            Self::ProviderInit(_) => ErrorKind::ProviderInit,
            Self::UnsupportedProvider(_) => ErrorKind::UnsupportedProvider,
            Self::Rename { .. } => ErrorKind::Rename,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::TooLarge(_) => ErrorKind::TooLarge,
            Self::Derive(_) => ErrorKind::Derive,
            Self::Http(_) => ErrorKind::Http,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Fs(_) => ErrorKind::Fs,
        }
    }

    /// True for errors that indicate a broken internal contract rather than bad input.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::UnsupportedProvider(_))
    }

    /// True when backing off and retrying later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit { .. })
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

fn reset_suffix(reset_at: &Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(at) => format!(" until {}", at.to_rfc3339()),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, SourceError>;
