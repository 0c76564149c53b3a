//! HTTP plumbing shared by the provider adapters.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode};
use url::Url;

use crate::config::ResolverConfig;
use crate::error::{Result, SourceError};
use crate::source::MaterializeLimits;

/// Transport settings every adapter is built with.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub user_agent: String,
    pub timeout: Duration,
    /// Egress proxy; only GitHub-style clients route through it.
    pub proxy: Option<Url>,
    /// Bounds for listings and for `get_tree_contents`.
    pub limits: MaterializeLimits,
}

impl ClientSettings {
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            proxy: config.proxy_https.clone(),
            limits: config.limits(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::from_config(&ResolverConfig::default())
    }
}

/// Build a `reqwest::Client`, optionally routed through `proxy`.
pub(crate) fn build_http_client(
    settings: &ClientSettings,
    proxy: Option<&Url>,
) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(settings.timeout);
    if let Some(proxy) = proxy {
        let proxy = reqwest::Proxy::https(proxy.as_str())
            .map_err(|e| SourceError::ProviderInit(format!("invalid proxy {}: {}", proxy, e)))?;
        builder = builder.proxy(proxy);
    }
    builder
        .build()
        .map_err(|e| SourceError::ProviderInit(format!("failed to build HTTP client: {}", e)))
}

/// Parse an API root, requiring an http(s) scheme and a host.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| SourceError::ProviderInit(format!("invalid base address '{}': {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(SourceError::ProviderInit(format!(
            "base address must be an http(s) URL with a host: '{}'",
            raw
        )));
    }
    Ok(url)
}

/// Append path segments to `base`; each segment is percent-encoded,
/// including any `/` it contains.
pub(crate) fn join_segments<'a>(
    base: &Url,
    segments: impl IntoIterator<Item = &'a str>,
) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| SourceError::ProviderInit(format!("cannot extend base address {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Split a repository path into non-empty segments.
pub(crate) fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty() && *s != ".")
}

/// Normalize a repository path: no leading/trailing or doubled slashes.
pub(crate) fn normalize_repo_path(path: &str) -> String {
    path_segments(path).collect::<Vec<_>>().join("/")
}

/// Map non-success statuses onto the error taxonomy.
pub(crate) async fn check_status(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &headers, &body, what))
}

pub(crate) fn status_error(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
    what: &str,
) -> SourceError {
    let detail = summarize_body(body);
    match status {
        StatusCode::NOT_FOUND => SourceError::NotFound(what.to_string()),
        StatusCode::UNAUTHORIZED => SourceError::Auth(format!("{}: {}", what, detail)),
        StatusCode::TOO_MANY_REQUESTS => SourceError::RateLimit {
            reset_at: rate_limit_reset(headers),
        },
        StatusCode::FORBIDDEN if is_rate_limited(headers, body) => SourceError::RateLimit {
            reset_at: rate_limit_reset(headers),
        },
        StatusCode::FORBIDDEN => SourceError::Auth(format!("{}: {}", what, detail)),
        other => SourceError::Http(format!("{} returned HTTP {}: {}", what, other, detail)),
    }
}

fn is_rate_limited(headers: &HeaderMap, body: &str) -> bool {
    header_str(headers, "x-ratelimit-remaining") == Some("0")
        || headers.contains_key("retry-after")
        || body.to_ascii_lowercase().contains("rate limit")
}

/// Reset instant from `x-ratelimit-reset`/`ratelimit-reset` (epoch seconds)
/// or `retry-after` (delta seconds).
pub(crate) fn rate_limit_reset(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let epoch = header_str(headers, "x-ratelimit-reset")
        .or_else(|| header_str(headers, "ratelimit-reset"))
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0));
    if epoch.is_some() {
        return epoch;
    }
    header_str(headers, "retry-after")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(|secs| Utc::now() + chrono::Duration::seconds(secs))
}

pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn summarize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() > 200 {
        let mut end = 200;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &trimmed[..end])
    } else {
        trimmed.to_string()
    }
}
