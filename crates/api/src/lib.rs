//! Adapter backend HTTP client.
//!
//! This module provides a lightweight client for the adapter backend. It
//! focuses on:
//!
//! - Constructing an HTTP client with sensible defaults (timeout, User-Agent)
//! - Validating the configured base URL for safety
//! - Issuing GET requests against API-relative paths and returning the body
//!
//! Decoding the body is left to callers so a transport failure and a
//! malformed payload stay distinguishable.
//!
//! # Example
//!
//! ```ignore
//! use adapter_api::{AdapterApiClient, ClientSettings, ADAPTERS_PATH};
//!
//! async fn run() -> Result<(), adapter_api::ApiError> {
//!     let client = AdapterApiClient::new(&ClientSettings::new("http://localhost:5000/api"))?;
//!     let body = client.get_body(ADAPTERS_PATH).await?;
//!     println!("{body}");
//!     Ok(())
//! }
//! ```

use std::{env, time::Duration};

use reqwest::{Client, Method, RequestBuilder, Url, header};
use thiserror::Error;
use tracing::debug;

/// API-relative path of the adapter listing endpoint.
pub const ADAPTERS_PATH: &str = "/adapters";

/// Request timeout used when settings do not specify one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Hostnames allowed to use plain `http` without opting in.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1", "[::1]", "::1"];

/// Longest response body excerpt carried in a status error.
const MAX_ERROR_BODY_CHARS: usize = 160;

/// Errors raised while building the client or talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("network error calling {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Inputs for [`AdapterApiClient::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Base URL every request path is appended to (e.g., `http://localhost:5000/api`)
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// User-Agent header; a crate default is used when `None`
    pub user_agent: Option<String>,
    /// Permit plain `http` for hosts other than localhost
    pub allow_insecure: bool,
}

impl ClientSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
            allow_insecure: false,
        }
    }
}

#[derive(Debug, Clone)]
/// Thin wrapper around a configured `reqwest::Client` for adapter backend access.
///
/// The client pre-configures default headers and builds requests against a
/// validated base URL.
pub struct AdapterApiClient {
    base_url: String,
    http: Client,
    user_agent: String,
}

impl AdapterApiClient {
    /// Construct a client from [`ClientSettings`].
    ///
    /// The base URL is validated and stripped of trailing slashes. Non-localhost
    /// hosts must use HTTPS unless `allow_insecure` is set.
    pub fn new(settings: &ClientSettings) -> Result<Self, ApiError> {
        let base_url = validate_base_url(&settings.base_url, settings.allow_insecure)?;

        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(settings.timeout)
            .build()
            .map_err(ApiError::ClientBuild)?;

        Ok(Self {
            base_url,
            http,
            user_agent: settings.user_agent.clone().unwrap_or_else(default_user_agent),
        })
    }

    /// The validated base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a `reqwest::RequestBuilder` for a method and API-relative path.
    ///
    /// The resulting request includes the configured User-Agent and base
    /// headers, and is resolved relative to `self.base_url`.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url_for(path);
        debug!(%url, "building request");

        self.http.request(method, url).header(header::USER_AGENT, &self.user_agent)
    }

    /// Perform a GET against `path` and return the body of a 2xx response.
    ///
    /// Non-success statuses become [`ApiError::Status`] carrying a trimmed
    /// excerpt of the body.
    pub async fn get_body(&self, path: &str) -> Result<String, ApiError> {
        let url = self.url_for(path);
        let response = self.request(Method::GET, path).send().await.map_err(|source| {
            if source.is_timeout() {
                ApiError::Timeout { url: url.clone() }
            } else {
                ApiError::Network { url: url.clone(), source }
            }
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|source| {
            if source.is_timeout() {
                ApiError::Timeout { url: url.clone() }
            } else {
                ApiError::Body { url: url.clone(), source }
            }
        })?;

        if !status.is_success() {
            return Err(ApiError::Status {
                url,
                status: status.as_u16(),
                body: truncate_for_summary(&text, MAX_ERROR_BODY_CHARS),
            });
        }

        debug!(%url, status = status.as_u16(), body_len = text.len(), "received response");
        Ok(text)
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

fn default_user_agent() -> String {
    format!("adapter-registry/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS)
}

/// Validate that a base URL is acceptable for use by the client and return
/// it without trailing slashes.
///
/// Rules:
/// - scheme must be `http` or `https` and a host must be present
/// - `localhost`, `127.0.0.1`, `::1`: any of the two schemes
/// - otherwise: HTTPS only, unless `allow_insecure` is set
pub fn validate_base_url(base: &str, allow_insecure: bool) -> Result<String, ApiError> {
    let trimmed = base.trim().trim_end_matches('/');
    let invalid = |reason: String| ApiError::InvalidBaseUrl {
        url: base.to_string(),
        reason,
    };

    let parsed = Url::parse(trimmed).map_err(|error| invalid(error.to_string()))?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(invalid(format!("unsupported scheme '{}'", scheme)));
    }

    let host_name = parsed.host_str().ok_or_else(|| invalid("a host is required".into()))?;

    let is_local = LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host_name.eq_ignore_ascii_case(allowed));
    if scheme == "http" && !is_local && !allow_insecure {
        return Err(invalid(format!(
            "plain http is only allowed for localhost; got host '{}'",
            host_name
        )));
    }

    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(invalid("query strings and fragments are not allowed".into()));
    }

    Ok(trimmed.to_string())
}

fn truncate_for_summary(text: &str, max_len: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_len {
        return trimmed.to_string();
    }

    // Reserve space for the trailing ellipsis ("...").
    let target_len = max_len.saturating_sub(3);
    let truncated: String = trimmed.chars().take(target_len).collect();
    format!("{}...", truncated.trim_end())
}
