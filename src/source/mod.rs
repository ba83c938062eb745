//! Upstream feed access.
//!
//! - [`SourceLocator`] - Decides between HTTP(S) and local file sources
//! - [`SourceCache`] - Fetching, conditional revalidation and background refresh
//!
//! All failures are reported as [`FetchError`], which knows the HTTP status
//! the server should answer with.

mod cache;

use std::path::PathBuf;
use thiserror::Error;
use url::Url;

pub use cache::SourceCache;

/// Errors that can occur while obtaining the upstream feed bytes.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The configured source is neither a usable URL nor a path.
    #[error("Invalid source locator: {0}")]
    InvalidSource(String),
    /// Local feed file could not be read.
    #[error("Failed to read local feed {path}: {error}")]
    Io {
        path: String,
        #[source]
        error: std::io::Error,
    },
    /// Network-level error (DNS, connection, TLS, body read)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Upstream answered with a status other than 2xx/304
    #[error("Upstream HTTP {0}")]
    UpstreamStatus(u16),
    /// Upstream answered 304 but nothing has been cached to revalidate against
    #[error("Upstream returned 304 but no cached body yet")]
    NotModifiedWithoutCache,
    /// Response body exceeded the configured size limit
    #[error("Response too large")]
    ResponseTooLarge,
}

impl FetchError {
    /// Status code reported to the client that triggered the fetch.
    pub fn status_code(&self) -> u16 {
        match self {
            FetchError::InvalidSource(_) | FetchError::Io { .. } => 400,
            FetchError::UpstreamStatus(status) => *status,
            FetchError::Network(_)
            | FetchError::Timeout
            | FetchError::NotModifiedWithoutCache
            | FetchError::ResponseTooLarge => 502,
        }
    }

    pub(crate) fn from_request(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(e)
        }
    }
}

/// Where the upstream feed lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    Http(Url),
    File(PathBuf),
}

impl SourceLocator {
    /// Classifies a configured source.
    ///
    /// `http://` and `https://` sources must parse as URLs; anything else is
    /// a filesystem path, with an optional `file://` prefix.
    pub fn parse(raw: &str) -> Result<Self, FetchError> {
        let raw = raw.trim();
        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            let url = Url::parse(raw)
                .map_err(|e| FetchError::InvalidSource(format!("{raw}: {e}")))?;
            return Ok(SourceLocator::Http(url));
        }

        let path = raw.strip_prefix("file://").unwrap_or(raw);
        if path.is_empty() {
            return Err(FetchError::InvalidSource("empty path".to_string()));
        }
        Ok(SourceLocator::File(PathBuf::from(path)))
    }
}
