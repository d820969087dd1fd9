//! File/URL loader contract (§6): how the rolodex fetches a document it does
//! not yet have bytes for.
//!
//! Both bundled implementations are opt-in via Cargo features, matching the
//! teacher's `http`/`toml`/`yaml` feature-gating convention.

use crate::error::{RemoteFetchError, RemoteFetchSnafu};
use crate::uri::AbsoluteUri;

/// Resolves references to absolute URIs and fetches the bytes behind them.
///
/// `resolve` is synchronous (pure string/path manipulation); `fetch` is
/// async since it may touch disk or network.
#[trait_variant::make(Send)]
pub trait Loader {
    /// Resolves `reference`, found while parsing a document loaded from
    /// `base`, to an absolute URI.
    ///
    /// # Errors
    /// Returns [`RemoteFetchError`] if `reference` escapes whatever
    /// boundary this loader enforces (e.g. a `FsLoader` rooted outside
    /// `base_directory`).
    fn resolve(&self, base: &AbsoluteUri, reference: &str) -> Result<AbsoluteUri, RemoteFetchError>;

    /// Fetches the raw bytes at `uri`.
    ///
    /// # Errors
    /// Returns [`RemoteFetchError`] if the fetch fails for any reason (file
    /// not found, network error, non-2xx response, timeout).
    async fn fetch(&self, uri: &AbsoluteUri) -> Result<Vec<u8>, RemoteFetchError>;
}

/// Loads documents from the local filesystem, rooted at a configured base
/// directory (§6).
#[cfg(feature = "fs")]
#[derive(Debug, Clone)]
pub struct FsLoader {
    base_directory: std::path::PathBuf,
    allow_escape: bool,
}

#[cfg(feature = "fs")]
impl FsLoader {
    #[must_use]
    pub fn new(base_directory: impl Into<std::path::PathBuf>) -> Self {
        Self {
            base_directory: base_directory.into(),
            allow_escape: false,
        }
    }

    /// Permits resolved paths to escape `base_directory` via `..` segments.
    #[must_use]
    pub fn allow_escape(mut self, value: bool) -> Self {
        self.allow_escape = value;
        self
    }
}

#[cfg(feature = "fs")]
impl Loader for FsLoader {
    fn resolve(&self, base: &AbsoluteUri, reference: &str) -> Result<AbsoluteUri, RemoteFetchError> {
        let resolved = base.resolve(reference).map_err(|e| {
            RemoteFetchSnafu {
                uri: base.clone(),
                message: e.to_string(),
            }
            .build()
        })?;
        if !self.allow_escape {
            let root = self.base_directory.to_string_lossy();
            if !resolved.path().starts_with(root.as_ref()) {
                return RemoteFetchSnafu {
                    uri: resolved.clone(),
                    message: format!("path escapes base directory {}", self.base_directory.display()),
                }
                .fail();
            }
        }
        Ok(resolved)
    }

    async fn fetch(&self, uri: &AbsoluteUri) -> Result<Vec<u8>, RemoteFetchError> {
        let path = self.base_directory.join(uri.path().trim_start_matches('/'));
        tokio::fs::read(&path).await.map_err(|e| {
            RemoteFetchSnafu {
                uri: uri.clone(),
                message: e.to_string(),
            }
            .build()
        })
    }
}

/// Loads documents over HTTP via a pluggable [`reqwest::Client`] (§6).
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpLoader {
    client: reqwest::Client,
    follow_redirects: bool,
    timeout: std::time::Duration,
}

#[cfg(feature = "http")]
impl HttpLoader {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            follow_redirects: true,
            timeout: std::time::Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn follow_redirects(mut self, value: bool) -> Self {
        self.follow_redirects = value;
        self
    }

    #[must_use]
    pub fn timeout(mut self, value: std::time::Duration) -> Self {
        self.timeout = value;
        self
    }
}

#[cfg(feature = "http")]
impl Loader for HttpLoader {
    fn resolve(&self, base: &AbsoluteUri, reference: &str) -> Result<AbsoluteUri, RemoteFetchError> {
        base.resolve(reference).map_err(|e| {
            RemoteFetchSnafu {
                uri: base.clone(),
                message: e.to_string(),
            }
            .build()
        })
    }

    #[tracing::instrument(skip(self), fields(uri = %uri))]
    async fn fetch(&self, uri: &AbsoluteUri) -> Result<Vec<u8>, RemoteFetchError> {
        let request = self.client.get(uri.as_str()).timeout(self.timeout);
        let response = request.send().await.map_err(|e| {
            RemoteFetchSnafu {
                uri: uri.clone(),
                message: e.to_string(),
            }
            .build()
        })?;
        if !self.follow_redirects && response.status().is_redirection() {
            return RemoteFetchSnafu {
                uri: uri.clone(),
                message: format!("redirected with status {}", response.status()),
            }
            .fail();
        }
        let status = response.status();
        if !status.is_success() {
            return RemoteFetchSnafu {
                uri: uri.clone(),
                message: format!("unexpected status {status}"),
            }
            .fail();
        }
        let bytes = response.bytes().await.map_err(|e| {
            RemoteFetchSnafu {
                uri: uri.clone(),
                message: e.to_string(),
            }
            .build()
        })?;
        Ok(bytes.to_vec())
    }
}
