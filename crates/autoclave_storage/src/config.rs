//! HTTP archive configuration.

use std::time::Duration;

/// Base URL of the public autoclaved archive.
pub const DEFAULT_BASE_URL: &str = "http://datacollector.infra.ooni.io/ooni-public/autoclaved/";

/// Configuration for [`crate::HttpArchive`].
#[derive(Debug, Clone)]
pub struct HttpArchiveConfig {
    /// Base URL archive filenames are resolved against.
    pub base_url: String,
    /// Timeout for establishing a connection.
    pub connect_timeout: Duration,
    /// Timeout for a whole buffered request (headers and body).
    ///
    /// Streaming bodies are bounded by the reader's per-read timeout instead.
    pub request_timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl HttpArchiveConfig {
    /// Creates a configuration for `base_url`.
    ///
    /// The base URL is normalized to end with `/` so that archive filenames
    /// are appended rather than replacing its last segment.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            base_url,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            user_agent: format!("autoclave/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the buffered request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl Default for HttpArchiveConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
