//! HTTP range fetcher.
//!
//! Archive files live on a plain HTTP object store. Every fetch is a single
//! `GET` with an inclusive `Range` header; the store must answer with
//! partial content and a `Content-Length` the caller can check.

use crate::archive::{ArchiveFile, ByteRange};
use crate::body::RangeBody;
use crate::config::HttpArchiveConfig;
use crate::error::{reqwest_to_io, FetchError, FetchResult};
use crate::fetcher::RangeFetcher;
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use reqwest::header::RANGE;
use reqwest::{Client, Response, StatusCode, Url};
use tokio_util::io::StreamReader;
use tracing::debug;

/// A [`RangeFetcher`] backed by an HTTP object store.
#[derive(Debug, Clone)]
pub struct HttpArchive {
    client: Client,
    base_url: Url,
    config: HttpArchiveConfig,
}

impl HttpArchive {
    /// Creates an HTTP archive from a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or the HTTP client
    /// cannot be built.
    pub fn new(config: HttpArchiveConfig) -> FetchResult<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| FetchError::invalid_path(config.base_url.clone(), e.to_string()))?;
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &HttpArchiveConfig {
        &self.config
    }

    /// Resolves an archive filename against the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidPath`] if the join fails.
    pub fn url_for(&self, file: &ArchiveFile) -> FetchResult<Url> {
        self.base_url
            .join(file.as_str())
            .map_err(|e| FetchError::invalid_path(file.as_str(), e.to_string()))
    }

    async fn send_range(&self, url: Url, range: ByteRange) -> FetchResult<Response> {
        debug!(%url, range = %range.header_value(), "fetching archive range");
        let response = self
            .client
            .get(url.clone())
            .header(RANGE, range.header_value())
            .send()
            .await?;
        check_status(&url, &response)?;

        if response.status() == StatusCode::OK {
            // The store ignored the range; length checks will reject the body.
            debug!(%url, "range request answered with 200");
        }
        Ok(response)
    }
}

fn check_status(url: &Url, response: &Response) -> FetchResult<()> {
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(())
}

fn range_body(range: ByteRange, response: Response) -> RangeBody {
    let declared_len = response.content_length();
    let stream = response.bytes_stream().map_err(reqwest_to_io);
    RangeBody::new(range, declared_len, Box::pin(StreamReader::new(stream)))
}

#[async_trait]
impl RangeFetcher for HttpArchive {
    async fn open_range(&self, file: &ArchiveFile, range: ByteRange) -> FetchResult<RangeBody> {
        let url = self.url_for(file)?;
        let response = tokio::time::timeout(self.config.request_timeout, self.send_range(url, range))
            .await
            .map_err(|_| FetchError::Timeout)??;

        Ok(range_body(range, response))
    }

    async fn fetch_range(&self, file: &ArchiveFile, range: ByteRange) -> FetchResult<Bytes> {
        let url = self.url_for(file)?;
        let fetch = async {
            let body = range_body(range, self.send_range(url, range).await?);
            body.check_declared_len()?;
            body.read_to_end().await
        };
        tokio::time::timeout(self.config.request_timeout, fetch)
            .await
            .map_err(|_| FetchError::Timeout)?
    }

    async fn fetch_object(&self, file: &ArchiveFile) -> FetchResult<Bytes> {
        let url = self.url_for(file)?;
        debug!(%url, "fetching archive object");
        let fetch = async {
            let response = self.client.get(url.clone()).send().await?;
            check_status(&url, &response)?;
            Ok::<_, FetchError>(response.bytes().await?)
        };
        tokio::time::timeout(self.config.request_timeout, fetch)
            .await
            .map_err(|_| FetchError::Timeout)?
    }
}
