//! The boundary between the refresh loop and the network.

use async_trait::async_trait;

use crate::error::TransportError;

/// A completed HTTP exchange, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
    /// `Last-Modified` value to send on the next incremental fetch.
    pub last_modified: Option<String>,
}

impl FetchResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            last_modified: None,
        }
    }

    #[must_use]
    pub fn with_last_modified(mut self, value: impl Into<String>) -> Self {
        self.last_modified = Some(value.into());
        self
    }

    #[must_use]
    pub fn not_modified() -> Self {
        Self::new(304, "")
    }
}

/// Source of flag payloads.
///
/// Implementations return any HTTP status as a [`FetchResponse`] and reserve
/// errors for exchanges that produced no status at all.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the full snapshot from the bulk source. No conditional headers.
    async fn fetch_bulk_snapshot(&self) -> Result<FetchResponse, TransportError>;

    /// Fetch from the incremental API, passing the last seen modification
    /// timestamp so the server can answer 304.
    async fn fetch_incremental(
        &self,
        last_modified: Option<&str>,
    ) -> Result<FetchResponse, TransportError>;
}

#[cfg(feature = "http")]
pub use reqwest_transport::HttpTransport;

#[cfg(feature = "http")]
mod reqwest_transport {
    use async_trait::async_trait;
    use reqwest::header::{IF_MODIFIED_SINCE, LAST_MODIFIED};
    use tracing::debug;

    use super::{FetchResponse, Transport};
    use crate::config::ClientConfig;
    use crate::error::TransportError;

    const API_KEY_HEADER: &str = "X-Api-Key";

    /// [`Transport`] over HTTPS using `reqwest`.
    #[derive(Debug, Clone)]
    pub struct HttpTransport {
        client: reqwest::Client,
        bulk_url: String,
        incremental_url: String,
        sdk_key: String,
    }

    impl HttpTransport {
        /// # Errors
        ///
        /// Returns [`TransportError::Request`] if the HTTP client cannot be
        /// constructed.
        pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
            let client = reqwest::Client::builder()
                .connect_timeout(config.connect_timeout())
                .timeout(config.read_timeout())
                .user_agent(concat!("flagwise/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| TransportError::Request(e.to_string()))?;
            Ok(Self {
                client,
                bulk_url: format!(
                    "{}/{}",
                    config.cdn_host().trim_end_matches('/'),
                    config.sdk_key()
                ),
                incremental_url: format!(
                    "{}{}",
                    config.host().trim_end_matches('/'),
                    config.flags_path()
                ),
                sdk_key: config.sdk_key().to_owned(),
            })
        }

        async fn send(&self, request: reqwest::RequestBuilder) -> Result<FetchResponse, TransportError> {
            let response = request
                .send()
                .await
                .map_err(|e| TransportError::Request(e.to_string()))?;
            let status = response.status().as_u16();
            let last_modified = response
                .headers()
                .get(LAST_MODIFIED)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let body = response
                .text()
                .await
                .map_err(|e| TransportError::Body(e.to_string()))?;
            debug!(status, bytes = body.len(), "fetched flags");
            Ok(FetchResponse {
                status,
                body,
                last_modified,
            })
        }
    }

    #[async_trait]
    impl Transport for HttpTransport {
        async fn fetch_bulk_snapshot(&self) -> Result<FetchResponse, TransportError> {
            self.send(self.client.get(&self.bulk_url)).await
        }

        async fn fetch_incremental(
            &self,
            last_modified: Option<&str>,
        ) -> Result<FetchResponse, TransportError> {
            let mut request = self
                .client
                .get(&self.incremental_url)
                .header(API_KEY_HEADER, &self.sdk_key);
            if let Some(since) = last_modified {
                request = request.header(IF_MODIFIED_SINCE, since);
            }
            self.send(request).await
        }
    }

}
