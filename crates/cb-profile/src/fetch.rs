//! Fetching filter lists.

use async_trait::async_trait;

use crate::error::FetchError;

/// Downloads the raw bytes of a filter list.
#[async_trait]
pub trait RuleFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

#[cfg(feature = "http")]
pub use http::HttpFetcher;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use async_trait::async_trait;
    use reqwest::Client;

    use super::RuleFetcher;
    use crate::error::FetchError;

    /// Default timeout for HTTP requests in seconds.
    const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// User-Agent header value for HTTP requests.
    const USER_AGENT: &str = concat!("contentblocker/", env!("CARGO_PKG_VERSION"));

    /// Fetches lists over HTTP(S) with `reqwest`.
    #[derive(Debug, Clone)]
    pub struct HttpFetcher {
        client: Client,
    }

    impl HttpFetcher {
        /// # Errors
        ///
        /// Returns an error if the HTTP client cannot be created.
        pub fn new() -> Result<Self, FetchError> {
            Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        }

        pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
            let client = Client::builder()
                .timeout(timeout)
                .user_agent(USER_AGENT)
                .gzip(true)
                .build()
                .map_err(FetchError::ClientBuild)?;

            Ok(Self { client })
        }
    }

    fn request_error(url: &str, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout { url: url.to_string() }
        } else {
            FetchError::Network {
                url: url.to_string(),
                source: Box::new(err),
            }
        }
    }

    #[async_trait]
    impl RuleFetcher for HttpFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|err| request_error(url, err))?;

            if !response.status().is_success() {
                return Err(FetchError::HttpStatus {
                    url: url.to_string(),
                    status: response.status().as_u16(),
                });
            }

            let body = response.bytes().await.map_err(|err| request_error(url, err))?;
            log::debug!("fetched {} bytes from {url}", body.len());
            Ok(body.to_vec())
        }
    }
}
