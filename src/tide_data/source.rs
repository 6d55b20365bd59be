//! Transport seam between the fetcher and the remote data service.

use crate::tide_data::error::FetchError;
use crate::tide_data::request::Query;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use std::time::Duration;

/// Something that can answer a [`Query`] with the service's raw response body.
#[async_trait]
pub trait TidesSource: Send + Sync {
    async fn fetch(&self, query: &Query) -> Result<Vec<u8>, FetchError>;
}

/// The real NOAA CO-OPS service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("noaa_tides/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TidesSource for HttpSource {
    async fn fetch(&self, query: &Query) -> Result<Vec<u8>, FetchError> {
        let url = query.to_string();
        debug!("Requesting {}", url);

        let response = self
            .client
            .get(query.base_url())
            .query(query.params())
            .send()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    FetchError::HttpStatus {
                        url,
                        status,
                        source: e,
                    }
                } else {
                    FetchError::NetworkRequest(url, e)
                });
            }
        };

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::NetworkRequest(url, e))?;
        Ok(body.to_vec())
    }
}
