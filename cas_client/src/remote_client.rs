use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use cas_types::{FetchInfo, FileRange, HttpRange, ReconstructionInfo};
use http::header::RANGE;
use lazy_static::lazy_static;
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use tracing::{debug, info};
use url::Url;
use utils::AuthConfig;
use xet_config::xet_config;
use xethash::CasHash;

use crate::error::{CasClientError, Result};
use crate::http_client::{build_auth_http_client, build_http_client, RetryConfig};
use crate::interface::{Client, RangeFetcher};

lazy_static! {
    static ref API_CALL_ID: AtomicU64 = AtomicU64::new(1);
}

/// HTTP client against a remote CAS endpoint.
///
/// Metadata calls go through an authenticated client with transient-error
/// retries; term data is fetched from presigned URLs by per-worker
/// [`HttpRangeFetcher`]s that never retry, surfacing the retryable /
/// non-retryable classification to the caller.
pub struct RemoteClient {
    endpoint: String,
    user_agent: String,
    authenticated_client: ClientWithMiddleware,
}

impl RemoteClient {
    pub fn new(endpoint: &str, auth: &Option<AuthConfig>, user_agent: &str) -> Result<Arc<Self>> {
        let authenticated_client = build_auth_http_client(auth, RetryConfig::default(), user_agent)?;
        Ok(Arc::new(Self {
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            user_agent: user_agent.to_owned(),
            authenticated_client,
        }))
    }

    /// Same, with the user agent taken from configuration.
    pub fn from_config(endpoint: &str, auth: &Option<AuthConfig>) -> Result<Arc<Self>> {
        let user_agent = xet_config().client.http_user_agent.clone();
        Self::new(endpoint, auth, &user_agent)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl Client for RemoteClient {
    async fn get_reconstruction(
        &self,
        file_hash: &CasHash,
        byte_range: Option<FileRange>,
    ) -> Result<Option<ReconstructionInfo>> {
        let call_id = API_CALL_ID.fetch_add(1, Ordering::Relaxed);
        let url = Url::parse(&format!("{}/v1/reconstructions/{}", self.endpoint, file_hash.hex()))?;
        info!(call_id, %file_hash, ?byte_range, "Starting get_reconstruction API call");

        let mut request = self.authenticated_client.get(url);
        if let Some(range) = byte_range {
            request = request.header(RANGE, HttpRange::from(range).range_header());
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            info!(call_id, %file_hash, "Requested byte range is not satisfiable");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(CasClientError::HttpError(status));
        }

        let reconstruction: ReconstructionInfo = response.json().await?;
        info!(
            call_id,
            %file_hash,
            num_terms = reconstruction.terms.len(),
            offset_into_first_range = reconstruction.offset_into_first_range,
            "Completed get_reconstruction API call"
        );

        Ok(Some(reconstruction))
    }

    fn range_fetcher(&self) -> Result<Box<dyn RangeFetcher>> {
        // A fresh client per worker: isolated connection pool, no retries,
        // and no auth since presigned URLs carry their own.
        let client = build_http_client(RetryConfig::no_retries(), &self.user_agent)?;
        Ok(Box::new(HttpRangeFetcher { client }))
    }
}

/// One worker's connection to the blob store.
pub struct HttpRangeFetcher {
    client: ClientWithMiddleware,
}

#[async_trait::async_trait]
impl RangeFetcher for HttpRangeFetcher {
    async fn fetch_range(&self, fetch: &FetchInfo) -> Result<Bytes> {
        let url = Url::parse(&fetch.url)?;
        debug!(url = %fetch.url, range = %fetch.url_range.range_header(), "Fetching xorb byte range");

        let response = self
            .client
            .get(url)
            .header(RANGE, fetch.url_range.range_header())
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::PARTIAL_CONTENT {
            return Err(CasClientError::HttpError(status));
        }

        let data = response.bytes().await?;
        if data.len() as u64 != fetch.url_range.length() {
            return Err(CasClientError::InvalidResponse(format!(
                "range response returned {} bytes, requested {}",
                data.len(),
                fetch.url_range.length()
            )));
        }

        Ok(data)
    }
}
