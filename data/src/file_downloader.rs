use std::sync::Arc;

use cas_client::{Client, DataOutput, FileReconstructor, RemoteClient};
use cas_types::FileRange;
use tracing::instrument;
use utils::AuthConfig;
use xethash::CasHash;

use crate::errors::Result;

/// Downloads files by hash from a CAS endpoint.
pub struct FileDownloader {
    client: Arc<dyn Client>,
}

impl FileDownloader {
    /// A downloader against a remote endpoint, usually constructed from the
    /// `cas_url` and access token of a [`XetReadToken`](crate::XetReadToken).
    pub fn new(cas_endpoint: &str, auth: &Option<AuthConfig>) -> Result<Self> {
        let client = RemoteClient::from_config(cas_endpoint, auth)?;
        Ok(Self::from_client(client))
    }

    /// A downloader over any client implementation; how the client was
    /// obtained and authenticated is the caller's business.
    pub fn from_client(client: Arc<dyn Client>) -> Self {
        Self { client }
    }

    /// Reconstructs a file (or byte range of it) into the given output.
    /// Returns the number of bytes written.
    #[instrument(skip_all, fields(hash = %file_hash))]
    pub async fn download_file_from_hash(
        &self,
        file_hash: &CasHash,
        output: DataOutput,
        range: Option<FileRange>,
    ) -> Result<u64> {
        let written = FileReconstructor::new(&self.client)
            .reconstruct_to_output(file_hash, range, output)
            .await?;
        Ok(written)
    }
}
