use bytes::Bytes;
use cas_types::{FetchInfo, FileRange, ReconstructionInfo};
use xethash::CasHash;

use crate::error::Result;

/// A source of reconstruction metadata and term data.
///
/// Implemented by [`RemoteClient`](crate::RemoteClient) over HTTP and by
/// [`LocalClient`](crate::LocalClient) over a directory of xorbs and shards.
#[async_trait::async_trait]
pub trait Client: Send + Sync {
    /// Resolves a file hash (and optional byte range) to its reconstruction
    /// info. `Ok(None)` means the file is unknown or the range lies wholly
    /// past its end.
    async fn get_reconstruction(
        &self,
        file_hash: &CasHash,
        byte_range: Option<FileRange>,
    ) -> Result<Option<ReconstructionInfo>>;

    /// Creates a range fetcher for one download worker.
    ///
    /// Each worker gets its own fetcher with isolated connection state, so
    /// worker failures and socket pools never interact across workers.
    fn range_fetcher(&self) -> Result<Box<dyn RangeFetcher>>;
}

/// Fetches raw xorb byte ranges described by fetch-info entries.
#[async_trait::async_trait]
pub trait RangeFetcher: Send + Sync {
    /// Downloads exactly the bytes of `fetch.url_range` from `fetch.url`.
    async fn fetch_range(&self, fetch: &FetchInfo) -> Result<Bytes>;
}
