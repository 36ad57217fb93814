use std::path::Path;
use std::sync::Arc;

use cas_client::DataOutput;
use cas_types::FileRange;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, instrument};
use utils::AuthConfig;
use xethash::CasHash;

use crate::errors::{DataClientError, Result};
use crate::file_downloader::FileDownloader;
use crate::hub_client::{fetch_xet_read_token, HubRepo};

/// Ceiling on files downloaded at once; each file additionally runs its own
/// term worker pool.
const MAX_CONCURRENT_FILE_DOWNLOADS: usize = 8;

/// The hub token is only ever read here; the CAS layers take explicit
/// credentials.
pub fn hub_token_from_env() -> Option<String> {
    std::env::var("HF_TOKEN").ok().filter(|t| !t.is_empty())
}

/// Downloads a batch of `(file_hash_hex, destination_path)` pairs from a CAS
/// endpoint, bounded-concurrently. Returns the destination paths in input
/// order.
#[instrument(skip_all, fields(num_files = file_infos.len()))]
pub async fn download_async(
    file_infos: Vec<(String, String)>,
    cas_endpoint: String,
    token_info: Option<(String, u64)>,
) -> Result<Vec<String>> {
    let (token, token_expiration) = token_info.unzip();
    let auth = AuthConfig::maybe_new(token, token_expiration);
    let downloader = Arc::new(FileDownloader::new(&cas_endpoint, &auth)?);

    let num_files = file_infos.len();
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_FILE_DOWNLOADS));
    let mut tasks: JoinSet<Result<(usize, String)>> = JoinSet::new();

    for (index, (hash_hex, dest)) in file_infos.into_iter().enumerate() {
        let downloader = downloader.clone();
        let semaphore = semaphore.clone();

        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| DataClientError::ParameterError(format!("semaphore closed: {e}")))?;

            let file_hash = CasHash::from_hex(&hash_hex)?;
            smudge_file(&downloader, &file_hash, Path::new(&dest), None).await?;
            Ok((index, dest))
        });
    }

    let mut paths = vec![String::new(); num_files];
    while let Some(joined) = tasks.join_next().await {
        let (index, dest) = joined??;
        paths[index] = dest;
    }

    Ok(paths)
}

/// Downloads one file from the hub: exchanges the hub token for CAS read
/// credentials, then reconstructs the file to `dest`.
pub async fn download_from_hub(
    hub_endpoint: &str,
    repo: &HubRepo,
    file_hash_hex: &str,
    dest: &Path,
    range: Option<FileRange>,
) -> Result<u64> {
    let hub_token = hub_token_from_env();
    let read_token = fetch_xet_read_token(hub_endpoint, repo, hub_token.as_deref()).await?;

    let auth = AuthConfig::maybe_new(Some(read_token.access_token), Some(read_token.exp));
    let downloader = FileDownloader::new(&read_token.cas_url, &auth)?;

    let file_hash = CasHash::from_hex(file_hash_hex)?;
    smudge_file(&downloader, &file_hash, dest, range).await
}

/// Hydrates a single file to disk, creating parent directories as needed.
async fn smudge_file(
    downloader: &FileDownloader,
    file_hash: &CasHash,
    dest: &Path,
    range: Option<FileRange>,
) -> Result<u64> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let written = downloader
        .download_file_from_hash(file_hash, DataOutput::write_in_file(dest), range)
        .await?;

    info!(%file_hash, dest = %dest.display(), written, "File download complete");
    Ok(written)
}
