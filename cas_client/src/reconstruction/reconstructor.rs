use std::io::Write;
use std::sync::Arc;

use cas_types::{FileRange, ReconstructionInfo};
use tracing::{debug, info};
use xet_config::xet_config;
use xethash::CasHash;

use crate::error::{CasClientError, Result};
use crate::interface::Client;
use crate::reconstruction::output_provider::DataOutput;
use crate::reconstruction::term_fetcher::{ParallelTermFetcher, TermFetchItem};

/// Reconstructs files from their content-addressed chunks.
///
/// Terms are downloaded concurrently by a worker pool, then assembled in
/// strict term order, applying the first-range offset and the requested
/// length so partial-range requests come out byte-exact.
pub struct FileReconstructor {
    client: Arc<dyn Client>,
    num_workers: usize,
    verify_terms: bool,
}

impl FileReconstructor {
    pub fn new(client: &Arc<dyn Client>) -> Self {
        Self {
            client: client.clone(),
            num_workers: xet_config().client.num_download_workers,
            verify_terms: xet_config().reconstruction.verify_terms,
        }
    }

    /// Overrides the worker count (clamped to at least one).
    pub fn with_num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers.max(1);
        self
    }

    pub fn with_term_verification(mut self, verify_terms: bool) -> Self {
        self.verify_terms = verify_terms;
        self
    }

    /// Reconstructs the file (or byte range) into memory, pre-sized from the
    /// term lengths.
    pub async fn reconstruct_to_bytes(&self, file_hash: &CasHash, byte_range: Option<FileRange>) -> Result<Vec<u8>> {
        let (info, results) = self.fetch_terms(file_hash, byte_range).await?;

        let unpacked_sum: u64 = info.terms.iter().map(|t| t.unpacked_length as u64).sum();
        let expected = match byte_range {
            Some(r) => r.length().min(unpacked_sum),
            None => unpacked_sum,
        };

        let mut out = Vec::with_capacity(expected as usize);
        assemble(&info, results, byte_range, &mut out)?;
        Ok(out)
    }

    /// Reconstructs the file (or byte range) into an output sink, streaming
    /// term by term.
    pub async fn reconstruct_to_output(
        &self,
        file_hash: &CasHash,
        byte_range: Option<FileRange>,
        output: DataOutput,
    ) -> Result<u64> {
        let (info, results) = self.fetch_terms(file_hash, byte_range).await?;

        let range_start = byte_range.map(|r| r.start).unwrap_or(0);
        let mut writer = output.into_writer(range_start)?;
        let written = assemble(&info, results, byte_range, &mut writer)?;
        writer.flush()?;
        Ok(written)
    }

    /// Resolves the reconstruction info and downloads all terms.
    async fn fetch_terms(
        &self,
        file_hash: &CasHash,
        byte_range: Option<FileRange>,
    ) -> Result<(ReconstructionInfo, Vec<Vec<u8>>)> {
        if let Some(range) = byte_range {
            if range.start >= range.end {
                return Err(CasClientError::InvalidRange);
            }
        }

        info!(%file_hash, ?byte_range, "Starting file reconstruction");

        let Some(info) = self.client.get_reconstruction(file_hash, byte_range).await? else {
            return Err(CasClientError::ReconstructionUnavailable(*file_hash));
        };

        let items = resolve_terms(&info)?;
        debug!(num_terms = items.len(), "Resolved reconstruction terms");

        let fetcher = ParallelTermFetcher::new(self.num_workers, self.verify_terms);
        let results = fetcher.fetch_all(&self.client, items).await?;

        info!(%file_hash, num_terms = results.len(), "All terms downloaded");
        Ok((info, results))
    }
}

/// Matches each term to the unique fetch-info entry covering its chunk
/// range. Failing to match is a malformed server response, caught before any
/// download starts so errors never leave partial output.
fn resolve_terms(info: &ReconstructionInfo) -> Result<Vec<TermFetchItem>> {
    info.terms
        .iter()
        .enumerate()
        .map(|(index, term)| {
            let candidates = info
                .fetch_info
                .get(&term.hash)
                .ok_or(CasClientError::MissingFetchInfo(term.hash.into()))?;

            let fetch = candidates
                .iter()
                .find(|f| f.range.contains_range(&term.range))
                .ok_or(CasClientError::NoMatchingFetchInfo(term.hash.into()))?;

            Ok(TermFetchItem {
                index,
                term: term.clone(),
                fetch: fetch.clone(),
            })
        })
        .collect()
}

/// Writes the downloaded terms out in term order.
///
/// Whole-file requests check every term against its declared length. Range
/// requests run a skip/take pass: drop `offset_into_first_range` bytes from
/// the front, then copy until the requested length is satisfied.
fn assemble<W: Write + ?Sized>(
    info: &ReconstructionInfo,
    results: Vec<Vec<u8>>,
    byte_range: Option<FileRange>,
    sink: &mut W,
) -> Result<u64> {
    let unpacked_sum: u64 = info.terms.iter().map(|t| t.unpacked_length as u64).sum();
    if info.offset_into_first_range > unpacked_sum {
        return Err(CasClientError::OffsetTooLarge {
            offset: info.offset_into_first_range,
            available: unpacked_sum,
        });
    }

    let mut pending_skip = info.offset_into_first_range;
    let mut remaining = match byte_range {
        Some(range) => range.length(),
        None => unpacked_sum - pending_skip,
    };

    let mut written = 0u64;
    for (index, bytes) in results.into_iter().enumerate() {
        if byte_range.is_none() {
            let expected = info.terms[index].unpacked_length as u64;
            if bytes.len() as u64 != expected {
                return Err(CasClientError::TermSizeMismatch {
                    index,
                    expected,
                    actual: bytes.len() as u64,
                });
            }
        }

        if remaining == 0 {
            break;
        }

        let skip = pending_skip.min(bytes.len() as u64);
        pending_skip -= skip;

        let available = bytes.len() as u64 - skip;
        let take = available.min(remaining);
        sink.write_all(&bytes[skip as usize..(skip + take) as usize])?;

        remaining -= take;
        written += take;
    }

    if remaining > 0 {
        return Err(CasClientError::SizeMismatch(remaining));
    }

    Ok(written)
}
