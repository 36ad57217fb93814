use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use cas_types::{FetchInfo, ReconstructionTerm};
use tokio::task::JoinSet;
use tracing::{debug, trace};
use xethash::compute_data_hash;

use crate::error::{CasClientError, Result};
use crate::interface::{Client, RangeFetcher};

/// One unit of download work: a term, the fetch-info entry resolved for it,
/// and its position in the file's term sequence.
pub(crate) struct TermFetchItem {
    pub index: usize,
    pub term: ReconstructionTerm,
    pub fetch: FetchInfo,
}

/// First-error store shared by the download workers.
///
/// The flag is checked lock-free at every worker iteration; only the first
/// recorded error is kept, later ones are dropped.
struct ErrorState {
    has_error: AtomicBool,
    stored_error: Mutex<Option<CasClientError>>,
}

impl ErrorState {
    fn new() -> Self {
        Self {
            has_error: AtomicBool::new(false),
            stored_error: Mutex::new(None),
        }
    }

    fn is_set(&self) -> bool {
        self.has_error.load(Ordering::Acquire)
    }

    fn set(&self, error: CasClientError) {
        let mut guard = self.stored_error.lock().unwrap();
        if guard.is_none() {
            *guard = Some(error);
            self.has_error.store(true, Ordering::Release);
        }
    }

    fn take(&self) -> Option<CasClientError> {
        self.stored_error.lock().unwrap().take()
    }
}

/// Worker pool downloading and extracting term data.
///
/// Workers pop items off a shared stack and write extracted bytes into the
/// result slot matching each term's original index, so assembly after the
/// join is strictly term-ordered no matter how downloads interleave.
pub(crate) struct ParallelTermFetcher {
    num_workers: usize,
    verify_terms: bool,
}

impl ParallelTermFetcher {
    pub fn new(num_workers: usize, verify_terms: bool) -> Self {
        Self {
            num_workers: num_workers.max(1),
            verify_terms,
        }
    }

    /// Runs all items to completion and returns the per-term extracted
    /// bytes, indexed by term position.
    ///
    /// On failure the first worker error wins: remaining workers stop at
    /// their next iteration, partial results are dropped, and the single
    /// error is returned.
    pub async fn fetch_all(&self, client: &Arc<dyn Client>, items: Vec<TermFetchItem>) -> Result<Vec<Vec<u8>>> {
        let num_items = items.len();
        if num_items == 0 {
            return Ok(Vec::new());
        }

        let queue = Arc::new(Mutex::new(items));
        let results: Arc<Mutex<Vec<Option<Vec<u8>>>>> =
            Arc::new(Mutex::new((0..num_items).map(|_| None).collect()));
        let errors = Arc::new(ErrorState::new());

        let num_workers = self.num_workers.min(num_items);
        debug!(num_items, num_workers, "Starting parallel term fetch");

        let mut workers = JoinSet::new();
        for worker_id in 0..num_workers {
            let client = client.clone();
            let queue = queue.clone();
            let results = results.clone();
            let errors = errors.clone();
            let verify_terms = self.verify_terms;

            workers.spawn(async move {
                // Worker-local fetcher: its own connection pool and state.
                let fetcher = match client.range_fetcher() {
                    Ok(f) => f,
                    Err(e) => {
                        errors.set(e);
                        return;
                    },
                };

                loop {
                    if errors.is_set() {
                        trace!(worker_id, "stopping on shared error flag");
                        return;
                    }

                    let item = { queue.lock().unwrap().pop() };
                    let Some(item) = item else {
                        return;
                    };

                    match process_item(fetcher.as_ref(), &item, verify_terms).await {
                        Ok(bytes) => {
                            results.lock().unwrap()[item.index] = Some(bytes);
                        },
                        Err(e) => {
                            debug!(worker_id, index = item.index, error = %e, "term fetch failed");
                            errors.set(e);
                            return;
                        },
                    }
                }
            });
        }

        while let Some(joined) = workers.join_next().await {
            joined?;
        }

        if let Some(error) = errors.take() {
            return Err(error);
        }

        let slots = Arc::try_unwrap(results)
            .map_err(|_| CasClientError::InternalError("result slots still shared after join".to_owned()))?
            .into_inner()
            .unwrap();

        slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| slot.ok_or(CasClientError::MissingTermResult(i)))
            .collect()
    }
}

/// Downloads one term's byte range and extracts its chunk range.
async fn process_item(fetcher: &dyn RangeFetcher, item: &TermFetchItem, verify: bool) -> Result<Vec<u8>> {
    // The fetch range may cover more chunks than the term; indices into the
    // downloaded bytes are relative to the fetch range's first chunk.
    let local_start = item.term.range.start - item.fetch.range.start;
    let local_end = item.term.range.end - item.fetch.range.start;

    let data = fetcher.fetch_range(&item.fetch).await?;

    let reader = xorb_format::XorbReader::new(&data);
    let bytes = reader.extract_chunk_range(local_start, local_end)?;

    if verify {
        let digest = compute_data_hash(&bytes);
        trace!(index = item.index, %digest, len = bytes.len(), "extracted term digest");
    }

    Ok(bytes)
}
