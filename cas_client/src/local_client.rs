use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use cas_types::{ChunkRange, FetchInfo, FileRange, HttpRange, ReconstructionInfo, ReconstructionTerm};
use shard_format::{
    CasChunkSequenceEntry, FileDataSequenceEntry, FileDataSequenceHeader, FileVerificationEntry,
    ShardBuilder, ShardCasInfo, ShardFileInfo, ShardReader,
};
use tempfile::TempDir;
use tracing::debug;
use xethash::{build_merkle_root, compute_file_hash, compute_verification_hash, CasHash, MerkleNode};
use xorb_format::{CompressionScheme, SerializedXorb, XorbBuilder};

use crate::error::{CasClientError, Result};
use crate::interface::{Client, RangeFetcher};

/// Directory-backed CAS endpoint.
///
/// Xorbs are stored as plain files named by hash; per-file reconstruction
/// metadata is stored as an MDB shard named by file hash and read back to
/// answer `get_reconstruction`, so the shard codec sits on the live download
/// path exactly as it does against a real server.
pub struct LocalClient {
    xorb_dir: PathBuf,
    shard_dir: PathBuf,
    _tmp_dir: Option<TempDir>,
}

/// One uploaded term of a synthetic test file.
pub struct UploadedTerm {
    pub xorb_hash: CasHash,
    pub chunk_range: ChunkRange,
    pub data: Vec<u8>,
}

/// A synthetic file uploaded through [`LocalClient::upload_random_file`].
pub struct RandomFileContents {
    pub file_hash: CasHash,
    pub data: Vec<u8>,
    pub terms: Vec<UploadedTerm>,
}

impl LocalClient {
    /// A local endpoint in a fresh temporary directory, removed on drop.
    pub fn temporary() -> Result<Arc<Self>> {
        let tmp_dir = TempDir::new()?;
        let path = tmp_dir.path().to_owned();
        let mut client = Self::new_internal(&path)?;
        client._tmp_dir = Some(tmp_dir);
        Ok(Arc::new(client))
    }

    /// A local endpoint rooted at `path`, persisting across instances.
    pub fn new(path: impl AsRef<Path>) -> Result<Arc<Self>> {
        Ok(Arc::new(Self::new_internal(path.as_ref())?))
    }

    fn new_internal(path: &Path) -> Result<Self> {
        let xorb_dir = path.join("xorbs");
        let shard_dir = path.join("shards");
        std::fs::create_dir_all(&xorb_dir)?;
        std::fs::create_dir_all(&shard_dir)?;

        Ok(Self {
            xorb_dir,
            shard_dir,
            _tmp_dir: None,
        })
    }

    fn xorb_path(&self, hash: &CasHash) -> PathBuf {
        self.xorb_dir.join(hash.hex())
    }

    fn shard_path(&self, file_hash: &CasHash) -> PathBuf {
        self.shard_dir.join(format!("{}.mdb", file_hash.hex()))
    }

    /// Serializes and stores a xorb, returning its index data.
    pub fn upload_xorb(&self, builder: XorbBuilder) -> Result<SerializedXorb> {
        let serialized = builder.serialize()?;
        std::fs::write(self.xorb_path(&serialized.hash), &serialized.data)?;
        debug!(hash = %serialized.hash, bytes = serialized.data.len(), "stored xorb");
        Ok(serialized)
    }

    /// Builds and uploads a synthetic file from a term specification.
    ///
    /// Each `(xorb_id, (start, end))` entry contributes the chunks
    /// `[start, end)` of the identified xorb, in order; xorbs referenced by
    /// several terms are uploaded once. Chunk payloads are random but
    /// partially compressible so compressed and verbatim chunk records both
    /// occur.
    pub fn upload_random_file(&self, term_spec: &[(u64, (u32, u32))], chunk_size: usize) -> Result<RandomFileContents> {
        self.upload_random_file_with_scheme(term_spec, chunk_size, CompressionScheme::LZ4)
    }

    pub fn upload_random_file_with_scheme(
        &self,
        term_spec: &[(u64, (u32, u32))],
        chunk_size: usize,
        scheme: CompressionScheme,
    ) -> Result<RandomFileContents> {
        use rand::RngCore;

        // Chunks needed per distinct xorb id.
        let mut chunks_needed: HashMap<u64, u32> = HashMap::new();
        for (xorb_id, (start, end)) in term_spec {
            if start >= end {
                return Err(CasClientError::InvalidArguments("empty term chunk range".to_owned()));
            }
            let needed = chunks_needed.entry(*xorb_id).or_default();
            *needed = (*needed).max(*end);
        }

        // Build and store each xorb.
        let mut rng = rand::thread_rng();
        let mut xorbs: HashMap<u64, (SerializedXorb, Vec<Vec<u8>>)> = HashMap::new();
        for (xorb_id, num_chunks) in chunks_needed {
            let chunks: Vec<Vec<u8>> = (0..num_chunks)
                .map(|_| {
                    let mut data = vec![0u8; chunk_size];
                    // Randomize only even positions, leaving runs for the
                    // compressor to find.
                    for i in (0..data.len()).step_by(2) {
                        data[i] = (rng.next_u32() & 0xFF) as u8;
                    }
                    data
                })
                .collect();

            let mut builder = XorbBuilder::new(scheme);
            for chunk in &chunks {
                if !builder.add_chunk(chunk.clone()) {
                    return Err(CasClientError::InvalidArguments("xorb size limit exceeded".to_owned()));
                }
            }
            let serialized = self.upload_xorb(builder)?;
            xorbs.insert(xorb_id, (serialized, chunks));
        }

        // Assemble the file contents and its chunk sequence in file order.
        let mut data = Vec::new();
        let mut terms = Vec::new();
        let mut file_chunks = Vec::new();
        let mut segments = Vec::new();
        for (xorb_id, (start, end)) in term_spec {
            let (serialized, chunks) = &xorbs[xorb_id];

            let mut term_data = Vec::new();
            for chunk_index in *start..*end {
                let chunk = &chunks[chunk_index as usize];
                term_data.extend_from_slice(chunk);
                file_chunks.push(MerkleNode::new(
                    serialized.chunk_hashes[chunk_index as usize],
                    chunk.len() as u64,
                ));
            }

            segments.push(FileDataSequenceEntry::new(
                serialized.hash,
                term_data.len() as u32,
                *start,
                *end,
            ));
            data.extend_from_slice(&term_data);
            terms.push(UploadedTerm {
                xorb_hash: serialized.hash,
                chunk_range: ChunkRange::new(*start, *end),
                data: term_data,
            });
        }

        let file_hash = compute_file_hash(&build_merkle_root(&file_chunks));

        // Register the file and its xorbs in a shard keyed by file hash.
        let mut shard = ShardBuilder::new();
        shard.add_file_info(&file_hash, &segments)?;
        for (serialized, _) in xorbs.values() {
            shard.add_cas_info(
                &serialized.hash,
                &Self::cas_entries(serialized),
                serialized.raw_num_bytes as u32,
                serialized.data.len() as u32,
            )?;
        }
        std::fs::write(self.shard_path(&file_hash), shard.to_bytes()?)?;

        Ok(RandomFileContents {
            file_hash,
            data,
            terms,
        })
    }

    /// Uploads a file through the real ingestion path: content-defined
    /// chunking, xorb packing (splitting at the container size limit), and a
    /// shard carrying one segment per xorb plus verification entries.
    pub fn upload_bytes(&self, data: &[u8], scheme: CompressionScheme) -> Result<RandomFileContents> {
        let chunks = chunking::split_into_chunks(data);
        if chunks.is_empty() {
            return Err(CasClientError::InvalidArguments("cannot upload an empty file".to_owned()));
        }

        // Pack chunks into xorbs, rolling over when a container fills up.
        let mut pending = XorbBuilder::new(scheme);
        let mut pending_chunks: Vec<&[u8]> = Vec::new();
        let mut stored: Vec<(SerializedXorb, Vec<u8>)> = Vec::new();
        for chunk in chunks {
            if !pending.add_chunk(chunk.to_vec()) {
                let full = std::mem::replace(&mut pending, XorbBuilder::new(scheme));
                stored.push((self.upload_xorb(full)?, pending_chunks.concat()));
                pending_chunks.clear();

                if !pending.add_chunk(chunk.to_vec()) {
                    return Err(CasClientError::InternalError("chunk larger than an empty xorb".to_owned()));
                }
            }
            pending_chunks.push(chunk);
        }
        stored.push((self.upload_xorb(pending)?, pending_chunks.concat()));

        // One file segment per xorb, covering all of its chunks.
        let mut shard = ShardBuilder::new();
        let mut file_chunks = Vec::new();
        let mut segments = Vec::new();
        let mut verification = Vec::new();
        let mut terms = Vec::new();
        for (serialized, term_data) in stored {
            let num_chunks = serialized.num_chunks();

            for i in 0..num_chunks as usize {
                file_chunks.push(MerkleNode::new(
                    serialized.chunk_hashes[i],
                    serialized.unpacked_chunk_sizes[i] as u64,
                ));
            }

            segments.push(FileDataSequenceEntry::new(serialized.hash, term_data.len() as u32, 0, num_chunks));
            verification.push(FileVerificationEntry::new(compute_verification_hash(&serialized.chunk_hashes)));

            shard.add_cas_info(
                &serialized.hash,
                &Self::cas_entries(&serialized),
                serialized.raw_num_bytes as u32,
                serialized.data.len() as u32,
            )?;
            terms.push(UploadedTerm {
                xorb_hash: serialized.hash,
                chunk_range: ChunkRange::new(0, num_chunks),
                data: term_data,
            });
        }

        let file_hash = compute_file_hash(&build_merkle_root(&file_chunks));
        shard.add_file_info_full(&ShardFileInfo {
            metadata: FileDataSequenceHeader::new(file_hash, segments.len(), true, false),
            segments,
            verification,
            metadata_ext: None,
        })?;
        std::fs::write(self.shard_path(&file_hash), shard.to_bytes()?)?;

        Ok(RandomFileContents {
            file_hash,
            data: data.to_vec(),
            terms,
        })
    }

    /// Shard chunk descriptors for a serialized xorb.
    fn cas_entries(serialized: &SerializedXorb) -> Vec<CasChunkSequenceEntry> {
        (0..serialized.num_chunks() as usize)
            .map(|i| {
                CasChunkSequenceEntry::new(
                    serialized.chunk_hashes[i],
                    serialized.chunk_byte_offsets[i],
                    serialized.unpacked_chunk_sizes[i],
                )
            })
            .collect()
    }

    /// The physical byte span of chunk range `[start, end)` in a stored
    /// xorb, taken from the shard's cas-info entries.
    fn cas_byte_span(cas: &ShardCasInfo, range: &ChunkRange) -> Result<HttpRange> {
        let num_entries = cas.metadata.num_entries;
        if range.start >= range.end || range.end > num_entries {
            return Err(CasClientError::InvalidRange);
        }

        let start = cas.chunks[range.start as usize].chunk_byte_range_start as u64;
        let end = if range.end == num_entries {
            cas.metadata.num_bytes_on_disk as u64
        } else {
            cas.chunks[range.end as usize].chunk_byte_range_start as u64
        };

        Ok(HttpRange::new(start, end - 1))
    }
}

#[async_trait::async_trait]
impl Client for LocalClient {
    async fn get_reconstruction(
        &self,
        file_hash: &CasHash,
        byte_range: Option<FileRange>,
    ) -> Result<Option<ReconstructionInfo>> {
        let shard_path = self.shard_path(file_hash);
        if !shard_path.exists() {
            return Ok(None);
        }

        let mut reader = File::open(&shard_path)?;
        let shard = ShardReader::open(&mut reader)?;
        let Some(file_info) = shard.get_file_info(&mut reader, file_hash)? else {
            return Ok(None);
        };
        let cas_by_xorb: HashMap<CasHash, ShardCasInfo> = shard
            .read_cas_info(&mut reader)?
            .into_iter()
            .map(|cas| (cas.metadata.xorb_hash, cas))
            .collect();

        let total_len: u64 = file_info.segments.iter().map(|s| s.unpacked_segment_bytes as u64).sum();
        let requested = byte_range.unwrap_or_else(FileRange::full);
        if requested.start >= total_len {
            // Mirrors the 416 behavior of the remote endpoint.
            return Ok(None);
        }

        // Select the segments overlapping the requested range.
        let mut terms = Vec::new();
        let mut offset_into_first_range = 0;
        let mut file_offset = 0u64;
        for segment in &file_info.segments {
            let segment_len = segment.unpacked_segment_bytes as u64;
            let segment_end = file_offset + segment_len;

            if segment_end > requested.start && file_offset < requested.end {
                if terms.is_empty() {
                    offset_into_first_range = requested.start - file_offset;
                }
                terms.push(ReconstructionTerm {
                    hash: segment.xorb_hash.into(),
                    unpacked_length: segment.unpacked_segment_bytes,
                    range: ChunkRange::new(segment.chunk_index_start, segment.chunk_index_end),
                });
            }

            file_offset = segment_end;
            if file_offset >= requested.end {
                break;
            }
        }

        // One fetch-info entry per xorb, covering the union of the chunk
        // ranges its terms need; terms then resolve against a superset range
        // the way they do against a coalescing server.
        let mut spans: HashMap<CasHash, ChunkRange> = HashMap::new();
        for term in &terms {
            let xorb_hash: CasHash = term.hash.into();
            let span = spans.entry(xorb_hash).or_insert(term.range);
            span.start = span.start.min(term.range.start);
            span.end = span.end.max(term.range.end);
        }

        let mut fetch_info = HashMap::new();
        for (xorb_hash, span) in spans {
            let cas = cas_by_xorb
                .get(&xorb_hash)
                .ok_or(CasClientError::MissingFetchInfo(xorb_hash))?;
            let url_range = Self::cas_byte_span(cas, &span)?;
            fetch_info.insert(
                xorb_hash.into(),
                vec![FetchInfo {
                    range: span,
                    url: self.xorb_path(&xorb_hash).to_string_lossy().into_owned(),
                    url_range,
                }],
            );
        }

        Ok(Some(ReconstructionInfo {
            offset_into_first_range,
            terms,
            fetch_info,
        }))
    }

    fn range_fetcher(&self) -> Result<Box<dyn RangeFetcher>> {
        Ok(Box::new(LocalRangeFetcher))
    }
}

/// Serves fetch-info "URLs" that are paths into the local xorb directory.
struct LocalRangeFetcher;

#[async_trait::async_trait]
impl RangeFetcher for LocalRangeFetcher {
    async fn fetch_range(&self, fetch: &FetchInfo) -> Result<Bytes> {
        let mut file = File::open(&fetch.url)?;
        file.seek(SeekFrom::Start(fetch.url_range.start))?;

        let mut buf = vec![0u8; fetch.url_range.length() as usize];
        file.read_exact(&mut buf)?;
        Ok(buf.into())
    }
}
