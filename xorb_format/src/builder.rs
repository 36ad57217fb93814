use chunking::MAX_XORB_BYTES;
use xethash::{build_merkle_root, compute_data_hash, CasHash, MerkleNode};

use crate::chunk_header::{XorbChunkHeader, XORB_CHUNK_HEADER_SIZE};
use crate::compression::{compress_chunk_data, CompressionScheme};
use crate::error::{Result, XorbFormatError};

/// Incremental xorb writer.
///
/// Chunks are accepted until the size estimate (header plus raw payload per
/// chunk) would pass [`MAX_XORB_BYTES`]; the estimate uses the uncompressed
/// length since compression may fall back to a verbatim copy.
pub struct XorbBuilder {
    chunks: Vec<(CasHash, Vec<u8>)>,
    estimated_size: usize,
    scheme: CompressionScheme,
}

/// A fully serialized xorb plus the index data callers need to address its
/// chunks: per-chunk physical offsets and unpacked sizes.
#[derive(Debug, Clone)]
pub struct SerializedXorb {
    pub hash: CasHash,
    pub data: Vec<u8>,
    /// Physical start offset of chunk `i`, with a final entry at the total
    /// serialized length.
    pub chunk_byte_offsets: Vec<u32>,
    pub unpacked_chunk_sizes: Vec<u32>,
    pub chunk_hashes: Vec<CasHash>,
    pub raw_num_bytes: u64,
}

impl SerializedXorb {
    pub fn num_chunks(&self) -> u32 {
        self.chunk_hashes.len() as u32
    }

    /// Physical byte span of the chunk range `[start, end)`.
    pub fn byte_span(&self, start: u32, end: u32) -> Result<(u32, u32)> {
        if start >= end || end > self.num_chunks() {
            return Err(XorbFormatError::InvalidRange);
        }
        Ok((self.chunk_byte_offsets[start as usize], self.chunk_byte_offsets[end as usize]))
    }
}

impl XorbBuilder {
    pub fn new(scheme: CompressionScheme) -> Self {
        Self {
            chunks: Vec::new(),
            estimated_size: 0,
            scheme,
        }
    }

    pub fn num_chunks(&self) -> u32 {
        self.chunks.len() as u32
    }

    pub fn raw_num_bytes(&self) -> u64 {
        self.chunks.iter().map(|(_, d)| d.len() as u64).sum()
    }

    /// Adds a chunk, or returns `false` leaving the builder unchanged when
    /// the xorb is full.
    pub fn add_chunk(&mut self, data: Vec<u8>) -> bool {
        let added = XORB_CHUNK_HEADER_SIZE + data.len();
        if self.estimated_size + added > MAX_XORB_BYTES {
            return false;
        }

        self.estimated_size += added;
        self.chunks.push((compute_data_hash(&data), data));
        true
    }

    /// The xorb's identity: the merkle root over its chunk hashes and sizes.
    pub fn xorb_hash(&self) -> CasHash {
        let leaves: Vec<MerkleNode> = self
            .chunks
            .iter()
            .map(|(hash, data)| MerkleNode::new(*hash, data.len() as u64))
            .collect();
        build_merkle_root(&leaves)
    }

    /// Compresses and serializes all chunks into the final container bytes.
    pub fn serialize(self) -> Result<SerializedXorb> {
        if self.chunks.is_empty() {
            return Err(XorbFormatError::EmptyXorb);
        }

        let hash = self.xorb_hash();
        let raw_num_bytes = self.raw_num_bytes();

        let mut data = Vec::with_capacity(self.estimated_size);
        let mut chunk_byte_offsets = Vec::with_capacity(self.chunks.len() + 1);
        let mut unpacked_chunk_sizes = Vec::with_capacity(self.chunks.len());
        let mut chunk_hashes = Vec::with_capacity(self.chunks.len());

        for (chunk_hash, chunk_data) in &self.chunks {
            chunk_byte_offsets.push(data.len() as u32);

            let (payload, scheme) = compress_chunk_data(chunk_data, self.scheme)?;
            let header = XorbChunkHeader::new(scheme, payload.len() as u32, chunk_data.len() as u32)?;
            data.extend_from_slice(&header.to_bytes());
            data.extend_from_slice(&payload);

            unpacked_chunk_sizes.push(chunk_data.len() as u32);
            chunk_hashes.push(*chunk_hash);
        }
        chunk_byte_offsets.push(data.len() as u32);

        Ok(SerializedXorb {
            hash,
            data,
            chunk_byte_offsets,
            unpacked_chunk_sizes,
            chunk_hashes,
            raw_num_bytes,
        })
    }
}
