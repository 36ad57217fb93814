//! Content-defined chunking.
//!
//! Splits byte streams into variable-size chunks with a gear rolling hash.
//! Identical input always produces identical boundaries, and a local edit
//! only disturbs the chunks around it, which is what makes chunk-level
//! deduplication effective.

mod chunker;
pub mod constants;

pub use chunker::{chunk_boundaries, split_into_chunks, ChunkBoundary, Chunker};
pub use constants::{gear_table, MAX_CHUNK_SIZE, MAX_XORB_BYTES, MIN_CHUNK_SIZE, TARGET_CHUNK_SIZE};
