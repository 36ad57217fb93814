//! The MDB shard format: the metadata index mapping file hashes to xorb
//! chunk-range sequences and xorbs to their chunk descriptors.
//!
//! A shard is `header ‖ file-info section ‖ bookend ‖ cas-info section ‖
//! bookend ‖ footer`. Every record in both sections is exactly 48 bytes and
//! is identified positionally, not by tag: a section is a run of groups,
//! each a header record followed by the entry records it declares, closed by
//! an all-ones bookend record. All multi-byte fields are little-endian.

pub mod error;
mod shard_file;
mod structs;

pub use shard_file::{ChunkLocation, ShardBuilder, ShardReader};
pub use structs::{
    CasChunkSequenceEntry, CasChunkSequenceHeader, FileDataSequenceEntry, FileDataSequenceHeader,
    FileMetadataExt, FileVerificationEntry, ShardCasInfo, ShardFileInfo, ShardFooter, ShardHeader,
    SHARD_FOOTER_SIZE, SHARD_FOOTER_VERSION, SHARD_FORMAT_VERSION, SHARD_HEADER_SIZE, SHARD_MAGIC,
    SHARD_RECORD_SIZE,
};
