//! The xorb container format.
//!
//! A xorb is an unframed concatenation of `(8-byte header, compressed
//! payload)` records, one per chunk, addressed by sequential chunk index.
//! There is no footer or outer framing; readers walk the records from the
//! front. Payloads are independently compressed so any byte range covering
//! whole chunks can be decompressed without the rest of the container.

mod bitslice;
mod builder;
mod byte_grouping;
mod chunk_header;
mod compression;
pub mod error;
mod reader;

pub use bitslice::{apply_full_bitslice, reverse_full_bitslice};
pub use builder::{SerializedXorb, XorbBuilder};
pub use byte_grouping::{apply_byte_grouping, reverse_byte_grouping};
pub use chunk_header::{XorbChunkHeader, XORB_CHUNK_HEADER_SIZE, XORB_FORMAT_VERSION};
pub use compression::{compress_chunk_data, decompress_chunk_data, CompressionScheme};
pub use reader::XorbReader;
