//! Wire types shared between the CAS client, the reconstruction engine and
//! the test servers: ranges, hex-encoded hashes, and the JSON shape of the
//! reconstruction-info endpoint.

mod hex_hash;
mod ranges;
mod reconstruction;

pub use hex_hash::HexCasHash;
pub use ranges::{ChunkRange, FileRange, HttpRange};
pub use reconstruction::{FetchInfo, ReconstructionInfo, ReconstructionTerm};
