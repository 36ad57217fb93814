use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{ChunkRange, HexCasHash, HttpRange};

/// One term of a file reconstruction: a run of chunks from a single xorb
/// contributing `unpacked_length` bytes to the file, in file order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconstructionTerm {
    pub hash: HexCasHash,
    pub unpacked_length: u32,
    pub range: ChunkRange,
}

/// A presigned download for a chunk range of a xorb.
///
/// `url_range` is the HTTP byte range to request; the chunks of `range` are
/// known to live exactly inside those bytes. `range` may be a superset of any
/// individual term's chunk range when the server coalesces adjacent terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchInfo {
    pub range: ChunkRange,
    pub url: String,
    pub url_range: HttpRange,
}

/// Response of the reconstruction-info endpoint: the ordered terms making up
/// the requested byte range, plus per-xorb download hints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconstructionInfo {
    /// Bytes to discard from the front of the first term's unpacked data
    /// when the requested range starts mid-term.
    #[serde(default)]
    pub offset_into_first_range: u64,

    pub terms: Vec<ReconstructionTerm>,

    /// Keyed by xorb hash in API-hex form.
    pub fetch_info: HashMap<HexCasHash, Vec<FetchInfo>>,
}
