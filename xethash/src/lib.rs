//! Keyed hashing and hash aggregation for the CAS data model.
//!
//! Every object in the system (chunk, xorb, file) is named by a 32-byte
//! keyed-BLAKE3 hash. Chunk hashes aggregate into xorb and file hashes
//! through a variable-branching merkle construction; the resulting root,
//! hashed once more under the file key, is the file's canonical identity.

mod cas_hash;
mod keys;
mod merkle;

pub use cas_hash::{CasHash, CasHashParseError};
pub use keys::{
    compute_data_hash, compute_file_hash, compute_file_hash_with_salt, compute_internal_node_hash,
    compute_verification_hash, with_chunk_key,
};
pub use merkle::{build_merkle_root, MerkleNode};
