//! The four keyed-BLAKE3 hash domains.
//!
//! Separate fixed keys keep chunk data hashes, internal merkle nodes, file
//! identities and verification range hashes in disjoint hash domains, so a
//! value from one domain can never be replayed as another.

use crate::CasHash;

/// Key for hashing raw chunk data.
const DATA_KEY: [u8; 32] = [
    102, 151, 245, 119, 91, 149, 80, 222, 49, 53, 203, 172, 165, 151, 24, 28, 157, 228, 33, 16,
    155, 235, 43, 88, 180, 208, 176, 75, 147, 173, 242, 41,
];

/// Key for hashing the text form of an internal merkle node's children.
const INTERNAL_NODE_KEY: [u8; 32] = [
    1, 126, 197, 199, 165, 71, 41, 150, 253, 148, 102, 102, 180, 138, 2, 230, 93, 221, 83, 111,
    55, 199, 109, 210, 248, 99, 82, 230, 74, 83, 113, 63,
];

/// Key under which a merkle root becomes a file identity.
const FILE_KEY: [u8; 32] = [
    228, 63, 165, 9, 200, 118, 37, 92, 12, 66, 171, 240, 59, 188, 133, 23, 74, 209, 101, 146,
    30, 7, 234, 91, 183, 48, 222, 75, 151, 37, 118, 202,
];

/// Key for range-verification hashes over sequences of chunk hashes.
const VERIFICATION_KEY: [u8; 32] = [
    127, 32, 89, 242, 77, 158, 14, 203, 96, 51, 185, 68, 240, 113, 25, 172, 44, 219, 138, 79,
    161, 10, 227, 94, 133, 56, 201, 112, 63, 180, 41, 246,
];

fn keyed(key: &[u8; 32], data: &[u8]) -> CasHash {
    CasHash::from(blake3::keyed_hash(key, data).as_bytes())
}

/// Hash of a raw data chunk; the chunk's identity within a xorb.
pub fn compute_data_hash(data: &[u8]) -> CasHash {
    keyed(&DATA_KEY, data)
}

/// Hash of an internal merkle node's serialized child list.
pub fn compute_internal_node_hash(buffer: &[u8]) -> CasHash {
    keyed(&INTERNAL_NODE_KEY, buffer)
}

/// The canonical file identity for a merkle root.
pub fn compute_file_hash(merkle_root: &CasHash) -> CasHash {
    compute_file_hash_with_salt(merkle_root, &[0u8; 32])
}

/// File identity under a caller-supplied salt.
///
/// The salt is combined into the file key by xor, so an all-zero salt yields
/// exactly [`compute_file_hash`].
pub fn compute_file_hash_with_salt(merkle_root: &CasHash, salt: &[u8; 32]) -> CasHash {
    let mut key = FILE_KEY;
    for (k, s) in key.iter_mut().zip(salt.iter()) {
        *k ^= s;
    }
    keyed(&key, merkle_root.as_bytes())
}

/// Range hash over an ordered run of chunk hashes, used by shard
/// verification entries to prove knowledge of the chunks in a segment.
pub fn compute_verification_hash(chunk_hashes: &[CasHash]) -> CasHash {
    let mut buffer = Vec::with_capacity(chunk_hashes.len() * 32);
    for h in chunk_hashes {
        buffer.extend_from_slice(h.as_bytes());
    }
    keyed(&VERIFICATION_KEY, &buffer)
}

/// Transforms a chunk hash under a shard's 32-byte chunk key.
///
/// An all-zero key means "no keyed protection" and passes the hash through
/// unchanged; any other key rehashes the hash bytes under that key.
pub fn with_chunk_key(hash: &CasHash, key: &[u8; 32]) -> CasHash {
    if key.iter().all(|b| *b == 0) {
        *hash
    } else {
        keyed(key, hash.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domains_are_disjoint() {
        let data = b"some chunk bytes";
        let h1 = compute_data_hash(data);
        let h2 = compute_internal_node_hash(data);
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_data_hash_deterministic() {
        assert_eq!(compute_data_hash(b"abc"), compute_data_hash(b"abc"));
        assert_ne!(compute_data_hash(b"abc"), compute_data_hash(b"abd"));
    }

    #[test]
    fn test_zero_salt_matches_plain_file_hash() {
        let root = compute_data_hash(b"root");
        assert_eq!(compute_file_hash(&root), compute_file_hash_with_salt(&root, &[0u8; 32]));

        let salt = [3u8; 32];
        assert_ne!(compute_file_hash(&root), compute_file_hash_with_salt(&root, &salt));
    }

    #[test]
    fn test_chunk_key_zero_is_identity() {
        let h = compute_data_hash(b"chunk");
        assert_eq!(with_chunk_key(&h, &[0u8; 32]), h);

        let key = [9u8; 32];
        let keyed = with_chunk_key(&h, &key);
        assert_ne!(keyed, h);
        // Same key, same result.
        assert_eq!(with_chunk_key(&h, &key), keyed);
    }

    #[test]
    fn test_verification_hash_is_order_sensitive() {
        let a = compute_data_hash(b"a");
        let b = compute_data_hash(b"b");
        assert_ne!(compute_verification_hash(&[a, b]), compute_verification_hash(&[b, a]));
    }
}
