//! Variable-branching merkle aggregation.
//!
//! Leaves carry chunk hashes and chunk sizes. Each pass walks the current
//! node list left to right and merges groups of children into parent nodes
//! until one node remains. Group boundaries are content-defined with a mean
//! branching factor of four, which keeps the tree shape stable under
//! insertions the same way content-defined chunking keeps chunk boundaries
//! stable under edits.

use std::fmt::Write;

use crate::keys::compute_internal_node_hash;
use crate::CasHash;

/// Children per merge group: content-defined between these bounds.
const MIN_GROUP_CHILDREN: usize = 2;
const MAX_GROUP_CHILDREN: usize = 9; // 2 * mean + 1
const GROUP_TRIGGER_MODULUS: u64 = 4; // mean branching factor

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MerkleNode {
    pub hash: CasHash,
    pub size: u64,
}

impl MerkleNode {
    pub fn new(hash: CasHash, size: u64) -> Self {
        Self { hash, size }
    }
}

/// Computes the merkle root over an ordered list of leaves.
///
/// An empty list yields the all-zero hash; a single leaf is returned
/// unchanged, so a one-chunk xorb is named by its chunk hash.
pub fn build_merkle_root(leaves: &[MerkleNode]) -> CasHash {
    match leaves {
        [] => CasHash::default(),
        [single] => single.hash,
        _ => {
            let mut level = leaves.to_vec();
            while level.len() > 1 {
                level = merge_level(&level);
            }
            level[0].hash
        },
    }
}

/// Runs one merge pass, producing the next (shorter) level.
fn merge_level(nodes: &[MerkleNode]) -> Vec<MerkleNode> {
    let mut next = Vec::with_capacity(nodes.len() / MIN_GROUP_CHILDREN + 1);

    let mut i = 0;
    while i < nodes.len() {
        let end = group_end(nodes, i);
        next.push(merge_group(&nodes[i..end]));
        i = end;
    }

    next
}

/// Finds the exclusive end index of the group starting at `start`.
///
/// A node whose trailing u64 (little-endian) is divisible by the trigger
/// modulus closes the group, inclusive of itself. Candidates begin at
/// `start + 2` so a triggered group always has more than the minimum two
/// children; with no trigger, the group runs to the maximum width or the end
/// of the list.
fn group_end(nodes: &[MerkleNode], start: usize) -> usize {
    let cap = (start + MAX_GROUP_CHILDREN).min(nodes.len());

    for k in (start + MIN_GROUP_CHILDREN)..cap {
        let tail = &nodes[k].hash.as_bytes()[24..32];
        let trailing = u64::from_le_bytes(tail.try_into().unwrap());
        if trailing % GROUP_TRIGGER_MODULUS == 0 {
            return k + 1;
        }
    }

    cap
}

/// Hashes a group of children into their parent node.
///
/// The hashed buffer is one text line per child: the child's API hex, a
/// " : " separator, and the decimal size.
fn merge_group(children: &[MerkleNode]) -> MerkleNode {
    let mut buffer = String::with_capacity(children.len() * 90);
    let mut size = 0u64;
    for child in children {
        let _ = writeln!(buffer, "{} : {}", child.hash, child.size);
        size += child.size;
    }

    MerkleNode {
        hash: compute_internal_node_hash(buffer.as_bytes()),
        size,
    }
}
