/// Smallest chunk the splitter will emit, except for a stream's final tail.
pub const MIN_CHUNK_SIZE: usize = 8 * 1024;

/// Expected mean chunk size given the boundary mask.
pub const TARGET_CHUNK_SIZE: usize = 64 * 1024;

/// Hard upper bound; a cut is forced once a chunk reaches this size.
pub const MAX_CHUNK_SIZE: usize = 128 * 1024;

/// Maximum serialized size of a single xorb.
pub const MAX_XORB_BYTES: usize = 64 * 1024 * 1024;

/// Boundary predicate mask. Sixteen high bits gives a mean chunk size of
/// 2^16 bytes between cut points.
pub(crate) const BOUNDARY_MASK: u64 = 0xFFFF_0000_0000_0000;

/// The gear hash mixes in one table word per input byte; a byte's influence
/// is shifted out of the 64-bit state after this many steps.
pub(crate) const HASH_WINDOW_SIZE: usize = 64;

/// The 256-entry gear table. The table bytes are part of the wire contract:
/// changing them changes every chunk boundary and therefore every hash
/// upstream of them.
pub fn gear_table() -> &'static [u64; 256] {
    &gearhash::DEFAULT_TABLE
}
