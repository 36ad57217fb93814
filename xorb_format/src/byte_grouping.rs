//! Byte-grouping pre-transform for the `ByteGrouping4LZ4` scheme.
//!
//! Rearranges the buffer into four concatenated groups, group `g` taking the
//! bytes at input indices `4*i + g`. For numeric tensor data this lines up
//! the corresponding bytes of consecutive 4-byte values, which LZ4 then
//! compresses far better than the interleaved original.

/// Number of bytes in the value stride; group `g` collects byte `g` of each
/// 4-byte element.
const BG4_NUM_GROUPS: usize = 4;

fn group_len(n: usize, g: usize) -> usize {
    n / BG4_NUM_GROUPS + usize::from(g < n % BG4_NUM_GROUPS)
}

/// Regroups `data` into the four-group concatenated layout.
///
/// The trailing `n % 4` bytes distribute one each into the lower-indexed
/// groups, so group sizes differ by at most one.
pub fn apply_byte_grouping(data: &[u8]) -> Vec<u8> {
    let n = data.len();
    let mut out = Vec::with_capacity(n);

    for g in 0..BG4_NUM_GROUPS {
        for i in 0..group_len(n, g) {
            out.push(data[BG4_NUM_GROUPS * i + g]);
        }
    }

    out
}

/// Inverse of [`apply_byte_grouping`].
pub fn reverse_byte_grouping(grouped: &[u8]) -> Vec<u8> {
    let n = grouped.len();
    let mut out = vec![0u8; n];

    let mut pos = 0;
    for g in 0..BG4_NUM_GROUPS {
        for i in 0..group_len(n, g) {
            out[BG4_NUM_GROUPS * i + g] = grouped[pos];
            pos += 1;
        }
    }

    out
}
