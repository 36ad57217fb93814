//! Full bit-slice pre-transform for the `FullBitsliceLZ4` scheme.
//!
//! Transposes the buffer at the bit level: output bit `k` (counting bit `b`
//! of output byte `o` as `k = 8*o + b`) is bit `k / n` of input byte
//! `k mod n`, for a buffer of `n` bytes. Equivalent to gathering bit-plane 0
//! of every byte, then bit-plane 1, and so on, which exposes long runs when
//! high bits are mostly constant.

/// Applies the bit transpose. The mapping over bit indices `[0, 8n)` is a
/// bijection, so the transform is losslessly invertible for every length.
pub fn apply_full_bitslice(data: &[u8]) -> Vec<u8> {
    let n = data.len();
    let mut out = vec![0u8; n];

    for (o, out_byte) in out.iter_mut().enumerate() {
        let mut byte = 0u8;
        for b in 0..8 {
            let k = 8 * o + b;
            let bit = (data[k % n] >> (k / n)) & 1;
            byte |= bit << b;
        }
        *out_byte = byte;
    }

    out
}

/// Inverse of [`apply_full_bitslice`].
pub fn reverse_full_bitslice(sliced: &[u8]) -> Vec<u8> {
    let n = sliced.len();
    let mut out = vec![0u8; n];

    for (o, in_byte) in sliced.iter().enumerate() {
        for b in 0..8 {
            let k = 8 * o + b;
            let bit = (in_byte >> b) & 1;
            out[k % n] |= bit << (k / n);
        }
    }

    out
}
