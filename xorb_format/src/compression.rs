use std::fmt;
use std::io::{Read, Write};

use lz4_flex::frame::{FrameDecoder, FrameEncoder};

use crate::byte_grouping::{apply_byte_grouping, reverse_byte_grouping};
use crate::bitslice::{apply_full_bitslice, reverse_full_bitslice};
use crate::error::{Result, XorbFormatError};

/// Per-chunk compression scheme, identified by the single-byte tag stored in
/// the chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum CompressionScheme {
    #[default]
    None = 0,
    LZ4 = 1,
    ByteGrouping4LZ4 = 2,
    FullBitsliceLZ4 = 3,
}

impl TryFrom<u8> for CompressionScheme {
    type Error = XorbFormatError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(CompressionScheme::None),
            1 => Ok(CompressionScheme::LZ4),
            2 => Ok(CompressionScheme::ByteGrouping4LZ4),
            3 => Ok(CompressionScheme::FullBitsliceLZ4),
            _ => Err(XorbFormatError::UnknownCompressionScheme(tag)),
        }
    }
}

impl fmt::Display for CompressionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompressionScheme::None => "none",
            CompressionScheme::LZ4 => "lz4",
            CompressionScheme::ByteGrouping4LZ4 => "bg4-lz4",
            CompressionScheme::FullBitsliceLZ4 => "bitslice-lz4",
        };
        write!(f, "{s}")
    }
}

fn lz4_frame_compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = FrameEncoder::new(Vec::with_capacity(data.len() / 2 + 64));
    encoder
        .write_all(data)
        .map_err(|e| XorbFormatError::CompressionFailed(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| XorbFormatError::CompressionFailed(e.to_string()))
}

fn lz4_frame_decompress(data: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(uncompressed_size);
    FrameDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| XorbFormatError::DecompressionFailed(e.to_string()))?;

    if out.len() != uncompressed_size {
        return Err(XorbFormatError::DecompressionFailed(format!(
            "expected {uncompressed_size} bytes, got {}",
            out.len()
        )));
    }
    Ok(out)
}

/// Compresses a chunk under the requested scheme.
///
/// Returns the payload together with the scheme actually used: any scheme
/// that fails to shrink the data falls back to `None` with a verbatim copy,
/// so stored payloads are never larger than the raw chunk.
pub fn compress_chunk_data(data: &[u8], scheme: CompressionScheme) -> Result<(Vec<u8>, CompressionScheme)> {
    let compressed = match scheme {
        CompressionScheme::None => return Ok((data.to_vec(), CompressionScheme::None)),
        CompressionScheme::LZ4 => lz4_frame_compress(data)?,
        CompressionScheme::ByteGrouping4LZ4 => lz4_frame_compress(&apply_byte_grouping(data))?,
        CompressionScheme::FullBitsliceLZ4 => lz4_frame_compress(&apply_full_bitslice(data))?,
    };

    if compressed.len() < data.len() {
        Ok((compressed, scheme))
    } else {
        Ok((data.to_vec(), CompressionScheme::None))
    }
}

/// Decompresses a chunk payload back to exactly `uncompressed_size` bytes.
pub fn decompress_chunk_data(
    payload: &[u8],
    scheme: CompressionScheme,
    uncompressed_size: usize,
) -> Result<Vec<u8>> {
    match scheme {
        CompressionScheme::None => {
            if payload.len() != uncompressed_size {
                return Err(XorbFormatError::DecompressionFailed(format!(
                    "uncompressed chunk is {} bytes, header declares {uncompressed_size}",
                    payload.len()
                )));
            }
            Ok(payload.to_vec())
        },
        CompressionScheme::LZ4 => lz4_frame_decompress(payload, uncompressed_size),
        CompressionScheme::ByteGrouping4LZ4 => {
            let grouped = lz4_frame_decompress(payload, uncompressed_size)?;
            Ok(reverse_byte_grouping(&grouped))
        },
        CompressionScheme::FullBitsliceLZ4 => {
            let sliced = lz4_frame_decompress(payload, uncompressed_size)?;
            Ok(reverse_full_bitslice(&sliced))
        },
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};

    use super::*;

    const ALL_SCHEMES: [CompressionScheme; 4] = [
        CompressionScheme::None,
        CompressionScheme::LZ4,
        CompressionScheme::ByteGrouping4LZ4,
        CompressionScheme::FullBitsliceLZ4,
    ];

    #[test]
    fn test_tag_round_trip() {
        for scheme in ALL_SCHEMES {
            assert_eq!(CompressionScheme::try_from(scheme as u8).unwrap(), scheme);
        }
        assert!(matches!(
            CompressionScheme::try_from(4),
            Err(XorbFormatError::UnknownCompressionScheme(4))
        ));
    }

    #[test]
    fn test_round_trip_compressible_data() {
        // Repetitive data compresses under every LZ4 variant.
        let data: Vec<u8> = (0..32_000u32).flat_map(|i| ((i / 100) as u16).to_le_bytes()).collect();

        for scheme in ALL_SCHEMES {
            let (payload, used) = compress_chunk_data(&data, scheme).unwrap();
            if scheme != CompressionScheme::None {
                assert_eq!(used, scheme, "{scheme} fell back unexpectedly");
                assert!(payload.len() < data.len());
            }
            let restored = decompress_chunk_data(&payload, used, data.len()).unwrap();
            assert_eq!(restored, data);
        }
    }

    #[test]
    fn test_incompressible_data_falls_back_to_none() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(17);
        let mut data = vec![0u8; 4096];
        rng.fill(&mut data[..]);

        for scheme in ALL_SCHEMES {
            let (payload, used) = compress_chunk_data(&data, scheme).unwrap();
            if used == CompressionScheme::None {
                // The fallback carries the input verbatim.
                assert_eq!(payload, data);
            }
            assert!(payload.len() <= data.len());
            assert_eq!(decompress_chunk_data(&payload, used, data.len()).unwrap(), data);
        }
    }

    #[test]
    fn test_round_trip_empty_and_tiny() {
        for scheme in ALL_SCHEMES {
            for data in [&b""[..], &b"x"[..], &b"ab"[..]] {
                let (payload, used) = compress_chunk_data(data, scheme).unwrap();
                assert_eq!(decompress_chunk_data(&payload, used, data.len()).unwrap(), data);
            }
        }
    }

    #[test]
    fn test_none_scheme_requires_exact_length() {
        let (payload, used) = compress_chunk_data(b"hello", CompressionScheme::None).unwrap();
        assert_eq!(used, CompressionScheme::None);
        assert!(matches!(
            decompress_chunk_data(&payload, used, 3),
            Err(XorbFormatError::DecompressionFailed(_))
        ));
    }

    #[test]
    fn test_corrupt_lz4_payload_errors() {
        let data = vec![7u8; 10_000];
        let (mut payload, used) = compress_chunk_data(&data, CompressionScheme::LZ4).unwrap();
        assert_eq!(used, CompressionScheme::LZ4);
        payload.truncate(payload.len() / 2);
        assert!(decompress_chunk_data(&payload, used, data.len()).is_err());
    }
}
