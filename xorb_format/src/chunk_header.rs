use crate::compression::CompressionScheme;
use crate::error::{Result, XorbFormatError};

/// Serialized size of a chunk header.
pub const XORB_CHUNK_HEADER_SIZE: usize = 8;

/// The only chunk format version currently defined.
pub const XORB_FORMAT_VERSION: u8 = 0;

/// Both size fields are 24-bit.
const U24_MAX: u32 = 0xFF_FFFF;

/// The fixed 8-byte header preceding each chunk payload.
///
/// Layout:
/// - byte 0: format version
/// - bytes 1..4: compressed payload size, little-endian u24
/// - byte 4: compression scheme tag
/// - bytes 5..8: uncompressed size, little-endian u24
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XorbChunkHeader {
    pub version: u8,
    pub compressed_size: u32,
    pub scheme: CompressionScheme,
    pub uncompressed_size: u32,
}

impl XorbChunkHeader {
    pub fn new(scheme: CompressionScheme, compressed_size: u32, uncompressed_size: u32) -> Result<Self> {
        if compressed_size > U24_MAX {
            return Err(XorbFormatError::ChunkSizeTooLarge(compressed_size as usize));
        }
        if uncompressed_size > U24_MAX {
            return Err(XorbFormatError::ChunkSizeTooLarge(uncompressed_size as usize));
        }

        Ok(Self {
            version: XORB_FORMAT_VERSION,
            compressed_size,
            scheme,
            uncompressed_size,
        })
    }

    pub fn to_bytes(&self) -> [u8; XORB_CHUNK_HEADER_SIZE] {
        let mut buf = [0u8; XORB_CHUNK_HEADER_SIZE];
        buf[0] = self.version;
        buf[1..4].copy_from_slice(&self.compressed_size.to_le_bytes()[..3]);
        buf[4] = self.scheme as u8;
        buf[5..8].copy_from_slice(&self.uncompressed_size.to_le_bytes()[..3]);
        buf
    }

    pub fn from_bytes(buf: &[u8; XORB_CHUNK_HEADER_SIZE]) -> Result<Self> {
        let version = buf[0];
        if version != XORB_FORMAT_VERSION {
            return Err(XorbFormatError::UnsupportedVersion(version));
        }

        let compressed_size = u32::from_le_bytes([buf[1], buf[2], buf[3], 0]);
        let scheme = CompressionScheme::try_from(buf[4])?;
        let uncompressed_size = u32::from_le_bytes([buf[5], buf[6], buf[7], 0]);

        // An empty chunk has nothing to compress; a nonzero payload claiming
        // to decompress to nothing is corrupt.
        if uncompressed_size == 0 && compressed_size > 0 {
            return Err(XorbFormatError::FormatError(anyhow::anyhow!(
                "chunk header declares {compressed_size} compressed bytes for an empty chunk"
            )));
        }

        Ok(Self {
            version,
            compressed_size,
            scheme,
            uncompressed_size,
        })
    }
}
