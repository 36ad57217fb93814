use thiserror::Error;

#[derive(Debug, Error)]
pub enum XorbFormatError {
    #[error("xorb format error: {0}")]
    FormatError(anyhow::Error),

    #[error("invalid chunk range")]
    InvalidRange,

    #[error("chunk range extends past the end of the xorb")]
    RangeOutOfBounds,

    #[error("chunk index {0} not present in xorb")]
    ChunkNotFound(u32),

    #[error("chunk size {0} exceeds the 24-bit header field")]
    ChunkSizeTooLarge(usize),

    #[error("unsupported xorb format version {0}")]
    UnsupportedVersion(u8),

    #[error("unknown compression scheme tag {0}")]
    UnknownCompressionScheme(u8),

    #[error("xorb data truncated mid-record")]
    Truncated,

    #[error("xorb contains no chunks")]
    EmptyXorb,

    #[error("compression failed: {0}")]
    CompressionFailed(String),

    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, XorbFormatError>;
