use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShardFormatError {
    #[error("shard format error: {0}")]
    FormatError(anyhow::Error),

    #[error("shard data truncated")]
    Truncated,

    #[error("unsupported shard format version {0}")]
    UnsupportedVersion(u64),

    #[error("I/O error: {0}")]
    IoError(std::io::Error),
}

pub type Result<T> = std::result::Result<T, ShardFormatError>;

impl From<std::io::Error> for ShardFormatError {
    fn from(e: std::io::Error) -> Self {
        // A short read while walking fixed-size records means the shard was
        // cut off, which callers treat differently from an I/O fault.
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ShardFormatError::Truncated
        } else {
            ShardFormatError::IoError(e)
        }
    }
}
