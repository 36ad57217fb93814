use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;

use crate::error::Result;

/// Output sink for reconstructed data.
pub enum DataOutput {
    /// A caller-supplied writer receiving the bytes from position 0.
    SequentialWriter(Box<dyn Write + Send>),

    /// A file path, opened without truncation so concurrent reconstructions
    /// can fill different regions of the same file.
    File {
        path: PathBuf,
        /// Seek here before writing; `None` uses the start of the
        /// reconstructed byte range.
        offset: Option<u64>,
    },
}

impl DataOutput {
    /// File output positioned at the reconstructed range's start.
    pub fn write_in_file(path: impl Into<PathBuf>) -> Self {
        Self::File {
            path: path.into(),
            offset: None,
        }
    }

    /// File output positioned at a fixed offset, regardless of the range
    /// being reconstructed.
    pub fn write_file_at_offset(path: impl Into<PathBuf>, offset: u64) -> Self {
        Self::File {
            path: path.into(),
            offset: Some(offset),
        }
    }

    /// Writer output.
    pub fn writer(writer: impl Write + Send + 'static) -> Self {
        Self::SequentialWriter(Box::new(writer))
    }

    /// Opens the sink for writing. `range_start` is where a `File` sink
    /// without an explicit offset positions itself.
    pub(crate) fn into_writer(self, range_start: u64) -> Result<Box<dyn Write + Send>> {
        match self {
            DataOutput::SequentialWriter(w) => Ok(w),
            DataOutput::File { path, offset } => {
                let mut file = std::fs::OpenOptions::new()
                    .write(true)
                    .truncate(false)
                    .create(true)
                    .open(&path)?;
                file.seek(SeekFrom::Start(offset.unwrap_or(range_start)))?;
                Ok(Box::new(file))
            },
        }
    }
}
