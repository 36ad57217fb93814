use serde::{Deserialize, Serialize};

/// A half-open `[start, end)` range of chunk indices within a xorb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkRange {
    pub start: u32,
    pub end: u32,
}

impl ChunkRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn chunk_count(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// True when `other` lies entirely within this range.
    pub fn contains_range(&self, other: &ChunkRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// A half-open `[start, end)` byte range within a reconstructed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRange {
    pub start: u64,
    pub end: u64,
}

impl FileRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// The range covering any file in its entirety.
    pub fn full() -> Self {
        Self {
            start: 0,
            end: u64::MAX,
        }
    }

    pub fn length(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

/// An HTTP byte range, inclusive on both ends, exactly as it appears in a
/// `Range: bytes={start}-{end}` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HttpRange {
    pub start: u64,
    pub end: u64,
}

impl HttpRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// The `Range` header value for this range.
    pub fn range_header(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

impl From<FileRange> for HttpRange {
    fn from(r: FileRange) -> Self {
        // Exclusive end to inclusive end.
        Self {
            start: r.start,
            end: r.end.saturating_sub(1),
        }
    }
}

impl From<HttpRange> for FileRange {
    fn from(r: HttpRange) -> Self {
        Self {
            start: r.start,
            end: r.end + 1,
        }
    }
}
