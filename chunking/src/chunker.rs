use crate::constants::{gear_table, BOUNDARY_MASK, HASH_WINDOW_SIZE, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};

/// A half-open `[start, end)` range over the input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBoundary {
    pub start: usize,
    pub end: usize,
}

impl ChunkBoundary {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Streaming content-defined chunker.
///
/// Feed bytes with [`process`](Chunker::process); completed boundaries come
/// back in stream order, with absolute offsets. Call
/// [`finish`](Chunker::finish) at end of stream to flush the tail, which may
/// be shorter than the minimum chunk size.
#[derive(Debug)]
pub struct Chunker {
    hash: u64,
    position: usize,
    chunk_start: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker {
    pub fn new() -> Self {
        Self {
            hash: 0,
            position: 0,
            chunk_start: 0,
        }
    }

    /// Consumes a block of input, returning the boundaries completed inside it.
    pub fn process(&mut self, data: &[u8]) -> Vec<ChunkBoundary> {
        let table = gear_table();
        let mut boundaries = Vec::new();

        let mut i = 0;
        while i < data.len() {
            let offset_in_chunk = self.position - self.chunk_start;

            // Bytes this far below the minimum cannot influence the cut
            // decision: the boundary predicate is first evaluated at
            // MIN_CHUNK_SIZE, and the gear state only retains the last
            // HASH_WINDOW_SIZE bytes. Consume them without hashing.
            let hash_start = MIN_CHUNK_SIZE - HASH_WINDOW_SIZE - 1;
            if offset_in_chunk < hash_start {
                let skip = (hash_start - offset_in_chunk).min(data.len() - i);
                self.position += skip;
                i += skip;
                continue;
            }

            self.hash = (self.hash << 1).wrapping_add(table[data[i] as usize]);
            self.position += 1;
            i += 1;

            let chunk_size = self.position - self.chunk_start;
            let cut = if chunk_size >= MAX_CHUNK_SIZE {
                true
            } else if chunk_size < MIN_CHUNK_SIZE {
                false
            } else {
                self.hash & BOUNDARY_MASK == 0
            };

            if cut {
                boundaries.push(ChunkBoundary {
                    start: self.chunk_start,
                    end: self.position,
                });
                self.hash = 0;
                self.chunk_start = self.position;
            }
        }

        boundaries
    }

    /// Flushes the trailing partial chunk, if any.
    pub fn finish(&mut self) -> Option<ChunkBoundary> {
        if self.position > self.chunk_start {
            let tail = ChunkBoundary {
                start: self.chunk_start,
                end: self.position,
            };
            self.hash = 0;
            self.chunk_start = self.position;
            Some(tail)
        } else {
            None
        }
    }
}

/// Chunks a complete buffer, returning the cumulative end offset of each chunk.
pub fn chunk_boundaries(data: &[u8]) -> Vec<usize> {
    let mut chunker = Chunker::new();
    let mut ends: Vec<usize> = chunker.process(data).iter().map(|b| b.end).collect();
    if let Some(tail) = chunker.finish() {
        ends.push(tail.end);
    }
    ends
}

/// Chunks a complete buffer into data slices.
pub fn split_into_chunks(data: &[u8]) -> Vec<&[u8]> {
    let mut out = Vec::new();
    let mut start = 0;
    for end in chunk_boundaries(data) {
        out.push(&data[start..end]);
        start = end;
    }
    out
}
