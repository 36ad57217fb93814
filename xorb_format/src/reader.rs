use crate::chunk_header::{XorbChunkHeader, XORB_CHUNK_HEADER_SIZE};
use crate::compression::decompress_chunk_data;
use crate::error::{Result, XorbFormatError};

/// Positional reader over serialized xorb bytes.
///
/// The input need not be a whole xorb: any byte range that starts and ends
/// on chunk record boundaries (as produced by a fetch-info byte range)
/// parses the same way, with chunk indices counted from the start of the
/// slice.
pub struct XorbReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> XorbReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Reads the next record's header and the span of its payload, without
    /// decompressing. Returns `None` cleanly at end of input.
    fn next_record(&mut self) -> Result<Option<(XorbChunkHeader, &'a [u8])>> {
        let remaining = self.data.len() - self.pos;
        if remaining == 0 {
            return Ok(None);
        }
        if remaining < XORB_CHUNK_HEADER_SIZE {
            return Err(XorbFormatError::Truncated);
        }

        let mut header_bytes = [0u8; XORB_CHUNK_HEADER_SIZE];
        header_bytes.copy_from_slice(&self.data[self.pos..self.pos + XORB_CHUNK_HEADER_SIZE]);
        let header = XorbChunkHeader::from_bytes(&header_bytes)?;

        let payload_start = self.pos + XORB_CHUNK_HEADER_SIZE;
        let payload_end = payload_start + header.compressed_size as usize;
        if payload_end > self.data.len() {
            return Err(XorbFormatError::Truncated);
        }

        self.pos = payload_end;
        Ok(Some((header, &self.data[payload_start..payload_end])))
    }

    /// Decompresses and returns the next chunk, or `None` at end of input.
    pub fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        match self.next_record()? {
            None => Ok(None),
            Some((header, payload)) => {
                let chunk = decompress_chunk_data(payload, header.scheme, header.uncompressed_size as usize)?;
                Ok(Some(chunk))
            },
        }
    }

    /// Returns chunk `index`, scanning records from the front.
    pub fn get_chunk(&self, index: u32) -> Result<Vec<u8>> {
        let mut cursor = XorbReader::new(self.data);
        let mut i = 0u32;
        while let Some((header, payload)) = cursor.next_record()? {
            if i == index {
                return decompress_chunk_data(payload, header.scheme, header.uncompressed_size as usize);
            }
            i += 1;
        }
        Err(XorbFormatError::ChunkNotFound(index))
    }

    /// Concatenated bytes of the chunks with indices in `[start, end)`.
    ///
    /// Records before the range are skipped without decompression; the scan
    /// stops as soon as the range is complete.
    pub fn extract_chunk_range(&self, start: u32, end: u32) -> Result<Vec<u8>> {
        if start >= end {
            return Err(XorbFormatError::InvalidRange);
        }

        let mut cursor = XorbReader::new(self.data);
        let mut out = Vec::new();
        let mut i = 0u32;
        while let Some((header, payload)) = cursor.next_record()? {
            if i >= start {
                let chunk = decompress_chunk_data(payload, header.scheme, header.uncompressed_size as usize)?;
                out.extend_from_slice(&chunk);
            }
            i += 1;
            if i == end {
                return Ok(out);
            }
        }

        Err(XorbFormatError::RangeOutOfBounds)
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};

    use crate::builder::XorbBuilder;
    use crate::compression::CompressionScheme;

    use super::*;

    fn build_xorb(payloads: &[&[u8]], scheme: CompressionScheme) -> Vec<u8> {
        let mut builder = XorbBuilder::new(scheme);
        for p in payloads {
            assert!(builder.add_chunk(p.to_vec()));
        }
        builder.serialize().unwrap().data
    }

    #[test]
    fn test_three_chunk_round_trip() {
        let data = build_xorb(&[b"Chunk 0", b"Chunk 1", b"Chunk 2"], CompressionScheme::None);
        let reader = XorbReader::new(&data);

        assert_eq!(reader.get_chunk(1).unwrap(), b"Chunk 1");
        assert_eq!(reader.extract_chunk_range(1, 3).unwrap(), b"Chunk 1Chunk 2");
        assert_eq!(reader.extract_chunk_range(0, 3).unwrap(), b"Chunk 0Chunk 1Chunk 2");
    }

    #[test]
    fn test_sequential_reads_match_input() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(21);
        for scheme in [
            CompressionScheme::None,
            CompressionScheme::LZ4,
            CompressionScheme::ByteGrouping4LZ4,
            CompressionScheme::FullBitsliceLZ4,
        ] {
            let chunks: Vec<Vec<u8>> = (0..12)
                .map(|_| {
                    let n = rng.gen_range(1..5000);
                    // Half-compressible content so both code paths get hit.
                    (0..n).map(|i| if i % 2 == 0 { 0 } else { rng.gen() }).collect()
                })
                .collect();

            let refs: Vec<&[u8]> = chunks.iter().map(|c| c.as_slice()).collect();
            let data = build_xorb(&refs, scheme);

            let mut reader = XorbReader::new(&data);
            for expected in &chunks {
                assert_eq!(&reader.next_chunk().unwrap().unwrap(), expected);
            }
            assert!(reader.next_chunk().unwrap().is_none());
        }
    }

    #[test]
    fn test_empty_chunk_round_trip() {
        let data = build_xorb(&[b"", b"after-empty"], CompressionScheme::LZ4);
        let reader = XorbReader::new(&data);
        assert_eq!(reader.get_chunk(0).unwrap(), b"");
        assert_eq!(reader.get_chunk(1).unwrap(), b"after-empty");
    }

    #[test]
    fn test_invalid_range_rejected() {
        let data = build_xorb(&[b"a", b"b", b"c"], CompressionScheme::None);
        let reader = XorbReader::new(&data);
        assert!(matches!(reader.extract_chunk_range(5, 5), Err(XorbFormatError::InvalidRange)));
        assert!(matches!(reader.extract_chunk_range(2, 1), Err(XorbFormatError::InvalidRange)));
    }

    #[test]
    fn test_range_past_end_rejected() {
        let data = build_xorb(&[b"a", b"b", b"c"], CompressionScheme::None);
        let reader = XorbReader::new(&data);
        assert!(matches!(reader.extract_chunk_range(1, 4), Err(XorbFormatError::RangeOutOfBounds)));
        assert!(matches!(reader.get_chunk(3), Err(XorbFormatError::ChunkNotFound(3))));
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let data = build_xorb(&[b"some chunk data here"], CompressionScheme::None);

        // Cut into the payload.
        let reader = XorbReader::new(&data[..data.len() - 3]);
        assert!(matches!(reader.get_chunk(0), Err(XorbFormatError::Truncated)));

        // Cut into the header.
        let reader = XorbReader::new(&data[..4]);
        assert!(matches!(reader.get_chunk(0), Err(XorbFormatError::Truncated)));
    }

    #[test]
    fn test_empty_input_is_clean_eof() {
        let mut reader = XorbReader::new(&[]);
        assert!(reader.next_chunk().unwrap().is_none());
        assert!(matches!(reader.extract_chunk_range(0, 1), Err(XorbFormatError::RangeOutOfBounds)));
    }
}
