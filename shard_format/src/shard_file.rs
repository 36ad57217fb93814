use std::io::{Read, Seek, SeekFrom, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use xethash::{with_chunk_key, CasHash};

use crate::error::{Result, ShardFormatError};
use crate::structs::{
    CasChunkSequenceEntry, CasChunkSequenceHeader, FileDataSequenceEntry, FileDataSequenceHeader,
    FileMetadataExt, FileVerificationEntry, ShardCasInfo, ShardFileInfo, ShardFooter, ShardHeader,
    SHARD_FOOTER_SIZE, SHARD_HEADER_SIZE,
};

/// Where a chunk lives: which xorb, at what physical offset, and how many
/// unpacked bytes it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLocation {
    pub chunk_hash: CasHash,
    pub xorb_hash: CasHash,
    pub byte_offset: u32,
    pub size: u32,
}

/// Incremental shard writer.
///
/// File-info and cas-info groups accumulate in two growing byte buffers;
/// [`serialize`](ShardBuilder::serialize) lays them out with their bookends,
/// records the section offsets in the footer and appends it.
#[derive(Default)]
pub struct ShardBuilder {
    file_info: Vec<u8>,
    cas_info: Vec<u8>,
    chunk_hash_hmac_key: [u8; 32],
    key_expiry: u64,
}

impl ShardBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables keyed protection: chunk hashes added after this call are
    /// stored transformed under `key`.
    pub fn with_chunk_hmac_key(mut self, key: [u8; 32], key_expiry: u64) -> Self {
        self.chunk_hash_hmac_key = key;
        self.key_expiry = key_expiry;
        self
    }

    /// Appends a file-info group: header plus one entry per segment.
    pub fn add_file_info(&mut self, file_hash: &CasHash, segments: &[FileDataSequenceEntry]) -> Result<()> {
        self.add_file_info_full(&ShardFileInfo {
            metadata: FileDataSequenceHeader::new(*file_hash, segments.len(), false, false),
            segments: segments.to_vec(),
            verification: Vec::new(),
            metadata_ext: None,
        })
    }

    /// Appends a file-info group with optional verification and metadata-ext
    /// records. The header flags must agree with the records present.
    pub fn add_file_info_full(&mut self, info: &ShardFileInfo) -> Result<()> {
        let metadata = &info.metadata;
        if metadata.num_entries as usize != info.segments.len() {
            return Err(ShardFormatError::FormatError(anyhow::anyhow!(
                "file info header declares {} entries, got {}",
                metadata.num_entries,
                info.segments.len()
            )));
        }
        if metadata.has_verification() && info.verification.len() != info.segments.len() {
            return Err(ShardFormatError::FormatError(anyhow::anyhow!(
                "verification entries must match segment count"
            )));
        }

        metadata.serialize(&mut self.file_info)?;
        for segment in &info.segments {
            segment.serialize(&mut self.file_info)?;
        }
        if metadata.has_verification() {
            for v in &info.verification {
                v.serialize(&mut self.file_info)?;
            }
        }
        if metadata.has_metadata_ext() {
            let ext = info.metadata_ext.as_ref().ok_or_else(|| {
                ShardFormatError::FormatError(anyhow::anyhow!("metadata-ext flag set without a record"))
            })?;
            ext.serialize(&mut self.file_info)?;
        }
        Ok(())
    }

    /// Appends a cas-info group: the xorb's chunk descriptors, with chunk
    /// hashes transformed under the shard key when one is set.
    pub fn add_cas_info(
        &mut self,
        xorb_hash: &CasHash,
        chunks: &[CasChunkSequenceEntry],
        num_bytes_in_xorb: u32,
        num_bytes_on_disk: u32,
    ) -> Result<()> {
        let header = CasChunkSequenceHeader::new(*xorb_hash, chunks.len(), num_bytes_in_xorb, num_bytes_on_disk);
        header.serialize(&mut self.cas_info)?;

        for chunk in chunks {
            let stored = CasChunkSequenceEntry {
                chunk_hash: with_chunk_key(&chunk.chunk_hash, &self.chunk_hash_hmac_key),
                ..*chunk
            };
            stored.serialize(&mut self.cas_info)?;
        }
        Ok(())
    }

    /// Writes out the complete shard.
    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let bookend_len = 48;
        let file_info_offset = SHARD_HEADER_SIZE as u64;
        let cas_info_offset = file_info_offset + self.file_info.len() as u64 + bookend_len;
        let footer_offset = cas_info_offset + self.cas_info.len() as u64 + bookend_len;

        ShardHeader::default().serialize(writer)?;

        writer.write_all(&self.file_info)?;
        FileDataSequenceHeader::bookend().serialize(writer)?;

        writer.write_all(&self.cas_info)?;
        CasChunkSequenceHeader::bookend().serialize(writer)?;

        let creation_timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let footer = ShardFooter {
            file_info_offset,
            cas_info_offset,
            chunk_hash_hmac_key: self.chunk_hash_hmac_key,
            creation_timestamp,
            key_expiry: self.key_expiry,
            footer_offset,
            ..Default::default()
        };
        footer.serialize(writer)?;

        Ok(footer_offset as usize + SHARD_FOOTER_SIZE)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.serialize(&mut out)?;
        Ok(out)
    }
}

/// Reader over a serialized shard.
///
/// `open` validates header and footer; the section accessors then walk the
/// 48-byte records between the recorded offsets and their bookends.
pub struct ShardReader {
    pub header: ShardHeader,
    pub footer: ShardFooter,
}

impl ShardReader {
    pub fn open<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        reader.seek(SeekFrom::Start(0))?;
        let header = ShardHeader::deserialize(reader)?;

        let total_len = reader.seek(SeekFrom::End(0))?;
        if total_len < (SHARD_HEADER_SIZE + SHARD_FOOTER_SIZE) as u64 {
            return Err(ShardFormatError::Truncated);
        }

        reader.seek(SeekFrom::End(-(SHARD_FOOTER_SIZE as i64)))?;
        let footer = ShardFooter::deserialize(reader)?;

        if footer.footer_offset != total_len - SHARD_FOOTER_SIZE as u64
            || footer.file_info_offset > footer.cas_info_offset
            || footer.cas_info_offset > footer.footer_offset
        {
            return Err(ShardFormatError::FormatError(anyhow::anyhow!(
                "shard footer offsets are inconsistent"
            )));
        }

        Ok(Self { header, footer })
    }

    /// True when the shard's chunk hashes are stored under keyed protection.
    pub fn has_chunk_hmac_key(&self) -> bool {
        self.footer.chunk_hash_hmac_key.iter().any(|b| *b != 0)
    }

    /// Reads all file-info groups in section order.
    pub fn read_file_info<R: Read + Seek>(&self, reader: &mut R) -> Result<Vec<ShardFileInfo>> {
        reader.seek(SeekFrom::Start(self.footer.file_info_offset))?;

        let mut out = Vec::new();
        loop {
            let metadata = FileDataSequenceHeader::deserialize(reader)?;
            if metadata.is_bookend() {
                return Ok(out);
            }

            let mut segments = Vec::with_capacity(metadata.num_entries as usize);
            for _ in 0..metadata.num_entries {
                segments.push(FileDataSequenceEntry::deserialize(reader)?);
            }

            let mut verification = Vec::new();
            if metadata.has_verification() {
                for _ in 0..metadata.num_entries {
                    verification.push(FileVerificationEntry::deserialize(reader)?);
                }
            }

            let metadata_ext = if metadata.has_metadata_ext() {
                Some(FileMetadataExt::deserialize(reader)?)
            } else {
                None
            };

            out.push(ShardFileInfo {
                metadata,
                segments,
                verification,
                metadata_ext,
            });
        }
    }

    /// Looks up a single file's reconstruction metadata by file hash.
    pub fn get_file_info<R: Read + Seek>(&self, reader: &mut R, file_hash: &CasHash) -> Result<Option<ShardFileInfo>> {
        Ok(self.read_file_info(reader)?.into_iter().find(|fi| fi.metadata.file_hash == *file_hash))
    }

    /// Reads all cas-info groups in section order.
    pub fn read_cas_info<R: Read + Seek>(&self, reader: &mut R) -> Result<Vec<ShardCasInfo>> {
        reader.seek(SeekFrom::Start(self.footer.cas_info_offset))?;

        let mut out = Vec::new();
        loop {
            let metadata = CasChunkSequenceHeader::deserialize(reader)?;
            if metadata.is_bookend() {
                return Ok(out);
            }

            let mut chunks = Vec::with_capacity(metadata.num_entries as usize);
            for _ in 0..metadata.num_entries {
                chunks.push(CasChunkSequenceEntry::deserialize(reader)?);
            }

            out.push(ShardCasInfo { metadata, chunks });
        }
    }

    /// Walks the cas-info section and emits one [`ChunkLocation`] per chunk
    /// descriptor, in section order.
    pub fn parse_cas_info<R: Read + Seek>(&self, reader: &mut R) -> Result<Vec<ChunkLocation>> {
        let mut out = Vec::new();
        for cas in self.read_cas_info(reader)? {
            for chunk in &cas.chunks {
                out.push(ChunkLocation {
                    chunk_hash: chunk.chunk_hash,
                    xorb_hash: cas.metadata.xorb_hash,
                    byte_offset: chunk.chunk_byte_range_start,
                    size: chunk.unpacked_segment_bytes,
                });
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use xethash::compute_data_hash;

    use super::*;

    fn test_hash(tag: u8) -> CasHash {
        compute_data_hash(&[tag])
    }

    fn build_basic_shard() -> ShardBuilder {
        let mut builder = ShardBuilder::new();

        builder
            .add_file_info(
                &test_hash(1),
                &[
                    FileDataSequenceEntry::new(test_hash(10), 1000, 0, 3),
                    FileDataSequenceEntry::new(test_hash(11), 500, 1, 2),
                ],
            )
            .unwrap();

        builder
            .add_cas_info(
                &test_hash(10),
                &[
                    CasChunkSequenceEntry::new(test_hash(20), 0, 400),
                    CasChunkSequenceEntry::new(test_hash(21), 408, 300),
                    CasChunkSequenceEntry::new(test_hash(22), 716, 300),
                ],
                1000,
                1024,
            )
            .unwrap();
        builder
            .add_cas_info(&test_hash(11), &[CasChunkSequenceEntry::new(test_hash(23), 0, 500)], 500, 516)
            .unwrap();

        builder
    }

    #[test]
    fn test_shard_round_trip() {
        let bytes = build_basic_shard().to_bytes().unwrap();

        let mut cursor = Cursor::new(&bytes);
        let shard = ShardReader::open(&mut cursor).unwrap();
        assert!(!shard.has_chunk_hmac_key());

        let files = shard.read_file_info(&mut cursor).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].metadata.file_hash, test_hash(1));
        assert_eq!(files[0].segments.len(), 2);
        assert_eq!(files[0].segments[0].chunk_index_end, 3);
        assert!(files[0].verification.is_empty());
        assert!(files[0].metadata_ext.is_none());

        let cas = shard.read_cas_info(&mut cursor).unwrap();
        assert_eq!(cas.len(), 2);
        assert_eq!(cas[0].metadata.num_bytes_on_disk, 1024);
        assert_eq!(cas[0].chunks.len(), 3);
    }

    #[test]
    fn test_parse_cas_info_locations() {
        let bytes = build_basic_shard().to_bytes().unwrap();

        let mut cursor = Cursor::new(&bytes);
        let shard = ShardReader::open(&mut cursor).unwrap();
        let locations = shard.parse_cas_info(&mut cursor).unwrap();

        assert_eq!(locations.len(), 4);
        assert_eq!(
            locations[1],
            ChunkLocation {
                chunk_hash: test_hash(21),
                xorb_hash: test_hash(10),
                byte_offset: 408,
                size: 300,
            }
        );
        assert_eq!(locations[3].xorb_hash, test_hash(11));
    }

    #[test]
    fn test_file_lookup() {
        let bytes = build_basic_shard().to_bytes().unwrap();
        let mut cursor = Cursor::new(&bytes);
        let shard = ShardReader::open(&mut cursor).unwrap();

        assert!(shard.get_file_info(&mut cursor, &test_hash(1)).unwrap().is_some());
        assert!(shard.get_file_info(&mut cursor, &test_hash(99)).unwrap().is_none());
    }

    #[test]
    fn test_verification_and_metadata_ext_round_trip() {
        let mut builder = ShardBuilder::new();
        let segments = vec![FileDataSequenceEntry::new(test_hash(10), 100, 0, 1)];
        let info = ShardFileInfo {
            metadata: FileDataSequenceHeader::new(test_hash(1), 1, true, true),
            segments,
            verification: vec![FileVerificationEntry::new(test_hash(40))],
            metadata_ext: Some(FileMetadataExt::new(test_hash(41))),
        };
        builder.add_file_info_full(&info).unwrap();

        let bytes = builder.to_bytes().unwrap();
        let mut cursor = Cursor::new(&bytes);
        let shard = ShardReader::open(&mut cursor).unwrap();
        let files = shard.read_file_info(&mut cursor).unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0], info);
    }

    #[test]
    fn test_hmac_key_transforms_chunk_hashes() {
        let key = [5u8; 32];
        let mut builder = ShardBuilder::new().with_chunk_hmac_key(key, 12345);
        builder
            .add_cas_info(&test_hash(10), &[CasChunkSequenceEntry::new(test_hash(20), 0, 100)], 100, 116)
            .unwrap();

        let bytes = builder.to_bytes().unwrap();
        let mut cursor = Cursor::new(&bytes);
        let shard = ShardReader::open(&mut cursor).unwrap();

        assert!(shard.has_chunk_hmac_key());
        assert_eq!(shard.footer.chunk_hash_hmac_key, key);
        assert_eq!(shard.footer.key_expiry, 12345);

        let locations = shard.parse_cas_info(&mut cursor).unwrap();
        assert_eq!(locations[0].chunk_hash, with_chunk_key(&test_hash(20), &key));
        assert_ne!(locations[0].chunk_hash, test_hash(20));
    }

    #[test]
    fn test_empty_shard_round_trip() {
        let bytes = ShardBuilder::new().to_bytes().unwrap();
        let mut cursor = Cursor::new(&bytes);
        let shard = ShardReader::open(&mut cursor).unwrap();
        assert!(shard.read_file_info(&mut cursor).unwrap().is_empty());
        assert!(shard.read_cas_info(&mut cursor).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_shard_rejected() {
        let bytes = build_basic_shard().to_bytes().unwrap();

        // Too short for header + footer.
        let mut cursor = Cursor::new(&bytes[..100]);
        assert!(matches!(ShardReader::open(&mut cursor), Err(ShardFormatError::Truncated)));

        // Footer offsets no longer line up once the tail is cut off.
        let cut = bytes.len() - 60;
        let mut cursor = Cursor::new(&bytes[..cut]);
        assert!(ShardReader::open(&mut cursor).is_err());
    }

    #[test]
    fn test_mismatched_entry_count_rejected() {
        let mut builder = ShardBuilder::new();
        let info = ShardFileInfo {
            metadata: FileDataSequenceHeader::new(test_hash(1), 2, false, false),
            segments: vec![FileDataSequenceEntry::new(test_hash(10), 100, 0, 1)],
            verification: Vec::new(),
            metadata_ext: None,
        };
        assert!(builder.add_file_info_full(&info).is_err());
    }
}
