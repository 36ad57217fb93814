use std::io::{Read, Write};

use utils::serialization_utils::{
    read_bytes, read_hash, read_u32, read_u64, write_bytes, write_hash, write_u32, write_u64,
};
use xethash::CasHash;

use crate::error::{Result, ShardFormatError};

pub const SHARD_HEADER_SIZE: usize = 48;
pub const SHARD_FOOTER_SIZE: usize = 200;
pub const SHARD_RECORD_SIZE: usize = 48;

pub const SHARD_FORMAT_VERSION: u64 = 2;
pub const SHARD_FOOTER_VERSION: u64 = 1;

/// Fixed shard identity tag; the first 32 bytes of every shard.
pub const SHARD_MAGIC: [u8; 32] = [
    b'X', b'E', b'T', b'M', b'D', b'B', b'S', b'H', b'A', b'R', b'D', 0, 129, 216, 145, 61, 7,
    198, 74, 101, 182, 49, 233, 90, 12, 175, 220, 38, 147, 66, 204, 23,
];

/// Hash value of a bookend record closing a section.
const BOOKEND_HASH_BYTES: [u8; 32] = [0xFF; 32];

/// File-info header carries a verification entry per segment.
const FILE_FLAG_WITH_VERIFICATION: u32 = 1 << 31;
/// File-info group ends with a metadata-ext record.
const FILE_FLAG_WITH_METADATA_EXT: u32 = 1 << 30;

/// Fixed-size shard header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardHeader {
    pub magic: [u8; 32],
    pub version: u64,
    pub footer_size: u64,
}

impl Default for ShardHeader {
    fn default() -> Self {
        Self {
            magic: SHARD_MAGIC,
            version: SHARD_FORMAT_VERSION,
            footer_size: SHARD_FOOTER_SIZE as u64,
        }
    }
}

impl ShardHeader {
    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_bytes(writer, &self.magic)?;
        write_u64(writer, self.version)?;
        write_u64(writer, self.footer_size)?;
        Ok(())
    }

    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 32];
        read_bytes(reader, &mut magic)?;
        if magic != SHARD_MAGIC {
            return Err(ShardFormatError::FormatError(anyhow::anyhow!("invalid shard magic tag")));
        }

        let version = read_u64(reader)?;
        if version != SHARD_FORMAT_VERSION {
            return Err(ShardFormatError::UnsupportedVersion(version));
        }

        let footer_size = read_u64(reader)?;
        if footer_size != SHARD_FOOTER_SIZE as u64 {
            return Err(ShardFormatError::FormatError(anyhow::anyhow!(
                "unexpected footer size {footer_size}"
            )));
        }

        Ok(Self {
            magic,
            version,
            footer_size,
        })
    }
}

/// Fixed-size shard footer, written at the very end of the shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardFooter {
    pub version: u64,
    pub file_info_offset: u64,
    pub cas_info_offset: u64,
    /// All-zero means the chunk hashes in the cas-info section are stored
    /// unkeyed.
    pub chunk_hash_hmac_key: [u8; 32],
    pub creation_timestamp: u64,
    pub key_expiry: u64,
    pub footer_offset: u64,
}

impl Default for ShardFooter {
    fn default() -> Self {
        Self {
            version: SHARD_FOOTER_VERSION,
            file_info_offset: 0,
            cas_info_offset: 0,
            chunk_hash_hmac_key: [0u8; 32],
            creation_timestamp: 0,
            key_expiry: 0,
            footer_offset: 0,
        }
    }
}

impl ShardFooter {
    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_u64(writer, self.version)?;
        write_u64(writer, self.file_info_offset)?;
        write_u64(writer, self.cas_info_offset)?;
        write_bytes(writer, &[0u8; 48])?;
        write_bytes(writer, &self.chunk_hash_hmac_key)?;
        write_u64(writer, self.creation_timestamp)?;
        write_u64(writer, self.key_expiry)?;
        write_bytes(writer, &[0u8; 72])?;
        write_u64(writer, self.footer_offset)?;
        Ok(())
    }

    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        let version = read_u64(reader)?;
        if version != SHARD_FOOTER_VERSION {
            return Err(ShardFormatError::UnsupportedVersion(version));
        }

        let file_info_offset = read_u64(reader)?;
        let cas_info_offset = read_u64(reader)?;

        let mut reserved_1 = [0u8; 48];
        read_bytes(reader, &mut reserved_1)?;

        let mut chunk_hash_hmac_key = [0u8; 32];
        read_bytes(reader, &mut chunk_hash_hmac_key)?;

        let creation_timestamp = read_u64(reader)?;
        let key_expiry = read_u64(reader)?;

        let mut reserved_2 = [0u8; 72];
        read_bytes(reader, &mut reserved_2)?;

        let footer_offset = read_u64(reader)?;

        Ok(Self {
            version,
            file_info_offset,
            cas_info_offset,
            chunk_hash_hmac_key,
            creation_timestamp,
            key_expiry,
            footer_offset,
        })
    }
}

/// Opens a file-info group: the file hash plus how many segment entries
/// follow. Doubles as the section bookend when the hash is all ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileDataSequenceHeader {
    pub file_hash: CasHash,
    pub file_flags: u32,
    pub num_entries: u32,
    pub _unused: u64,
}

impl FileDataSequenceHeader {
    pub fn new(file_hash: CasHash, num_entries: usize, with_verification: bool, with_metadata_ext: bool) -> Self {
        let mut file_flags = 0;
        if with_verification {
            file_flags |= FILE_FLAG_WITH_VERIFICATION;
        }
        if with_metadata_ext {
            file_flags |= FILE_FLAG_WITH_METADATA_EXT;
        }
        Self {
            file_hash,
            file_flags,
            num_entries: num_entries as u32,
            _unused: 0,
        }
    }

    pub fn bookend() -> Self {
        Self {
            file_hash: CasHash::from(&BOOKEND_HASH_BYTES),
            ..Default::default()
        }
    }

    pub fn is_bookend(&self) -> bool {
        self.file_hash == CasHash::from(&BOOKEND_HASH_BYTES)
    }

    pub fn has_verification(&self) -> bool {
        self.file_flags & FILE_FLAG_WITH_VERIFICATION != 0
    }

    pub fn has_metadata_ext(&self) -> bool {
        self.file_flags & FILE_FLAG_WITH_METADATA_EXT != 0
    }

    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_hash(writer, &self.file_hash)?;
        write_u32(writer, self.file_flags)?;
        write_u32(writer, self.num_entries)?;
        write_u64(writer, self._unused)?;
        Ok(())
    }

    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            file_hash: read_hash(reader)?,
            file_flags: read_u32(reader)?,
            num_entries: read_u32(reader)?,
            _unused: read_u64(reader)?,
        })
    }
}

/// One segment of a file: a chunk range in a xorb and the number of
/// unpacked bytes it contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileDataSequenceEntry {
    pub xorb_hash: CasHash,
    pub xorb_flags: u32,
    pub unpacked_segment_bytes: u32,
    pub chunk_index_start: u32,
    pub chunk_index_end: u32,
}

impl FileDataSequenceEntry {
    pub fn new(xorb_hash: CasHash, unpacked_segment_bytes: u32, chunk_index_start: u32, chunk_index_end: u32) -> Self {
        Self {
            xorb_hash,
            xorb_flags: 0,
            unpacked_segment_bytes,
            chunk_index_start,
            chunk_index_end,
        }
    }

    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_hash(writer, &self.xorb_hash)?;
        write_u32(writer, self.xorb_flags)?;
        write_u32(writer, self.unpacked_segment_bytes)?;
        write_u32(writer, self.chunk_index_start)?;
        write_u32(writer, self.chunk_index_end)?;
        Ok(())
    }

    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            xorb_hash: read_hash(reader)?,
            xorb_flags: read_u32(reader)?,
            unpacked_segment_bytes: read_u32(reader)?,
            chunk_index_start: read_u32(reader)?,
            chunk_index_end: read_u32(reader)?,
        })
    }
}

/// Range hash proving knowledge of the chunks in the matching segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileVerificationEntry {
    pub range_hash: CasHash,
    pub _unused: [u8; 16],
}

impl FileVerificationEntry {
    pub fn new(range_hash: CasHash) -> Self {
        Self {
            range_hash,
            _unused: [0u8; 16],
        }
    }

    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_hash(writer, &self.range_hash)?;
        write_bytes(writer, &self._unused)?;
        Ok(())
    }

    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        let range_hash = read_hash(reader)?;
        let mut _unused = [0u8; 16];
        read_bytes(reader, &mut _unused)?;
        Ok(Self { range_hash, _unused })
    }
}

/// Optional trailing record of a file-info group carrying the file's sha256.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileMetadataExt {
    pub sha256: CasHash,
    pub _unused: [u8; 16],
}

impl FileMetadataExt {
    pub fn new(sha256: CasHash) -> Self {
        Self {
            sha256,
            _unused: [0u8; 16],
        }
    }

    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_hash(writer, &self.sha256)?;
        write_bytes(writer, &self._unused)?;
        Ok(())
    }

    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        let sha256 = read_hash(reader)?;
        let mut _unused = [0u8; 16];
        read_bytes(reader, &mut _unused)?;
        Ok(Self { sha256, _unused })
    }
}

/// Opens a cas-info group: the xorb hash, how many chunk entries follow, and
/// the xorb's total unpacked and on-disk sizes. Doubles as the section
/// bookend when the hash is all ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CasChunkSequenceHeader {
    pub xorb_hash: CasHash,
    pub xorb_flags: u32,
    pub num_entries: u32,
    pub num_bytes_in_xorb: u32,
    pub num_bytes_on_disk: u32,
}

impl CasChunkSequenceHeader {
    pub fn new(xorb_hash: CasHash, num_entries: usize, num_bytes_in_xorb: u32, num_bytes_on_disk: u32) -> Self {
        Self {
            xorb_hash,
            xorb_flags: 0,
            num_entries: num_entries as u32,
            num_bytes_in_xorb,
            num_bytes_on_disk,
        }
    }

    pub fn bookend() -> Self {
        Self {
            xorb_hash: CasHash::from(&BOOKEND_HASH_BYTES),
            ..Default::default()
        }
    }

    pub fn is_bookend(&self) -> bool {
        self.xorb_hash == CasHash::from(&BOOKEND_HASH_BYTES)
    }

    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_hash(writer, &self.xorb_hash)?;
        write_u32(writer, self.xorb_flags)?;
        write_u32(writer, self.num_entries)?;
        write_u32(writer, self.num_bytes_in_xorb)?;
        write_u32(writer, self.num_bytes_on_disk)?;
        Ok(())
    }

    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            xorb_hash: read_hash(reader)?,
            xorb_flags: read_u32(reader)?,
            num_entries: read_u32(reader)?,
            num_bytes_in_xorb: read_u32(reader)?,
            num_bytes_on_disk: read_u32(reader)?,
        })
    }
}

/// One chunk of a xorb: its hash, physical byte offset in the serialized
/// xorb, and unpacked size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CasChunkSequenceEntry {
    pub chunk_hash: CasHash,
    pub chunk_byte_range_start: u32,
    pub unpacked_segment_bytes: u32,
    pub _unused: u64,
}

impl CasChunkSequenceEntry {
    pub fn new(chunk_hash: CasHash, chunk_byte_range_start: u32, unpacked_segment_bytes: u32) -> Self {
        Self {
            chunk_hash,
            chunk_byte_range_start,
            unpacked_segment_bytes,
            _unused: 0,
        }
    }

    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_hash(writer, &self.chunk_hash)?;
        write_u32(writer, self.chunk_byte_range_start)?;
        write_u32(writer, self.unpacked_segment_bytes)?;
        write_u64(writer, self._unused)?;
        Ok(())
    }

    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            chunk_hash: read_hash(reader)?,
            chunk_byte_range_start: read_u32(reader)?,
            unpacked_segment_bytes: read_u32(reader)?,
            _unused: read_u64(reader)?,
        })
    }
}

/// A parsed file-info group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardFileInfo {
    pub metadata: FileDataSequenceHeader,
    pub segments: Vec<FileDataSequenceEntry>,
    pub verification: Vec<FileVerificationEntry>,
    pub metadata_ext: Option<FileMetadataExt>,
}

/// A parsed cas-info group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardCasInfo {
    pub metadata: CasChunkSequenceHeader,
    pub chunks: Vec<CasChunkSequenceEntry>,
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn serialized_len<F: Fn(&mut Vec<u8>)>(f: F) -> usize {
        let mut buf = Vec::new();
        f(&mut buf);
        buf.len()
    }

    #[test]
    fn test_fixed_sizes() {
        assert_eq!(serialized_len(|b| ShardHeader::default().serialize(b).unwrap()), SHARD_HEADER_SIZE);
        assert_eq!(serialized_len(|b| ShardFooter::default().serialize(b).unwrap()), SHARD_FOOTER_SIZE);

        let h = CasHash::from(&[1u8; 32]);
        assert_eq!(
            serialized_len(|b| FileDataSequenceHeader::new(h, 3, true, true).serialize(b).unwrap()),
            SHARD_RECORD_SIZE
        );
        assert_eq!(
            serialized_len(|b| FileDataSequenceEntry::new(h, 100, 0, 4).serialize(b).unwrap()),
            SHARD_RECORD_SIZE
        );
        assert_eq!(
            serialized_len(|b| FileVerificationEntry::new(h).serialize(b).unwrap()),
            SHARD_RECORD_SIZE
        );
        assert_eq!(serialized_len(|b| FileMetadataExt::new(h).serialize(b).unwrap()), SHARD_RECORD_SIZE);
        assert_eq!(
            serialized_len(|b| CasChunkSequenceHeader::new(h, 2, 1000, 900).serialize(b).unwrap()),
            SHARD_RECORD_SIZE
        );
        assert_eq!(
            serialized_len(|b| CasChunkSequenceEntry::new(h, 0, 512).serialize(b).unwrap()),
            SHARD_RECORD_SIZE
        );
    }

    #[test]
    fn test_record_round_trips() {
        let h = CasHash::from(&[9u8; 32]);

        let header = FileDataSequenceHeader::new(h, 7, true, false);
        let mut buf = Vec::new();
        header.serialize(&mut buf).unwrap();
        let back = FileDataSequenceHeader::deserialize(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(back, header);
        assert!(back.has_verification());
        assert!(!back.has_metadata_ext());

        let entry = FileDataSequenceEntry::new(h, 4096, 2, 9);
        let mut buf = Vec::new();
        entry.serialize(&mut buf).unwrap();
        assert_eq!(FileDataSequenceEntry::deserialize(&mut Cursor::new(&buf)).unwrap(), entry);

        let cas_header = CasChunkSequenceHeader::new(h, 5, 123456, 99999);
        let mut buf = Vec::new();
        cas_header.serialize(&mut buf).unwrap();
        assert_eq!(CasChunkSequenceHeader::deserialize(&mut Cursor::new(&buf)).unwrap(), cas_header);

        let cas_entry = CasChunkSequenceEntry::new(h, 8, 2048);
        let mut buf = Vec::new();
        cas_entry.serialize(&mut buf).unwrap();
        assert_eq!(CasChunkSequenceEntry::deserialize(&mut Cursor::new(&buf)).unwrap(), cas_entry);
    }

    #[test]
    fn test_bookend_detection() {
        assert!(FileDataSequenceHeader::bookend().is_bookend());
        assert!(CasChunkSequenceHeader::bookend().is_bookend());
        assert!(!FileDataSequenceHeader::new(CasHash::default(), 0, false, false).is_bookend());
    }

    #[test]
    fn test_header_rejects_bad_magic() {
        let mut buf = Vec::new();
        ShardHeader::default().serialize(&mut buf).unwrap();
        buf[0] ^= 0xFF;
        assert!(ShardHeader::deserialize(&mut Cursor::new(&buf)).is_err());
    }

    #[test]
    fn test_header_rejects_bad_version() {
        let mut header = ShardHeader::default();
        header.version = 99;
        let mut buf = Vec::new();
        header.serialize(&mut buf).unwrap();
        assert!(matches!(
            ShardHeader::deserialize(&mut Cursor::new(&buf)),
            Err(crate::error::ShardFormatError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_footer_round_trip() {
        let footer = ShardFooter {
            version: SHARD_FOOTER_VERSION,
            file_info_offset: 48,
            cas_info_offset: 480,
            chunk_hash_hmac_key: [7u8; 32],
            creation_timestamp: 1_700_000_000,
            key_expiry: 1_800_000_000,
            footer_offset: 2048,
        };
        let mut buf = Vec::new();
        footer.serialize(&mut buf).unwrap();
        assert_eq!(ShardFooter::deserialize(&mut Cursor::new(&buf)).unwrap(), footer);
    }
}
