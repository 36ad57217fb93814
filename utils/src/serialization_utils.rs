//! Little-endian read/write helpers shared by the binary format crates.
//!
//! All multi-byte fields in the xorb and shard formats are little-endian;
//! these helpers keep the serializers free of per-field byte juggling.

use std::io::{Read, Write};

use xethash::CasHash;

pub fn write_u8<W: Write>(writer: &mut W, v: u8) -> std::io::Result<()> {
    writer.write_all(&[v])
}

pub fn write_u32<W: Write>(writer: &mut W, v: u32) -> std::io::Result<()> {
    writer.write_all(&v.to_le_bytes())
}

pub fn write_u64<W: Write>(writer: &mut W, v: u64) -> std::io::Result<()> {
    writer.write_all(&v.to_le_bytes())
}

pub fn write_u32s<W: Write>(writer: &mut W, vs: &[u32]) -> std::io::Result<()> {
    for v in vs {
        write_u32(writer, *v)?;
    }
    Ok(())
}

pub fn write_bytes<W: Write>(writer: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    writer.write_all(bytes)
}

pub fn write_hash<W: Write>(writer: &mut W, hash: &CasHash) -> std::io::Result<()> {
    writer.write_all(hash.as_bytes())
}

pub fn read_u8<R: Read>(reader: &mut R) -> std::io::Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub fn read_u32<R: Read>(reader: &mut R) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub fn read_u64<R: Read>(reader: &mut R) -> std::io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

pub fn read_u32s<R: Read>(reader: &mut R, vs: &mut [u32]) -> std::io::Result<()> {
    for v in vs.iter_mut() {
        *v = read_u32(reader)?;
    }
    Ok(())
}

pub fn read_bytes<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<()> {
    reader.read_exact(buf)
}

pub fn read_hash<R: Read>(reader: &mut R) -> std::io::Result<CasHash> {
    let mut buf = [0u8; 32];
    reader.read_exact(&mut buf)?;
    Ok(CasHash::from(&buf))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_round_trip_scalars() {
        let mut buf = Vec::new();
        write_u8(&mut buf, 0xA5).unwrap();
        write_u32(&mut buf, 0xDEADBEEF).unwrap();
        write_u64(&mut buf, 0x0123_4567_89AB_CDEF).unwrap();

        let mut r = Cursor::new(buf);
        assert_eq!(read_u8(&mut r).unwrap(), 0xA5);
        assert_eq!(read_u32(&mut r).unwrap(), 0xDEADBEEF);
        assert_eq!(read_u64(&mut r).unwrap(), 0x0123_4567_89AB_CDEF);
    }

    #[test]
    fn test_round_trip_hash() {
        let h = CasHash::from(&[7u8; 32]);
        let mut buf = Vec::new();
        write_hash(&mut buf, &h).unwrap();
        assert_eq!(buf.len(), 32);

        let mut r = Cursor::new(buf);
        assert_eq!(read_hash(&mut r).unwrap(), h);
    }

    #[test]
    fn test_u32_slice_round_trip() {
        let vals = [1u32, 2, 3, 0xFFFF_FFFF];
        let mut buf = Vec::new();
        write_u32s(&mut buf, &vals).unwrap();

        let mut out = [0u32; 4];
        read_u32s(&mut Cursor::new(buf), &mut out).unwrap();
        assert_eq!(out, vals);
    }
}
