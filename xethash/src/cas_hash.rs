use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A 32-byte content hash.
///
/// The wire identity of a hash is its "API hex" form: the 32 bytes are
/// interpreted as four little-endian u64 words, each rendered as 16 lowercase
/// hex digits, most significant nibble first. This is *not* the plain
/// byte-by-byte hex of the buffer, so all parsing and printing goes through
/// [`CasHash::hex`] and [`CasHash::from_hex`].
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CasHash([u8; 32]);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CasHashParseError {
    #[error("hash hex string must be 64 characters, got {0}")]
    InvalidLength(usize),

    #[error("hash hex string contains a non-hex character")]
    InvalidCharacter,
}

impl CasHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn into_bytes(self) -> [u8; 32] {
        self.0
    }

    /// The four little-endian u64 words backing the API-hex rendering.
    pub fn words(&self) -> [u64; 4] {
        let mut words = [0u64; 4];
        for (i, w) in words.iter_mut().enumerate() {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&self.0[i * 8..(i + 1) * 8]);
            *w = u64::from_le_bytes(buf);
        }
        words
    }

    /// Renders the hash in API-hex form (64 lowercase hex characters).
    pub fn hex(&self) -> String {
        let w = self.words();
        format!("{:016x}{:016x}{:016x}{:016x}", w[0], w[1], w[2], w[3])
    }

    /// Parses a hash from its API-hex form.
    pub fn from_hex(hex: &str) -> Result<Self, CasHashParseError> {
        if hex.len() != 64 {
            return Err(CasHashParseError::InvalidLength(hex.len()));
        }
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CasHashParseError::InvalidCharacter);
        }

        let mut bytes = [0u8; 32];
        for i in 0..4 {
            let word = u64::from_str_radix(&hex[i * 16..(i + 1) * 16], 16)
                .map_err(|_| CasHashParseError::InvalidCharacter)?;
            bytes[i * 8..(i + 1) * 8].copy_from_slice(&word.to_le_bytes());
        }
        Ok(Self(bytes))
    }
}

impl From<&[u8; 32]> for CasHash {
    fn from(bytes: &[u8; 32]) -> Self {
        Self(*bytes)
    }
}

impl From<[u8; 32]> for CasHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl FromStr for CasHash {
    type Err = CasHashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for CasHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex())
    }
}

impl fmt::Debug for CasHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex())
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};

    use super::*;

    #[test]
    fn test_hex_round_trip() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        for _ in 0..64 {
            let mut bytes = [0u8; 32];
            rng.fill(&mut bytes);
            let h = CasHash::from(&bytes);

            let hex = h.hex();
            assert_eq!(hex.len(), 64);
            assert!(hex.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
            assert_eq!(CasHash::from_hex(&hex).unwrap(), h);
        }
    }

    #[test]
    fn test_word_ordering() {
        // Byte 0 is the least significant byte of the first word, so it lands
        // at the end of the first 16-char group.
        let mut bytes = [0u8; 32];
        bytes[0] = 0xAB;
        let h = CasHash::from(&bytes);
        assert_eq!(&h.hex()[..16], "00000000000000ab");
    }

    #[test]
    fn test_parse_rejects_bad_length() {
        assert_eq!(CasHash::from_hex("abcd"), Err(CasHashParseError::InvalidLength(4)));
        let long = "0".repeat(65);
        assert_eq!(CasHash::from_hex(&long), Err(CasHashParseError::InvalidLength(65)));
    }

    #[test]
    fn test_parse_rejects_bad_characters() {
        let bad = format!("{}g", "0".repeat(63));
        assert_eq!(CasHash::from_hex(&bad), Err(CasHashParseError::InvalidCharacter));
    }

    #[test]
    fn test_default_is_zero() {
        assert_eq!(CasHash::default().hex(), "0".repeat(64));
    }
}
