use std::fmt;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use xethash::CasHash;

/// A [`CasHash`] that serializes as its 64-character API-hex string.
///
/// This is the form hashes take everywhere on the wire: JSON bodies, URL
/// path segments, and the keys of the fetch-info map.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HexCasHash(pub CasHash);

impl HexCasHash {
    pub fn hash(&self) -> &CasHash {
        &self.0
    }
}

impl From<CasHash> for HexCasHash {
    fn from(h: CasHash) -> Self {
        Self(h)
    }
}

impl From<HexCasHash> for CasHash {
    fn from(h: HexCasHash) -> Self {
        h.0
    }
}

impl fmt::Display for HexCasHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for HexCasHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for HexCasHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.hex())
    }
}

impl<'de> Deserialize<'de> for HexCasHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let hash = CasHash::from_hex(&s).map_err(D::Error::custom)?;
        Ok(Self(hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_hex_string() {
        let h = HexCasHash(CasHash::from(&[1u8; 32]));
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", h.0.hex()));

        let back: HexCasHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn test_rejects_malformed_hex() {
        assert!(serde_json::from_str::<HexCasHash>("\"123\"").is_err());
    }
}
