//! Opaque 12-byte document identifiers.
//!
//! Identifiers are exchanged as 24-character hex strings at the JSON
//! boundary and kept as raw bytes internally.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// An opaque 12-byte identifier.
///
/// The first four bytes of a generated identifier are the big-endian unix
/// timestamp in seconds, the remaining eight are random. Parsing accepts any
/// 24-character hex string and makes no assumptions about the layout.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Generate a new identifier.
    pub fn new() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes[4..]);
        Self(bytes)
    }

    /// Create an identifier from raw bytes.
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// The raw bytes of the identifier.
    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Parse a 24-character hex string into an identifier.
    pub fn parse_str(hex: &str) -> Result<Self> {
        if hex.len() != 24 || !hex.is_ascii() {
            return Err(Error::MalformedObjectId(hex.to_string()));
        }

        let mut bytes = [0u8; 12];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk)
                .map_err(|_| Error::MalformedObjectId(hex.to_string()))?;
            bytes[i] = u8::from_str_radix(pair, 16)
                .map_err(|_| Error::MalformedObjectId(hex.to_string()))?;
        }
        Ok(Self(bytes))
    }

    /// Encode the identifier as a 24-character lowercase hex string.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(24);
        for byte in &self.0 {
            out.push_str(&format!("{:02x}", byte));
        }
        out
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl std::str::FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        ObjectId::parse_str(&hex).map_err(serde::de::Error::custom)
    }
}
