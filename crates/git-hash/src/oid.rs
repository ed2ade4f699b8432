use std::fmt;
use std::str::FromStr;

use crate::hex::{decode_into, encode_to_string};
use crate::{HashError, DIGEST_LEN, HEX_LEN};

/// A git object name: the SHA-1 digest of an object's framed bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; DIGEST_LEN]);

impl ObjectId {
    /// The all-zeros id.
    pub const NULL: Self = Self([0u8; DIGEST_LEN]);

    /// Build an id from exactly 20 raw digest bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HashError> {
        let arr: [u8; DIGEST_LEN] =
            bytes
                .try_into()
                .map_err(|_| HashError::InvalidHashLength {
                    expected: DIGEST_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    /// Parse a 40-character hex id. Upper and lower case are both accepted.
    pub fn from_hex(hex: &str) -> Result<Self, HashError> {
        if hex.len() != HEX_LEN {
            return Err(HashError::InvalidHexLength {
                expected: HEX_LEN,
                actual: hex.len(),
            });
        }
        let mut bytes = [0u8; DIGEST_LEN];
        decode_into(hex.as_bytes(), &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Parse a 40-character hex id from raw bytes, as found on the wire.
    pub fn from_hex_bytes(hex: &[u8]) -> Result<Self, HashError> {
        if hex.len() != HEX_LEN {
            return Err(HashError::InvalidHexLength {
                expected: HEX_LEN,
                actual: hex.len(),
            });
        }
        let mut bytes = [0u8; DIGEST_LEN];
        decode_into(hex, &mut bytes)?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Lowercase hex form.
    pub fn to_hex(&self) -> String {
        encode_to_string(&self.0)
    }

    /// The shard directory name of a loose object: the first two hex digits.
    pub fn shard(&self) -> String {
        encode_to_string(&self.0[..1])
    }

    /// The file name inside the shard: the remaining 38 hex digits.
    pub fn shard_file(&self) -> String {
        encode_to_string(&self.0[1..])
    }

    /// `"xx/xxxx..."`, relative to the objects directory.
    pub fn loose_path(&self) -> String {
        format!("{}/{}", self.shard(), self.shard_file())
    }
}

impl From<[u8; DIGEST_LEN]> for ObjectId {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", &self.to_hex()[..8])
    }
}

impl FromStr for ObjectId {
    type Err = HashError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
