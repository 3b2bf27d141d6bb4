use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

/// Stable, content-independent identifier for every object in a registry.
///
/// An `Id` is either random ([`Id::new`]) or derived deterministically from a
/// name with BLAKE3 ([`Id::generate`]). Generated ids let well-known builtin
/// types keep the same identity across sessions.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id(Uuid);

impl Id {
    /// A fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Derive an identifier from a name. The same name always produces the
    /// same `Id`.
    pub fn generate(name: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"tiny-id-v1:");
        hasher.update(name.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&hash.as_bytes()[..16]);
        Self(Uuid::from_bytes(bytes))
    }

    /// The nil identifier (all zeros). Never assigned to a live object.
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Returns `true` if this is the nil identifier.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// The raw 16 bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Hex-encoded string (32 characters, no separators).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    /// Short identifier (first 8 hex characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0.as_bytes()[..4])
    }

    /// Parse from a 32-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 16 {
            return Err(TypeError::InvalidLength {
                expected: 16,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 16];
        arr.copy_from_slice(&bytes);
        Ok(Self(Uuid::from_bytes(arr)))
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::nil()
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.short_hex())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Id {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<Uuid> for Id {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_is_deterministic() {
        assert_eq!(Id::generate("Int32"), Id::generate("Int32"));
    }

    #[test]
    fn generate_separates_names() {
        assert_ne!(Id::generate("Int32"), Id::generate("Int64"));
    }

    #[test]
    fn new_ids_are_unique_and_not_nil() {
        let a = Id::new();
        let b = Id::new();
        assert_ne!(a, b);
        assert!(!a.is_nil());
    }

    #[test]
    fn nil_is_default() {
        assert!(Id::default().is_nil());
        assert_eq!(Id::nil().as_bytes(), &[0u8; 16]);
    }

    #[test]
    fn hex_roundtrip() {
        let id = Id::generate("Vec2");
        let parsed: Id = id.to_hex().parse().unwrap();
        assert_eq!(id, parsed);
        assert_eq!(id.to_string().len(), 32);
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        let err = Id::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 16,
                actual: 2
            }
        );
        assert!(matches!(Id::from_hex("zz"), Err(TypeError::InvalidHex(_))));
    }

    #[test]
    fn debug_uses_short_form() {
        let id = Id::generate("x");
        assert_eq!(format!("{id:?}"), format!("Id({})", id.short_hex()));
    }
}
