//! Key identifiers, content keys and the resolution cache.

mod clearkey;
mod resolver;
mod store;

pub use clearkey::{ClearKeyResolver, base64url_decode, base64url_encode, parse_license_response};
pub use resolver::{KeyResolver, KeyfileResolver, NoResolver};
pub use store::KeyStore;

use crate::{DrmError, Result};
use base64::Engine;

/// 16-byte CENC key identifier.
///
/// Compared byte for byte; the UUID grouping is display-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyId([u8; 16]);

impl KeyId {
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        data.try_into()
            .map(Self)
            .map_err(|_| DrmError::InvalidKeyMaterial {
                what: "key id",
                expected: "16",
                actual: data.len(),
            })
    }

    /// Parse hex text, with or without `-` separators (UUID form).
    pub fn from_hex(text: &str) -> Result<Self> {
        let cleaned: String = text.chars().filter(|c| *c != '-').collect();
        let bytes = hex::decode(&cleaned).map_err(|_| DrmError::InvalidKeyMaterial {
            what: "key id",
            expected: "32 hex chars",
            actual: cleaned.len(),
        })?;
        Self::from_slice(&bytes)
    }

    /// Parse hex first, falling back to standard base64.
    pub fn from_text(text: &str) -> Result<Self> {
        if let Ok(key_id) = Self::from_hex(text) {
            return Ok(key_id);
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(text)
            .map_err(|_| DrmError::InvalidKeyMaterial {
                what: "key id",
                expected: "32 hex chars or 24 base64 chars",
                actual: text.len(),
            })?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn uuid(&self) -> String {
        let hex = hex::encode(self.0);
        format!(
            "{}-{}-{}-{}-{}",
            &hex[..8],
            &hex[8..12],
            &hex[12..16],
            &hex[16..20],
            &hex[20..]
        )
    }
}

impl From<[u8; 16]> for KeyId {
    fn from(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// 16-byte AES-128 content key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentKey([u8; 16]);

impl ContentKey {
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        data.try_into()
            .map(Self)
            .map_err(|_| DrmError::InvalidKeyMaterial {
                what: "key",
                expected: "16",
                actual: data.len(),
            })
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl From<[u8; 16]> for ContentKey {
    fn from(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

/// A key ID, its key bytes once known, and the resolution metadata.
///
/// `content_id` names the key in the DRM flavour's own vocabulary (e.g.
/// `urn:marlin:kid:<hex>`, or just the hex key ID); resolvers use it to
/// locate key material. The [`KeyStore`] owns the authoritative map of
/// these; callers only ever see value copies, and a pair that already has
/// key bytes is never overwritten.
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub key_id: KeyId,
    pub key: Option<ContentKey>,
    pub content_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_id_from_hex() {
        let plain = KeyId::from_hex("1077efecc0b24d02ace33c1e52e2fb4b").unwrap();
        let dashed = KeyId::from_hex("1077efec-c0b2-4d02-ace3-3c1e52e2fb4b").unwrap();
        assert_eq!(plain, dashed);
        assert_eq!(plain.uuid(), "1077efec-c0b2-4d02-ace3-3c1e52e2fb4b");
        assert_eq!(plain.to_string(), "1077efecc0b24d02ace33c1e52e2fb4b");
    }

    #[test]
    fn test_key_id_from_text() {
        let from_hex = KeyId::from_text("1077efecc0b24d02ace33c1e52e2fb4b").unwrap();
        let from_base64 = KeyId::from_text("EHfv7MCyTQKs4zweUuL7Sw==").unwrap();
        assert_eq!(from_hex, from_base64);
        assert!(KeyId::from_text("not a key id").is_err());
    }

    #[test]
    fn test_wrong_sizes_rejected() {
        assert!(matches!(
            KeyId::from_slice(&[0; 15]),
            Err(DrmError::InvalidKeyMaterial { what: "key id", .. })
        ));
        assert!(matches!(
            ContentKey::from_slice(&[0; 17]),
            Err(DrmError::InvalidKeyMaterial { what: "key", .. })
        ));
        assert!(KeyId::from_hex("1077efec").is_err());
    }
}
