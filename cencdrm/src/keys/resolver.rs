use crate::{
    DrmError, Result,
    keys::{ContentKey, KeyId, KeyPair},
};
use std::{fs, io::ErrorKind, path::PathBuf};

/// Strategy for turning a registered key ID into key bytes.
///
/// The resolver gets a snapshot of the pair (ID plus content identifier)
/// and may return keys for more IDs than asked; the store installs all of
/// them. Called outside the store lock, so blocking I/O is fine here.
pub trait KeyResolver: Send + Sync {
    fn resolve(&self, pair: &KeyPair) -> Result<Vec<(KeyId, ContentKey)>>;
}

/// Resolver for stores that only use pre-provisioned keys.
pub struct NoResolver;

impl KeyResolver for NoResolver {
    fn resolve(&self, pair: &KeyPair) -> Result<Vec<(KeyId, ContentKey)>> {
        Err(DrmError::MissingKey(pair.key_id))
    }
}

/// Loads keys from `.key` files in a directory.
///
/// Two filenames are tried per key: the blake3 hex digest of the pair's
/// content identifier, then the bare hex key ID. A keyfile holds either
/// the 16 raw key bytes or 32 hex characters.
pub struct KeyfileResolver {
    directory: PathBuf,
}

impl KeyfileResolver {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn candidate_paths(&self, pair: &KeyPair) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(2);
        if !pair.content_id.is_empty() {
            let digest = blake3::hash(pair.content_id.as_bytes());
            paths.push(self.directory.join(format!("{}.key", digest.to_hex())));
        }
        paths.push(self.directory.join(format!("{}.key", pair.key_id)));
        paths
    }

    fn parse_keyfile(data: &[u8]) -> Option<ContentKey> {
        if data.len() == 16 {
            return ContentKey::from_slice(data).ok();
        }
        let text = std::str::from_utf8(data).ok()?;
        let bytes = hex::decode(text.trim()).ok()?;
        ContentKey::from_slice(&bytes).ok()
    }
}

impl KeyResolver for KeyfileResolver {
    fn resolve(&self, pair: &KeyPair) -> Result<Vec<(KeyId, ContentKey)>> {
        for path in self.candidate_paths(pair) {
            match fs::read(&path) {
                Ok(data) => {
                    if let Some(key) = Self::parse_keyfile(&data) {
                        log::debug!("loaded key for {} from {}", pair.key_id, path.display());
                        return Ok(vec![(pair.key_id, key)]);
                    }
                    log::warn!(
                        "{} is neither 16 raw bytes nor 32 hex chars, skipping",
                        path.display()
                    );
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    log::trace!("no keyfile at {}", path.display());
                }
                Err(err) => {
                    log::warn!("cannot read {}: {err}", path.display());
                }
            }
        }

        Err(DrmError::MissingKey(pair.key_id))
    }
}
