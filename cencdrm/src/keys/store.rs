use crate::{
    DrmError, Result,
    keys::{ContentKey, KeyId, KeyPair, KeyResolver},
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

/// Cache of key pairs keyed by key ID, with lazy resolution.
///
/// Provisioning events register IDs (and sometimes deliver key bytes)
/// from a control thread while the streaming thread calls [`resolve`]
/// per sample, so every map access goes through one mutex. Resolver I/O
/// runs outside the lock; a slow license fetch must not block
/// registration of further IDs.
///
/// [`resolve`]: KeyStore::resolve
pub struct KeyStore {
    pairs: Mutex<HashMap<KeyId, KeyPair>>,
    resolver: Arc<dyn KeyResolver>,
    content_id_prefix: String,
}

impl KeyStore {
    pub fn new(resolver: Arc<dyn KeyResolver>) -> Self {
        Self::with_content_id_prefix(resolver, "")
    }

    pub fn with_content_id_prefix(resolver: Arc<dyn KeyResolver>, prefix: &str) -> Self {
        Self {
            pairs: Mutex::new(HashMap::new()),
            resolver,
            content_id_prefix: prefix.to_owned(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<KeyId, KeyPair>> {
        // A panic while holding the lock leaves the map consistent; keep
        // serving the cached pairs instead of propagating the poison.
        self.pairs.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn blank_pair(&self, key_id: KeyId) -> KeyPair {
        KeyPair {
            key_id,
            key: None,
            content_id: format!("{}{key_id}", self.content_id_prefix),
        }
    }

    /// Make `key_id` known to the store. Idempotent; an existing pair,
    /// keyed or not, is left alone.
    pub fn register(&self, key_id: KeyId) {
        let mut pairs = self.lock();
        pairs
            .entry(key_id)
            .or_insert_with(|| self.blank_pair(key_id));
    }

    /// Install eagerly delivered key bytes. A pair that already has a key
    /// keeps it.
    pub fn provide(&self, key_id: KeyId, key: ContentKey) {
        let mut pairs = self.lock();
        let pair = pairs
            .entry(key_id)
            .or_insert_with(|| self.blank_pair(key_id));
        if pair.key.is_none() {
            pair.key = Some(key);
        }
    }

    pub fn contains(&self, key_id: KeyId) -> bool {
        self.lock().contains_key(&key_id)
    }

    /// Return the key for `key_id`, fetching it through the resolver if
    /// the store only knows the ID so far.
    ///
    /// The fetch happens outside the lock, so two threads may race to
    /// resolve the same ID; whichever installs first wins and the other
    /// result is discarded by the no-overwrite rule. A resolver that
    /// returns keys for additional IDs (clearkey responses may) gets all
    /// of them installed. Any resolver failure surfaces as
    /// [`DrmError::MissingKey`]; there are no retries here, the next
    /// sample needing the key triggers the next attempt.
    pub fn resolve(&self, key_id: KeyId) -> Result<ContentKey> {
        let snapshot = {
            let mut pairs = self.lock();
            let pair = pairs
                .entry(key_id)
                .or_insert_with(|| self.blank_pair(key_id));
            if let Some(key) = pair.key {
                return Ok(key);
            }
            pair.clone()
        };

        log::debug!("fetching key for key ID {key_id}");

        match self.resolver.resolve(&snapshot) {
            Ok(resolved) => {
                let mut pairs = self.lock();
                for (kid, key) in resolved {
                    let pair = pairs.entry(kid).or_insert_with(|| self.blank_pair(kid));
                    if pair.key.is_none() {
                        pair.key = Some(key);
                    }
                }
                pairs
                    .get(&key_id)
                    .and_then(|pair| pair.key)
                    .ok_or(DrmError::MissingKey(key_id))
            }
            Err(err) => {
                log::warn!("key resolution failed for key ID {key_id}: {err}");
                Err(DrmError::MissingKey(key_id))
            }
        }
    }
}
