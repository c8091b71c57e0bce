use crate::{
    DrmError, Result,
    decrypt::{AesCtrState, SubsampleRun, apply_runs},
    drm::{COMMON_SYSTEM_ID, DrmSystem, PSSH_PAYLOAD},
    keys::{KeyId, KeyResolver, KeyStore},
    protection::parse_content_protection,
    pssh::PsshBox,
};
use std::sync::Arc;

/// Where a provisioning payload came from, which decides how it is
/// parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionEventSource {
    /// `ContentProtection` XML out of a DASH manifest.
    DashMpd,
    /// A raw `pssh` box out of the container.
    Isobmff,
}

/// Per-sample encryption metadata, as carried by the container.
#[derive(Debug, Clone)]
pub struct SampleProtectionInfo {
    pub key_id: KeyId,
    /// 8 or 16 bytes; empty means the sample is in the clear.
    pub iv: Vec<u8>,
    pub is_encrypted: bool,
    pub subsamples: Vec<SubsampleRun>,
}

impl SampleProtectionInfo {
    pub fn new(key_id: KeyId, iv: Vec<u8>) -> Self {
        Self {
            key_id,
            iv,
            is_encrypted: true,
            subsamples: Vec::new(),
        }
    }

    /// Attach a binary subsample run table of `count` entries.
    pub fn with_subsample_table(mut self, count: usize, table: &[u8]) -> Result<Self> {
        self.subsamples = SubsampleRun::parse_table(table, count)?;
        Ok(self)
    }
}

/// The decryption session: one DRM flavour, one key store, one sample
/// stream.
///
/// Provisioning (`handle_protection_event`) and decryption
/// (`decrypt_in_place`) may run on different threads; the store
/// serializes them. Failures are per event or per sample and leave the
/// session usable.
pub struct CencDecryptor {
    system: Box<dyn DrmSystem>,
    store: Arc<KeyStore>,
}

impl CencDecryptor {
    pub fn new(system: Box<dyn DrmSystem>, resolver: Arc<dyn KeyResolver>) -> Self {
        let store = Arc::new(KeyStore::with_content_id_prefix(
            resolver,
            system.content_id_prefix(),
        ));
        Self { system, store }
    }

    /// The session's key store, for eager provisioning.
    pub fn store(&self) -> &Arc<KeyStore> {
        &self.store
    }

    pub fn handle_protection_event(
        &self,
        source: ProtectionEventSource,
        data: &[u8],
    ) -> Result<()> {
        match source {
            ProtectionEventSource::Isobmff => self.handle_pssh(data),
            ProtectionEventSource::DashMpd => self.handle_content_protection_xml(data),
        }
    }

    /// Consume one `pssh` box. Boxes for other systems are skipped with
    /// `Ok`; a common-system box only contributes its key IDs.
    pub fn handle_pssh(&self, data: &[u8]) -> Result<()> {
        let pssh = PsshBox::parse(data)?;

        if pssh.system_id == COMMON_SYSTEM_ID {
            for key_id in &pssh.key_ids {
                self.store.register(*key_id);
            }
            return Ok(());
        }

        if !self.system.accepts_system_id(&pssh.system_id) {
            log::debug!("skipping pssh box for system {}", hex::encode(pssh.system_id));
            return Ok(());
        }

        log::debug!(
            "pssh v{} box with {} key IDs",
            pssh.version,
            pssh.key_ids.len()
        );
        for key_id in &pssh.key_ids {
            self.store.register(*key_id);
        }
        self.system.configure(PSSH_PAYLOAD, &pssh.payload, &self.store)
    }

    /// Consume one `ContentProtection` element. Elements whose
    /// `schemeIdUri` names a different system are skipped with `Ok`.
    pub fn handle_content_protection_xml(&self, data: &[u8]) -> Result<()> {
        let xml = std::str::from_utf8(data)
            .map_err(|e| DrmError::InvalidProtectionXml(format!("not UTF-8: {e}")))?;
        let parsed = parse_content_protection(xml, self.system.element_rules())?;

        if let Some(system_id) = parsed.system_id
            && system_id != COMMON_SYSTEM_ID
            && !self.system.accepts_system_id(&system_id)
        {
            log::debug!(
                "skipping ContentProtection for system {}",
                hex::encode(system_id)
            );
            return Ok(());
        }

        if let Some(key_id) = parsed.default_kid {
            self.store.register(key_id);
        }

        for (identifier, payload) in &parsed.payloads {
            // An embedded cenc:pssh value is a whole box, not a payload.
            if *identifier == PSSH_PAYLOAD {
                self.handle_pssh(payload)?;
            } else {
                self.system.configure(*identifier, payload, &self.store)?;
            }
        }

        Ok(())
    }

    /// Decrypt one sample in place.
    ///
    /// Clear samples (not encrypted, or no IV) pass through untouched.
    /// The key is resolved before any byte of the buffer changes, so a
    /// failed sample comes back intact along with the error.
    pub fn decrypt_in_place(&self, data: &mut [u8], info: &SampleProtectionInfo) -> Result<()> {
        if !info.is_encrypted || info.iv.is_empty() {
            return Ok(());
        }

        let key = self.store.resolve(info.key_id)?;
        let mut state = AesCtrState::new(key.as_bytes(), &info.iv)?;
        apply_runs(&mut state, data, &info.subsamples);
        Ok(())
    }
}
