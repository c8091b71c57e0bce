//! DRM flavours: per-system metadata dialects over the shared engine.
//!
//! Every flavour consumes the same provisioning inputs (PSSH payloads,
//! `ContentProtection` children) but speaks its own element vocabulary
//! and content-ID scheme. [`DrmSystem`] is the capability surface the
//! orchestrator drives; the flavours here cover the two key-delivery
//! paths this crate supports, keyfiles and clearkey license servers.

use crate::{
    DrmError, Result,
    keys::{ClearKeyResolver, KeyId, KeyStore},
    protection::{CENC_NAMESPACE, ElementHandling, ElementRule},
};
use std::sync::Arc;

/// Configure identifier for the opaque payload of a matching PSSH box.
pub const PSSH_PAYLOAD: u32 = 0x101;
/// First identifier free for flavour-private element payloads.
pub const IDENTIFIER_PRIVATE: u32 = 0x200;

/// Common PSSH system ID (`1077efec-c0b2-4d02-ace3-3c1e52e2fb4b`); its
/// version 1 boxes list key IDs usable by every system.
pub const COMMON_SYSTEM_ID: [u8; 16] = [
    0x10, 0x77, 0xef, 0xec, 0xc0, 0xb2, 0x4d, 0x02, 0xac, 0xe3, 0x3c, 0x1e, 0x52, 0xe2, 0xfb, 0x4b,
];
/// W3C clearkey (`e2719d58-a985-b3c9-781a-b030af78d30e`).
pub const CLEARKEY_SYSTEM_ID: [u8; 16] = [
    0xe2, 0x71, 0x9d, 0x58, 0xa9, 0x85, 0xb3, 0xc9, 0x78, 0x1a, 0xb0, 0x30, 0xaf, 0x78, 0xd3, 0x0e,
];
/// Marlin (`69f908af-4816-46ea-910c-cd5dcccb0a3a`), as used in PSSH boxes.
pub const MARLIN_SYSTEM_ID: [u8; 16] = [
    0x69, 0xf9, 0x08, 0xaf, 0x48, 0x16, 0x46, 0xea, 0x91, 0x0c, 0xcd, 0x5d, 0xcc, 0xcb, 0x0a, 0x3a,
];
/// Marlin as announced in MPDs (`5e629af5-38da-4063-8977-97ffbd9902d4`).
pub const MARLIN_MPD_SYSTEM_ID: [u8; 16] = [
    0x5e, 0x62, 0x9a, 0xf5, 0x38, 0xda, 0x40, 0x63, 0x89, 0x77, 0x97, 0xff, 0xbd, 0x99, 0x02, 0xd4,
];
/// PlayReady (`9a04f079-9840-4286-ab92-e65be0885f95`).
pub const PLAYREADY_SYSTEM_ID: [u8; 16] = [
    0x9a, 0x04, 0xf0, 0x79, 0x98, 0x40, 0x42, 0x86, 0xab, 0x92, 0xe6, 0x5b, 0xe0, 0x88, 0x5f, 0x95,
];

/// One DRM flavour's metadata dialect.
pub trait DrmSystem: Send + Sync {
    /// System ID this flavour claims in PSSH boxes and scheme URIs.
    fn system_id(&self) -> [u8; 16];

    /// Additional system IDs this flavour also answers to.
    fn alias_system_ids(&self) -> &[[u8; 16]] {
        &[]
    }

    /// Classification table for `ContentProtection` children.
    fn element_rules(&self) -> &[ElementRule];

    /// Prefix turning a hex key ID into this flavour's content ID.
    fn content_id_prefix(&self) -> &str {
        ""
    }

    /// Consume one extracted payload: a PSSH payload ([`PSSH_PAYLOAD`])
    /// or a flavour-private element identifier. Unknown identifiers are
    /// ignored.
    fn configure(&self, identifier: u32, data: &[u8], store: &KeyStore) -> Result<()>;

    fn accepts_system_id(&self, system_id: &[u8; 16]) -> bool {
        self.system_id() == *system_id || self.alias_system_ids().contains(system_id)
    }
}

/// Identifier of the clearkey `Laurl` element payload.
const CLEARKEY_LAURL: u32 = IDENTIFIER_PRIVATE;

const CLEARKEY_RULES: &[ElementRule] = &[
    ElementRule {
        namespace: "http://dashif.org/guidelines/clearKey",
        local_name: "Laurl",
        identifier: CLEARKEY_LAURL,
        handling: ElementHandling::Raw,
    },
    ElementRule {
        namespace: CENC_NAMESPACE,
        local_name: "pssh",
        identifier: PSSH_PAYLOAD,
        handling: ElementHandling::Base64,
    },
];

/// W3C clearkey flavour: key IDs arrive in common or clearkey PSSH boxes
/// and keys come from the license server named by `Laurl`.
pub struct ClearKey {
    resolver: Arc<ClearKeyResolver>,
}

impl ClearKey {
    pub fn new(resolver: Arc<ClearKeyResolver>) -> Self {
        Self { resolver }
    }

    /// Shortcut when the license URL is known up front rather than
    /// announced in the MPD.
    pub fn with_license_url(resolver: Arc<ClearKeyResolver>, url: &str) -> Self {
        resolver.set_license_url(url);
        Self { resolver }
    }
}

impl DrmSystem for ClearKey {
    fn system_id(&self) -> [u8; 16] {
        CLEARKEY_SYSTEM_ID
    }

    fn element_rules(&self) -> &[ElementRule] {
        CLEARKEY_RULES
    }

    fn configure(&self, identifier: u32, data: &[u8], _store: &KeyStore) -> Result<()> {
        match identifier {
            CLEARKEY_LAURL => {
                let url = std::str::from_utf8(data)
                    .map_err(|e| {
                        DrmError::InvalidProtectionXml(format!("Laurl is not UTF-8: {e}"))
                    })?
                    .trim();
                log::debug!("clearkey license acquisition URL: {url}");
                self.resolver.set_license_url(url);
                Ok(())
            }
            // The clearkey PSSH payload carries nothing beyond the key
            // IDs already taken from the box header.
            _ => Ok(()),
        }
    }
}

const MARLIN_NAMESPACE: &str = "urn:marlin:mas:1-0:services:schemas:mpd";
const MARLIN_CONTENT_ID: u32 = IDENTIFIER_PRIVATE;
const MARLIN_KID_PREFIX: &str = "urn:marlin:kid:";

const KEYFILE_RULES: &[ElementRule] = &[
    ElementRule {
        namespace: MARLIN_NAMESPACE,
        local_name: "MarlinContentIds",
        identifier: 0,
        handling: ElementHandling::Children,
    },
    ElementRule {
        namespace: MARLIN_NAMESPACE,
        local_name: "MarlinContentId",
        identifier: MARLIN_CONTENT_ID,
        handling: ElementHandling::Raw,
    },
];

/// Keyfile flavour: marlin-style content IDs announce the key IDs and
/// key bytes come from `.key` files named after them.
#[derive(Default)]
pub struct Keyfile;

impl Keyfile {
    pub fn new() -> Self {
        Self
    }
}

impl DrmSystem for Keyfile {
    fn system_id(&self) -> [u8; 16] {
        MARLIN_SYSTEM_ID
    }

    fn alias_system_ids(&self) -> &[[u8; 16]] {
        &[MARLIN_MPD_SYSTEM_ID]
    }

    fn element_rules(&self) -> &[ElementRule] {
        KEYFILE_RULES
    }

    fn content_id_prefix(&self) -> &str {
        MARLIN_KID_PREFIX
    }

    fn configure(&self, identifier: u32, data: &[u8], store: &KeyStore) -> Result<()> {
        match identifier {
            MARLIN_CONTENT_ID => {
                let text = std::str::from_utf8(data)
                    .map_err(|e| {
                        DrmError::InvalidProtectionXml(format!("content ID is not UTF-8: {e}"))
                    })?
                    .trim();
                let hex_kid = text.strip_prefix(MARLIN_KID_PREFIX).ok_or_else(|| {
                    DrmError::InvalidProtectionXml(format!("unrecognized content ID '{text}'"))
                })?;
                let key_id = KeyId::from_hex(hex_kid).map_err(|_| {
                    DrmError::InvalidProtectionXml(format!("bad key ID in content ID '{text}'"))
                })?;
                log::debug!("registering key ID {key_id} from content ID");
                store.register(key_id);
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
