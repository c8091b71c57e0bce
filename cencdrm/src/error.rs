//! Error types shared by the decryption and key-resolution paths.

use crate::keys::KeyId;
use thiserror::Error;

/// Errors produced while provisioning keys or decrypting samples.
///
/// All of these are local failures. A malformed provisioning payload only
/// discards that payload and a resolution failure only rejects the sample
/// that needed the key; neither stops the stream.
#[derive(Debug, Error)]
pub enum DrmError {
    /// Key or IV has a length AES-128-CTR cannot use. Construction-time
    /// and fatal for the affected cipher instance.
    #[error("invalid key material: {what} must be {expected} bytes, got {actual}")]
    InvalidKeyMaterial {
        what: &'static str,
        expected: &'static str,
        actual: usize,
    },

    /// The PSSH box layout could not be read.
    #[error("malformed PSSH box: {0}")]
    MalformedPsshBox(String),

    /// The ContentProtection XML payload could not be parsed.
    #[error("invalid ContentProtection XML: {0}")]
    InvalidProtectionXml(String),

    /// Every resolution strategy failed to produce key bytes for this ID.
    #[error("no key available for key ID {0}")]
    MissingKey(KeyId),

    /// The binary subsample run table ended before the declared number of
    /// entries could be read.
    #[error("subsample run table is truncated")]
    TruncatedSubsampleTable,

    /// The license server could not be reached.
    #[error("license server connection failed: {0}")]
    ServerConnectionFailure(String),

    /// The license server answered with something other than a usable
    /// clearkey response.
    #[error("invalid license server response: {0}")]
    ServerResponseInvalid(String),
}
