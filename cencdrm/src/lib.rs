//! Decryption support for ISOBMFF Common Encryption (CENC) streams.
//!
//! This crate contains the pieces a streaming pipeline needs to turn an
//! encrypted DASH/fMP4 sample back into cleartext:
//!
//! - [`decrypt::AesCtrState`] — AES-128-CTR keystream with mid-block
//!   resumption, the cipher CENC mandates for the `cenc` scheme.
//! - [`decrypt::apply_runs`] — walks a sample's subsample run table and
//!   decrypts only the encrypted spans, in place.
//! - [`pssh::PsshBox`] — parser for the Protection System Specific Header
//!   box carried in `moov`/`moof` boxes.
//! - [`protection`] — parser for the DASH MPD `ContentProtection` element.
//! - [`keys::KeyStore`] — key-ID to content-key cache with pluggable
//!   lazy resolution (keyfile directory, W3C clearkey license server).
//! - [`decrypt::CencDecryptor`] — per-buffer driver tying the above
//!   together for one DRM system.
//!
//! The host pipeline is expected to hand over two kinds of input: media
//! buffers with per-sample protection metadata, and out-of-band
//! provisioning payloads (PSSH boxes or `ContentProtection` XML). Both
//! arrive as plain byte slices; this crate has no knowledge of the host's
//! buffer or event model.

pub mod decrypt;
pub mod drm;
pub mod keys;
pub mod protection;
pub mod pssh;

mod error;
mod reader;

pub use error::DrmError;
pub use reader::Reader;

/// A `Result` alias where the `Err` case is `cencdrm::DrmError`.
pub type Result<T> = std::result::Result<T, DrmError>;
