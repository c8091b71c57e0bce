//! CENC sample decryption.
//!
//! The `cenc` scheme encrypts samples with AES-128-CTR, optionally leaving
//! runs of cleartext inside each sample (subsample encryption) so that
//! codec headers stay readable by downstream parsers. Decryption walks the
//! run table, skipping the clear spans and XORing the encrypted spans with
//! a single keystream that continues across the whole sample.
//!
//! ```no_run
//! use std::sync::Arc;
//! use cencdrm::decrypt::{CencDecryptor, SampleProtectionInfo};
//! use cencdrm::drm::Keyfile;
//! use cencdrm::keys::{KeyId, KeyfileResolver};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let resolver = Arc::new(KeyfileResolver::new("/tmp"));
//!     let decryptor = CencDecryptor::new(Box::new(Keyfile::new()), resolver);
//!
//!     // Provisioning data from the stream (moov/moof pssh or MPD XML).
//!     decryptor.handle_pssh(&std::fs::read("init.pssh")?)?;
//!
//!     // Per-sample metadata from the demuxer.
//!     let info = SampleProtectionInfo::new(
//!         KeyId::from_hex("1077efecc0b24d02ace33c1e52e2fb4b")?,
//!         vec![0x11; 8],
//!     );
//!     let mut sample = std::fs::read("sample.bin")?;
//!     decryptor.decrypt_in_place(&mut sample, &info)?;
//!     Ok(())
//! }
//! ```

mod cipher;
mod decryptor;
mod subsample;

pub use cipher::AesCtrState;
pub use decryptor::{CencDecryptor, ProtectionEventSource, SampleProtectionInfo};
pub use subsample::{SubsampleRun, apply_runs};
