use anyhow::{Context, Result};
use base64::Engine;
use cencdrm::keys::{ContentKey, KeyId};
use clap::Args;
use std::{fs, path::PathBuf};

#[derive(Args, Clone, Debug)]
/// Save a content key into a keyfile directory.
///
/// The key is written as 16 raw bytes to <KID>.key and, when a content id
/// is given, also under the blake3 digest of that id, which is the
/// filename the keyfile resolver tries first.
pub struct SaveKey {
    /// Key ID, hex (with or without dashes) or base64.
    #[arg(required = true, value_name = "KID")]
    key_id: String,

    /// Key bytes, hex or base64.
    #[arg(required = true, value_name = "KEY")]
    key: String,

    /// Keyfile directory.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    directory: PathBuf,

    /// Content ID to derive the hashed filename from,
    /// e.g. urn:marlin:kid:<hex KID>.
    #[arg(short, long, value_name = "ID")]
    content_id: Option<String>,
}

impl SaveKey {
    fn parse_key(text: &str) -> Result<ContentKey> {
        if let Ok(bytes) = hex::decode(text)
            && let Ok(key) = ContentKey::from_slice(&bytes)
        {
            return Ok(key);
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(text)
            .context("KEY is neither hex nor base64")?;
        Ok(ContentKey::from_slice(&bytes)?)
    }

    pub fn execute(self) -> Result<()> {
        let key_id = KeyId::from_text(&self.key_id)?;
        let key = Self::parse_key(&self.key)?;

        fs::create_dir_all(&self.directory)?;

        let path = self.directory.join(format!("{key_id}.key"));
        fs::write(&path, key.as_bytes())?;
        log::info!("saved {}", path.display());

        if let Some(content_id) = &self.content_id {
            let digest = blake3::hash(content_id.as_bytes());
            let path = self.directory.join(format!("{}.key", digest.to_hex()));
            fs::write(&path, key.as_bytes())?;
            log::info!("saved {}", path.display());
        }

        Ok(())
    }
}
