use anyhow::Result;
use cencdrm::keys::{ClearKeyResolver, KeyId, KeyPair, KeyResolver};
use clap::Args;
use colored::Colorize;
use std::{fs, path::PathBuf};

#[derive(Args, Clone, Debug)]
/// Request content keys from a W3C clearkey license server.
pub struct RequestKeys {
    /// License server URL.
    #[arg(required = true, value_name = "URL")]
    license_url: String,

    /// Key IDs to request, hex (with or without dashes) or base64.
    #[arg(required = true, value_name = "KID")]
    key_ids: Vec<String>,

    /// Save the fetched keys into this keyfile directory.
    #[arg(short, long, value_name = "DIR")]
    save_dir: Option<PathBuf>,
}

impl RequestKeys {
    pub fn execute(self) -> Result<()> {
        let resolver = ClearKeyResolver::new()?;
        resolver.set_license_url(&self.license_url);

        if let Some(dir) = &self.save_dir {
            fs::create_dir_all(dir)?;
        }

        for text in &self.key_ids {
            let pair = KeyPair {
                key_id: KeyId::from_text(text)?,
                key: None,
                content_id: String::new(),
            };

            for (kid, key) in resolver.resolve(&pair)? {
                println!(
                    "[{}] {}:{}",
                    "CONTENT".green(),
                    kid,
                    hex::encode(key.as_bytes())
                );

                if let Some(dir) = &self.save_dir {
                    let path = dir.join(format!("{kid}.key"));
                    fs::write(&path, key.as_bytes())?;
                    log::info!("saved {}", path.display());
                }
            }
        }

        Ok(())
    }
}
