use anyhow::{Result, bail};
use base64::Engine;
use cencdrm::pssh::PsshBox;
use clap::Args;
use colored::Colorize;
use std::{fs, path::Path};

#[derive(Args, Clone, Debug)]
/// Inspect the PSSH boxes of an init segment.
pub struct Pssh {
    /// PSSH input, an init-segment file path or a base64 encoded box.
    #[arg(required = true, value_name = "PATH|BASE64")]
    input: String,
}

impl Pssh {
    /// Slice out candidate `pssh` boxes by scanning for the type tag and
    /// trusting the preceding length field.
    fn extract_boxes(data: &[u8]) -> Vec<&[u8]> {
        let mut boxes = Vec::new();
        let mut at = 0;

        while let Some(found) = data[at..].windows(4).position(|w| w == b"pssh") {
            let tag = at + found;
            if tag >= 4 {
                let start = tag - 4;
                let size = u32::from_be_bytes([
                    data[start],
                    data[start + 1],
                    data[start + 2],
                    data[start + 3],
                ]) as usize;
                if size >= 8 && start + size <= data.len() {
                    boxes.push(&data[start..start + size]);
                }
            }
            at = tag + 4;
        }

        boxes
    }

    pub fn execute(self) -> Result<()> {
        let data = if Path::new(&self.input).exists() {
            fs::read(&self.input)?
        } else if let Ok(data) = base64::engine::general_purpose::STANDARD.decode(&self.input) {
            data
        } else {
            bail!("Unable to determine the INPUT type.");
        };

        let boxes = Self::extract_boxes(&data);
        if boxes.is_empty() {
            bail!("No pssh box found in the input.");
        }

        for data in boxes {
            let pssh = PsshBox::parse(data)?;
            println!("{}: {}", "version".bold(), pssh.version);
            println!("{}: {}", "system id".bold(), hex::encode(pssh.system_id));
            for kid in &pssh.key_ids {
                println!("{}: {}", "key id".bold(), kid.uuid());
            }
            println!("{}: {} bytes", "payload".bold(), pssh.payload.len());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_boxes() {
        let mut data = vec![0xff; 16];
        let mut box_ = vec![0, 0, 0, 0];
        box_.extend_from_slice(b"pssh");
        // version, flags, system id, empty payload
        box_.extend_from_slice(&[0; 24]);
        let total = box_.len() as u32;
        box_[..4].copy_from_slice(&total.to_be_bytes());
        data.extend_from_slice(&box_);
        data.extend_from_slice(&[0xee; 8]);

        let boxes = Pssh::extract_boxes(&data);
        assert_eq!(boxes, vec![box_.as_slice()]);
        assert!(Pssh::extract_boxes(&[0u8; 32]).is_empty());
    }
}
