//! `pssh` box parsing.
//!
//! Layout (all fields big endian):
//!
//! ```text
//! u32  total length (must equal the buffer length)
//! 4B   box type tag, read but not interpreted
//! u8   version
//! 3B   flags
//! 16B  system id
//! v>0: u32 key id count, then count * 16B key ids
//! u32  payload size, then payload bytes
//! ```

use crate::{DrmError, Reader, Result, keys::KeyId};

#[derive(Debug)]
pub struct PsshBox {
    pub version: u8,
    pub system_id: [u8; 16],
    /// Key IDs from the version 1+ header. Empty for version 0 boxes,
    /// whose IDs (if any) are inside the system-specific payload.
    pub key_ids: Vec<KeyId>,
    pub payload: Vec<u8>,
}

impl PsshBox {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new_big_endian(data.to_vec());
        let malformed = |what: &str| DrmError::MalformedPsshBox(format!("truncated {what}"));

        let total_length = reader.read_u32().map_err(|_| malformed("length field"))?;
        if total_length as usize != data.len() {
            return Err(DrmError::MalformedPsshBox(format!(
                "declared length {total_length} does not match buffer length {}",
                data.len()
            )));
        }

        let _box_type = reader.read_bytes(4).map_err(|_| malformed("box type"))?;
        let version = reader.read_u8().map_err(|_| malformed("version field"))?;
        reader.skip(3).map_err(|_| malformed("flags field"))?;

        let system_id: [u8; 16] = reader
            .read_bytes(16)
            .map_err(|_| malformed("system id"))?
            .try_into()
            .map_err(|_| malformed("system id"))?;

        // Key IDs are all or nothing; a truncated run surfaces no IDs.
        let mut key_ids = Vec::new();
        if version > 0 {
            let count = reader.read_u32().map_err(|_| malformed("key id count"))?;
            for _ in 0..count {
                let bytes: [u8; 16] = reader
                    .read_bytes(16)
                    .map_err(|_| malformed("key id run"))?
                    .try_into()
                    .map_err(|_| malformed("key id run"))?;
                key_ids.push(KeyId::from(bytes));
            }
        }

        let payload_size = reader.read_u32().map_err(|_| malformed("payload size"))?;
        let payload = reader
            .read_bytes(payload_size as usize)
            .map_err(|_| malformed("payload"))?;

        Ok(Self {
            version,
            system_id,
            key_ids,
            payload,
        })
    }
}
