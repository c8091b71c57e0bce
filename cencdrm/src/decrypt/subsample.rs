use crate::{DrmError, Reader, Result, decrypt::AesCtrState};

/// One clear/encrypted byte-run pair inside an encrypted sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsampleRun {
    /// Cleartext bytes at the start of the run.
    pub bytes_clear: u16,
    /// Encrypted bytes following the cleartext.
    pub bytes_encrypted: u32,
}

impl SubsampleRun {
    /// Parse `count` runs from their wire encoding, big-endian
    /// `(u16 clear, u32 encrypted)` pairs.
    ///
    /// Fails with [`DrmError::TruncatedSubsampleTable`] if `data` ends
    /// before `count` entries could be read. The caller must not have
    /// touched the sample payload yet; a sample with an unreadable run
    /// table is rejected whole, never half-decrypted.
    pub fn parse_table(data: &[u8], count: usize) -> Result<Vec<SubsampleRun>> {
        let mut reader = Reader::new_big_endian(data.to_vec());
        let mut runs = Vec::with_capacity(count);

        for _ in 0..count {
            let bytes_clear = reader
                .read_u16()
                .map_err(|_| DrmError::TruncatedSubsampleTable)?;
            let bytes_encrypted = reader
                .read_u32()
                .map_err(|_| DrmError::TruncatedSubsampleTable)?;
            runs.push(SubsampleRun {
                bytes_clear,
                bytes_encrypted,
            });
        }

        Ok(runs)
    }
}

/// Apply `state` to the encrypted spans of `data`, in run order.
///
/// Clear spans are left untouched. If the run table ends before the buffer
/// does, the remainder is treated as one final fully-encrypted run; if a
/// run claims more bytes than remain, it is clamped to the buffer end.
/// Encrypted spans share the single keystream in `state`, so a span may
/// resume mid-block where the previous one stopped.
pub fn apply_runs(state: &mut AesCtrState, data: &mut [u8], runs: &[SubsampleRun]) {
    let len = data.len();
    let mut pos = 0usize;
    let mut runs = runs.iter();

    while pos < len {
        let (clear, encrypted) = match runs.next() {
            Some(run) => (run.bytes_clear as usize, run.bytes_encrypted as usize),
            None => (0, len - pos),
        };

        log::trace!("{clear} bytes clear (todo={})", len - pos);
        pos = (pos + clear).min(len);

        let encrypted = encrypted.min(len - pos);
        if encrypted > 0 {
            log::trace!("{encrypted} bytes encrypted (todo={})", len - pos);
            state.process_in_place(&mut data[pos..pos + encrypted]);
            pos += encrypted;
        }
    }
}
