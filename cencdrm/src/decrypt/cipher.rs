use crate::{DrmError, Result};
use aes::{
    Aes128,
    cipher::{KeyIvInit, StreamCipher, generic_array::GenericArray},
};

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

/// AES-128-CTR keystream state for one sample.
///
/// CENC derives the initial counter block from the sample IV: an 8-byte IV
/// occupies the high-order half of the block with the low 8 bytes zeroed,
/// a 16-byte IV is the counter block verbatim. The whole 128-bit block is
/// incremented big-endian as keystream is consumed.
///
/// The keystream position carries across calls, so a sample split into
/// several encrypted subsample spans is processed with one state and the
/// later spans resume mid-block where the earlier ones stopped.
pub struct AesCtrState {
    cipher: Aes128Ctr,
}

impl AesCtrState {
    /// Create a cipher state bound to `key` and `iv`.
    ///
    /// The key must be 16 bytes and the IV 8 or 16 bytes; anything else is
    /// a construction failure, there is no way to limp along with bad key
    /// material.
    pub fn new(key: &[u8], iv: &[u8]) -> Result<Self> {
        if key.len() != 16 {
            return Err(DrmError::InvalidKeyMaterial {
                what: "key",
                expected: "16",
                actual: key.len(),
            });
        }

        let mut counter_block = [0u8; 16];
        match iv.len() {
            8 => counter_block[..8].copy_from_slice(iv),
            16 => counter_block.copy_from_slice(iv),
            n => {
                return Err(DrmError::InvalidKeyMaterial {
                    what: "iv",
                    expected: "8 or 16",
                    actual: n,
                });
            }
        }

        Ok(Self {
            cipher: Aes128Ctr::new(
                GenericArray::from_slice(key),
                GenericArray::from_slice(&counter_block),
            ),
        })
    }

    /// XOR `data` with the next `data.len()` keystream bytes, in place.
    ///
    /// CTR mode is symmetric, so this is both encryption and decryption.
    pub fn process_in_place(&mut self, data: &mut [u8]) {
        self.cipher.apply_keystream(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // NIST SP800-38A section F.5; CTR-AES128.
    const KEY: [u8; 16] = [
        0x2b, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6, 0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf, 0x4f,
        0x3c,
    ];
    const IV: [u8; 16] = [
        0xf0, 0xf1, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8, 0xf9, 0xfa, 0xfb, 0xfc, 0xfd, 0xfe,
        0xff,
    ];
    const PLAINTEXT: [u8; 64] = [
        0x6b, 0xc1, 0xbe, 0xe2, 0x2e, 0x40, 0x9f, 0x96, 0xe9, 0x3d, 0x7e, 0x11, 0x73, 0x93, 0x17,
        0x2a, 0xae, 0x2d, 0x8a, 0x57, 0x1e, 0x03, 0xac, 0x9c, 0x9e, 0xb7, 0x6f, 0xac, 0x45, 0xaf,
        0x8e, 0x51, 0x30, 0xc8, 0x1c, 0x46, 0xa3, 0x5c, 0xe4, 0x11, 0xe5, 0xfb, 0xc1, 0x19, 0x1a,
        0x0a, 0x52, 0xef, 0xf6, 0x9f, 0x24, 0x45, 0xdf, 0x4f, 0x9b, 0x17, 0xad, 0x2b, 0x41, 0x7b,
        0xe6, 0x6c, 0x37, 0x10,
    ];
    const CIPHERTEXT: [u8; 64] = [
        0x87, 0x4d, 0x61, 0x91, 0xb6, 0x20, 0xe3, 0x26, 0x1b, 0xef, 0x68, 0x64, 0x99, 0x0d, 0xb6,
        0xce, 0x98, 0x06, 0xf6, 0x6b, 0x79, 0x70, 0xfd, 0xff, 0x86, 0x17, 0x18, 0x7b, 0xb9, 0xff,
        0xfd, 0xff, 0x5a, 0xe4, 0xdf, 0x3e, 0xdb, 0xd5, 0xd3, 0x5e, 0x5b, 0x4f, 0x09, 0x02, 0x0d,
        0xb0, 0x3e, 0xab, 0x1e, 0x03, 0x1d, 0xda, 0x2f, 0xbe, 0x03, 0xd1, 0x79, 0x21, 0x70, 0xa0,
        0xf3, 0x00, 0x9c, 0xee,
    ];

    #[test]
    fn test_nist_decrypt_single_call() {
        let mut state = AesCtrState::new(&KEY, &IV).unwrap();
        let mut data = CIPHERTEXT;
        state.process_in_place(&mut data);
        assert_eq!(data, PLAINTEXT);
    }

    #[test]
    fn test_nist_decrypt_per_block_calls() {
        let mut state = AesCtrState::new(&KEY, &IV).unwrap();
        let mut data = CIPHERTEXT;
        for block in data.chunks_mut(16) {
            state.process_in_place(block);
        }
        assert_eq!(data, PLAINTEXT);
    }

    #[test]
    fn test_mid_block_resumption() {
        // Splitting at a non-block-aligned offset must not restart the
        // keystream block.
        for split in [1, 7, 15, 17, 23, 33, 63] {
            let mut state = AesCtrState::new(&KEY, &IV).unwrap();
            let mut data = CIPHERTEXT;
            let (head, tail) = data.split_at_mut(split);
            state.process_in_place(head);
            state.process_in_place(tail);
            assert_eq!(data, PLAINTEXT, "split at {split}");
        }
    }

    #[test]
    fn test_ctr_symmetry() {
        let mut encrypt = AesCtrState::new(&KEY, &IV).unwrap();
        let mut decrypt = AesCtrState::new(&KEY, &IV).unwrap();
        let original: Vec<u8> = (0u8..=255).collect();

        let mut data = original.clone();
        encrypt.process_in_place(&mut data);
        assert_ne!(data, original);
        decrypt.process_in_place(&mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn test_short_iv_occupies_high_bytes() {
        // An 8-byte IV must behave exactly like the 16-byte IV formed by
        // appending 8 zero bytes.
        let short_iv = &IV[..8];
        let mut padded_iv = [0u8; 16];
        padded_iv[..8].copy_from_slice(short_iv);

        let mut a = AesCtrState::new(&KEY, short_iv).unwrap();
        let mut b = AesCtrState::new(&KEY, &padded_iv).unwrap();

        let mut data_a = PLAINTEXT;
        let mut data_b = PLAINTEXT;
        a.process_in_place(&mut data_a);
        b.process_in_place(&mut data_b);
        assert_eq!(data_a, data_b);
    }

    #[test]
    fn test_invalid_key_material() {
        assert!(matches!(
            AesCtrState::new(&KEY[..15], &IV),
            Err(DrmError::InvalidKeyMaterial { what: "key", .. })
        ));
        assert!(matches!(
            AesCtrState::new(&KEY, &IV[..12]),
            Err(DrmError::InvalidKeyMaterial { what: "iv", .. })
        ));
        assert!(matches!(
            AesCtrState::new(&KEY, &[]),
            Err(DrmError::InvalidKeyMaterial { what: "iv", .. })
        ));
    }
}
