//! Payload encryption
//!
//! Devices encrypt JSON payloads with AES-128 in ECB mode and PKCS#7 padding
//! under their 16 byte local key. Version 3.1 control payloads are base64
//! encoded and signed with a truncated MD5 digest. Discovery broadcasts use a
//! fixed key shared by every device.

use std::sync::LazyLock;

use aes::Aes128;
use aes::cipher::{Block, BlockDecrypt, BlockEncrypt, KeyInit};
use base64::prelude::*;
use md5::{Digest, Md5};
use tracing::trace;

use crate::constants::UDP_KEY_SEED;
use crate::error::{Error, Result};

/// AES block size
pub const BLOCK_SIZE: usize = 16;

/// MD5 of the broadcast seed, computed once.
static UDP_KEY: LazyLock<[u8; 16]> = LazyLock::new(|| {
    let digest = Md5::digest(UDP_KEY_SEED);
    let mut key = [0u8; 16];
    key.copy_from_slice(&digest);
    key
});

/// Key used for discovery broadcasts only
pub fn udp_key() -> &'static [u8; 16] {
    &UDP_KEY
}

/// AES-128-ECB cipher bound to one key
pub struct Cipher {
    inner: Aes128,
}

impl Cipher {
    /// Create a cipher from a 16 byte key
    pub fn new(key: &[u8]) -> Result<Self> {
        let inner = Aes128::new_from_slice(key).map_err(|_| Error::InvalidKeyLength(key.len()))?;
        Ok(Self { inner })
    }

    /// Pad and encrypt, optionally base64 encoding the ciphertext
    ///
    /// A full block of padding is added when the input is already aligned.
    pub fn encrypt(&self, plaintext: &[u8], encode_as_text: bool) -> Vec<u8> {
        let padding_len = BLOCK_SIZE - plaintext.len() % BLOCK_SIZE;
        let mut buf = Vec::with_capacity(plaintext.len() + padding_len);
        buf.extend_from_slice(plaintext);
        buf.resize(plaintext.len() + padding_len, padding_len as u8);

        for chunk in buf.chunks_exact_mut(BLOCK_SIZE) {
            self.inner.encrypt_block(Block::<Aes128>::from_mut_slice(chunk));
        }

        if encode_as_text {
            BASE64_STANDARD.encode(&buf).into_bytes()
        } else {
            buf
        }
    }

    /// Decrypt and strip padding, optionally base64 decoding first
    pub fn decrypt(&self, ciphertext: &[u8], is_base64: bool) -> Result<Vec<u8>> {
        let mut buf = if is_base64 {
            BASE64_STANDARD.decode(ciphertext)?
        } else {
            ciphertext.to_vec()
        };

        if buf.is_empty() || buf.len() % BLOCK_SIZE != 0 {
            return Err(Error::InvalidCiphertextLength(buf.len()));
        }

        for chunk in buf.chunks_exact_mut(BLOCK_SIZE) {
            self.inner.decrypt_block(Block::<Aes128>::from_mut_slice(chunk));
        }

        // Length is non-zero here
        let padding_len = buf[buf.len() - 1];
        if padding_len == 0 || padding_len as usize > BLOCK_SIZE {
            return Err(Error::InvalidPadding(padding_len));
        }
        buf.truncate(buf.len() - padding_len as usize);

        Ok(buf)
    }
}

/// Encrypt `plaintext` under `key`
///
/// # Examples
///
/// ```
/// use tuyalink_core::crypto;
///
/// let key = b"0123456789abcdef";
/// let sealed = crypto::encrypt(key, b"{\"dps\":{}}", false).unwrap();
/// assert_eq!(sealed.len(), 16);
/// assert_eq!(crypto::decrypt(key, &sealed, false).unwrap(), b"{\"dps\":{}}");
/// ```
pub fn encrypt(key: &[u8], plaintext: &[u8], encode_as_text: bool) -> Result<Vec<u8>> {
    Ok(Cipher::new(key)?.encrypt(plaintext, encode_as_text))
}

/// Decrypt `ciphertext` under `key`
pub fn decrypt(key: &[u8], ciphertext: &[u8], is_base64: bool) -> Result<Vec<u8>> {
    Cipher::new(key)?.decrypt(ciphertext, is_base64)
}

/// Decrypt a discovery broadcast payload with the fixed UDP key
pub fn decrypt_udp(ciphertext: &[u8]) -> Result<Vec<u8>> {
    decrypt(udp_key(), ciphertext, false)
}

/// Version 3.1 control payload signature
///
/// Hex characters 8..32 of
/// `MD5("data=" || ciphertext || "||lpv=" || version_tag || "||" || key)`.
pub fn sign_v31(ciphertext: &[u8], version_tag: &[u8], key: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(b"data=");
    hasher.update(ciphertext);
    hasher.update(b"||lpv=");
    hasher.update(version_tag);
    hasher.update(b"||");
    hasher.update(key);

    let digest = hex::encode(hasher.finalize());
    trace!(digest = %digest, "Signed v3.1 payload");

    digest[8..].to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const KEY: &[u8; 16] = b"0123456789abcdef";

    #[test]
    fn test_aligned_input_gets_full_padding_block() {
        let sealed = encrypt(KEY, &[0x41; 16], false).unwrap();
        assert_eq!(sealed.len(), 32);

        let cipher = Cipher::new(KEY).unwrap();
        let mut last = sealed[16..].to_vec();
        cipher.inner.decrypt_block(Block::<Aes128>::from_mut_slice(&mut last));
        assert_eq!(last, vec![16u8; 16]);
    }

    #[test]
    fn test_empty_input_is_one_padding_block() {
        let sealed = encrypt(&[0u8; 16], &[], false).unwrap();
        let cipher = Cipher::new(&[0u8; 16]).unwrap();
        let mut block = [16u8; 16];
        cipher.inner.encrypt_block(Block::<Aes128>::from_mut_slice(&mut block));
        assert_eq!(sealed, block.to_vec());
    }

    #[test]
    fn test_base64_round_trip() {
        let text = encrypt(KEY, b"{\"1\":true}", true).unwrap();
        assert!(text.iter().all(|b| b.is_ascii()));
        assert_eq!(text.len(), 24);
        assert_eq!(decrypt(KEY, &text, true).unwrap(), b"{\"1\":true}");
    }

    #[test]
    fn test_invalid_key_length() {
        assert!(matches!(encrypt(b"short", b"x", false), Err(Error::InvalidKeyLength(5))));
        assert!(matches!(decrypt(b"", &[0; 16], false), Err(Error::InvalidKeyLength(0))));
    }

    #[test]
    fn test_unaligned_ciphertext() {
        assert!(matches!(
            decrypt(KEY, &[0u8; 17], false),
            Err(Error::InvalidCiphertextLength(17))
        ));
        assert!(matches!(
            decrypt(KEY, &[], false),
            Err(Error::InvalidCiphertextLength(0))
        ));
    }

    #[test]
    fn test_invalid_padding() {
        let cipher = Cipher::new(KEY).unwrap();
        let mut block = [0u8; 16];
        cipher.inner.encrypt_block(Block::<Aes128>::from_mut_slice(&mut block));
        assert!(matches!(cipher.decrypt(&block, false), Err(Error::InvalidPadding(0))));
    }

    #[test]
    fn test_invalid_base64() {
        assert!(matches!(decrypt(KEY, b"not*base64", true), Err(Error::Base64(_))));
    }

    #[test]
    fn test_udp_key_is_md5_of_seed() {
        assert_eq!(hex::encode(udp_key()), hex::encode(Md5::digest(UDP_KEY_SEED)));

        let sealed = encrypt(udp_key(), b"{\"ip\":\"10.0.0.2\"}", false).unwrap();
        assert_eq!(decrypt_udp(&sealed).unwrap(), b"{\"ip\":\"10.0.0.2\"}");
    }

    #[test]
    fn test_sign_v31() {
        let ciphertext = b"c2VjcmV0";
        let signature = sign_v31(ciphertext, b"3.1", KEY);

        let mut input = b"data=c2VjcmV0||lpv=3.1||".to_vec();
        input.extend_from_slice(KEY);
        let full = hex::encode(Md5::digest(&input));

        assert_eq!(signature.len(), 24);
        assert_eq!(signature, &full[8..32]);
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            plaintext in prop::collection::vec(any::<u8>(), 0..512),
            text in any::<bool>(),
        ) {
            let sealed = encrypt(KEY, &plaintext, text).unwrap();
            prop_assert_eq!(decrypt(KEY, &sealed, text).unwrap(), plaintext);
        }

        #[test]
        fn prop_ciphertext_is_block_aligned(
            plaintext in prop::collection::vec(any::<u8>(), 0..256),
        ) {
            let sealed = encrypt(KEY, &plaintext, false).unwrap();
            prop_assert_eq!(sealed.len() % BLOCK_SIZE, 0);
            prop_assert!(sealed.len() > plaintext.len());
        }
    }
}
