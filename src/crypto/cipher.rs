//! AES-256-GCM sealing of individual vault fields.
//!
//! Every call to [`VaultCipher::encrypt`] draws a fresh 96-bit nonce from the
//! OS CSPRNG. The stored blob is the standard-base64 encoding of
//!
//! ```text
//! [ nonce (12) | auth tag (16) | ciphertext (variable) ]
//! ```
//!
//! and this layout is relied on by existing vaults, so it must not change.

use aes_gcm::{
    aead::{AeadInPlace, KeyInit, OsRng},
    AeadCore, Aes256Gcm, Nonce, Tag,
};
use base64::{Engine as _, engine::general_purpose};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{AppError, Result};

/// The size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// The size of the AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// The size of the AES-GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// A secure key wrapper that ensures the key is zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecureKey([u8; KEY_SIZE]);

impl SecureKey {
    /// Creates a new `SecureKey` from a byte array.
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self(key)
    }

    /// Returns a reference to the key as a byte array.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// Encrypts and decrypts vault secrets under the process-wide master key.
///
/// The key is fixed at construction; the cipher keeps no other state.
pub struct VaultCipher {
    key: SecureKey,
}

impl VaultCipher {
    /// Creates a cipher bound to an already-derived master key.
    pub fn new(key: SecureKey) -> Self {
        Self { key }
    }

    fn aead(&self) -> Aes256Gcm {
        Aes256Gcm::new(self.key.as_bytes().into())
    }

    /// Seals `plaintext` and returns the base64 blob `nonce ‖ tag ‖ ciphertext`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let mut buffer = Zeroizing::new(plaintext.to_vec());
        let tag = self
            .aead()
            .encrypt_in_place_detached(&nonce, b"", buffer.as_mut_slice())
            .map_err(|e| AppError::Encryption(format!("Encryption failed: {}", e)))?;

        let mut blob = Vec::with_capacity(NONCE_SIZE + TAG_SIZE + buffer.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&tag);
        blob.extend_from_slice(&buffer);

        Ok(general_purpose::STANDARD.encode(blob))
    }

    /// Opens a blob produced by [`VaultCipher::encrypt`].
    ///
    /// Anything other than an intact blob sealed under this key fails with
    /// [`AppError::Integrity`].
    pub fn decrypt(&self, blob: &str) -> Result<Zeroizing<Vec<u8>>> {
        let raw = general_purpose::STANDARD
            .decode(blob.trim())
            .map_err(|_| AppError::Integrity)?;

        if raw.len() < NONCE_SIZE + TAG_SIZE {
            return Err(AppError::Integrity);
        }

        let (nonce, rest) = raw.split_at(NONCE_SIZE);
        let (tag, ciphertext) = rest.split_at(TAG_SIZE);

        let mut buffer = Zeroizing::new(ciphertext.to_vec());
        self.aead()
            .decrypt_in_place_detached(
                Nonce::from_slice(nonce),
                b"",
                buffer.as_mut_slice(),
                Tag::from_slice(tag),
            )
            .map_err(|_| AppError::Integrity)?;

        Ok(buffer)
    }

    /// Opens a blob and interprets the plaintext as UTF-8.
    pub fn decrypt_string(&self, blob: &str) -> Result<Zeroizing<String>> {
        let bytes = self.decrypt(blob)?;
        let text = std::str::from_utf8(&bytes).map_err(|_| AppError::Integrity)?;
        Ok(Zeroizing::new(text.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aes_gcm::aead::Aead;

    fn cipher(fill: u8) -> VaultCipher {
        VaultCipher::new(SecureKey::new([fill; KEY_SIZE]))
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let cipher = cipher(0xAB);
        let blob = cipher.encrypt(b"secret123").unwrap();
        let plaintext = cipher.decrypt(&blob).unwrap();
        assert_eq!(plaintext.as_slice(), b"secret123");
    }

    #[test]
    fn empty_plaintext_roundtrips() {
        let cipher = cipher(0x01);
        let blob = cipher.encrypt(b"").unwrap();

        let raw = general_purpose::STANDARD.decode(&blob).unwrap();
        assert_eq!(raw.len(), NONCE_SIZE + TAG_SIZE);

        let plaintext = cipher.decrypt(&blob).unwrap();
        assert!(plaintext.is_empty());
    }

    #[test]
    fn same_plaintext_gives_different_blobs() {
        let cipher = cipher(0xCD);
        let first = cipher.encrypt(b"hunter2").unwrap();
        let second = cipher.encrypt(b"hunter2").unwrap();

        assert_ne!(first, second);
        assert_eq!(cipher.decrypt(&first).unwrap().as_slice(), b"hunter2");
        assert_eq!(cipher.decrypt(&second).unwrap().as_slice(), b"hunter2");
    }

    #[test]
    fn blob_layout_is_nonce_tag_ciphertext() {
        let key = [0x42u8; KEY_SIZE];
        let cipher = VaultCipher::new(SecureKey::new(key));
        let blob = cipher.encrypt(b"layout check").unwrap();
        let raw = general_purpose::STANDARD.decode(&blob).unwrap();

        let (nonce, rest) = raw.split_at(NONCE_SIZE);
        let (tag, ciphertext) = rest.split_at(TAG_SIZE);

        // aes-gcm's combined form is ciphertext ‖ tag.
        let mut combined = ciphertext.to_vec();
        combined.extend_from_slice(tag);

        let plain = Aes256Gcm::new((&key).into())
            .decrypt(Nonce::from_slice(nonce), combined.as_slice())
            .unwrap();
        assert_eq!(plain, b"layout check");
    }

    #[test]
    fn every_bit_flip_is_rejected() {
        let cipher = cipher(0x77);
        let blob = cipher.encrypt(b"tamper me").unwrap();
        let raw = general_purpose::STANDARD.decode(&blob).unwrap();

        for byte in 0..raw.len() {
            for bit in 0..8 {
                let mut corrupted = raw.clone();
                corrupted[byte] ^= 1 << bit;
                let encoded = general_purpose::STANDARD.encode(&corrupted);
                assert!(
                    matches!(cipher.decrypt(&encoded), Err(AppError::Integrity)),
                    "flip of byte {} bit {} was accepted",
                    byte,
                    bit
                );
            }
        }
    }

    #[test]
    fn short_blob_is_integrity_error() {
        let cipher = cipher(0x10);
        for len in [0usize, 1, 12, 27] {
            let encoded = general_purpose::STANDARD.encode(vec![0u8; len]);
            assert!(matches!(cipher.decrypt(&encoded), Err(AppError::Integrity)));
        }
    }

    #[test]
    fn invalid_base64_is_integrity_error() {
        let cipher = cipher(0x10);
        assert!(matches!(cipher.decrypt("not base64 at all!"), Err(AppError::Integrity)));
    }

    #[test]
    fn wrong_key_is_integrity_error() {
        let blob = cipher(0x11).encrypt(b"top secret").unwrap();
        assert!(matches!(cipher(0x22).decrypt(&blob), Err(AppError::Integrity)));
    }

    #[test]
    fn decrypt_string_rejects_invalid_utf8() {
        let cipher = cipher(0x33);
        let blob = cipher.encrypt(&[0xFF, 0xFE, 0xFD]).unwrap();
        assert!(matches!(cipher.decrypt_string(&blob), Err(AppError::Integrity)));

        let blob = cipher.encrypt("pässwörd".as_bytes()).unwrap();
        assert_eq!(cipher.decrypt_string(&blob).unwrap().as_str(), "pässwörd");
    }
}
