use argon2::{Algorithm, Argon2, Params, Version};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::crypto::cipher::{KEY_SIZE, SecureKey};
use crate::error::{AppError, Result};

/// Minimum Argon2 salt length accepted by the reference implementation.
const MIN_SALT_LEN: usize = 8;

/// How the externally supplied vault secret becomes the AES-256 master key.
#[derive(Clone, Debug)]
pub enum KeyDerivation {
    /// Argon2id over the secret with a deployment-wide salt.
    Argon2id {
        salt: Vec<u8>,
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    },
    /// A single SHA-256 pass. Only length normalisation, no work factor;
    /// kept so vaults sealed by older deployments still open.
    Sha256,
}

impl KeyDerivation {
    /// Short name used in logs and configuration.
    pub fn name(&self) -> &'static str {
        match self {
            KeyDerivation::Argon2id { .. } => "argon2id",
            KeyDerivation::Sha256 => "sha256",
        }
    }
}

/// Derives the 32-byte master key from `secret`.
///
/// Deterministic for a given secret and derivation, which is what lets a
/// restarted process open blobs sealed by a previous one.
pub fn derive_key(secret: &[u8], derivation: &KeyDerivation) -> Result<SecureKey> {
    if secret.is_empty() {
        return Err(AppError::Encryption("Vault secret must not be empty".to_string()));
    }

    match derivation {
        KeyDerivation::Sha256 => {
            let digest = Sha256::digest(secret);
            let mut key = [0u8; KEY_SIZE];
            key.copy_from_slice(&digest);
            Ok(SecureKey::new(key))
        }
        KeyDerivation::Argon2id {
            salt,
            memory_kib,
            iterations,
            parallelism,
        } => {
            if salt.len() < MIN_SALT_LEN {
                return Err(AppError::Encryption(format!(
                    "Key derivation salt must be at least {} bytes",
                    MIN_SALT_LEN
                )));
            }

            let params = Params::new(*memory_kib, *iterations, *parallelism, Some(KEY_SIZE))
                .map_err(|e| AppError::Encryption(format!("Argon2 params: {}", e)))?;

            let mut key = Zeroizing::new([0u8; KEY_SIZE]);
            Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                .hash_password_into(secret, salt, &mut key[..])
                .map_err(|e| AppError::Encryption(format!("Argon2 key derivation error: {}", e)))?;

            Ok(SecureKey::new(*key))
        }
    }
}
