use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, ParamsBuilder, Version,
};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroize;

use crate::error::{AppError, Result};

/// The memory cost for Argon2 in MB.
const ARGON2_MEMORY_MB: u32 = 19;
/// The number of iterations for Argon2.
const ARGON2_ITERATIONS: u32 = 3;
/// The parallelism factor for Argon2.
const ARGON2_PARALLELISM: u32 = 6;
/// Salt length in bytes.
const SALT_LEN: usize = 16;

/// Argon2id cost parameters for login password hashes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashCost {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Lanes.
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: ARGON2_MEMORY_MB * 1024,
            iterations: ARGON2_ITERATIONS,
            parallelism: ARGON2_PARALLELISM,
        }
    }
}

/// One-way hashing of login passwords into self-describing PHC strings.
pub struct CredentialHasher {
    params: Params,
    /// Hash of a throwaway password at the configured cost, verified against
    /// when a login names an unknown user.
    decoy_hash: String,
}

impl CredentialHasher {
    /// Creates a hasher with the given cost.
    pub fn new(cost: HashCost) -> Result<Self> {
        let params = ParamsBuilder::new()
            .m_cost(cost.memory_kib)
            .t_cost(cost.iterations)
            .p_cost(cost.parallelism)
            .build()
            .map_err(|e| AppError::Encryption(format!("Argon2 params: {}", e)))?;

        let mut hasher = Self {
            params,
            decoy_hash: String::new(),
        };
        hasher.decoy_hash = hasher.hash("passvault-decoy")?;
        Ok(hasher)
    }

    /// Hashes a password using Argon2id with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String> {
        let mut password_bytes = password.as_bytes().to_vec();

        let mut salt_bytes = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt_bytes);

        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| AppError::Encryption(format!("Salt encoding error: {}", e)))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());

        let password_hash = argon2
            .hash_password(&password_bytes, &salt)
            .map_err(|e| AppError::Encryption(format!("Argon2 hash error: {}", e)))?
            .to_string();

        password_bytes.zeroize();
        tracing::debug!("Password hashed successfully with Argon2");
        Ok(password_hash)
    }

    /// Verifies a password against a stored hash.
    ///
    /// Salt and cost come from the hash itself. A malformed hash verifies as
    /// `false`.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Stored password hash is malformed: {}", e);
                return false;
            }
        };

        let mut password_bytes = password.as_bytes().to_vec();
        let result = Argon2::default()
            .verify_password(&password_bytes, &parsed_hash)
            .is_ok();

        password_bytes.zeroize();
        tracing::debug!("Password verification completed");
        result
    }

    /// Spends one verification on the decoy hash and returns `false`.
    ///
    /// Used when there is no stored hash to check, so the unknown-user path
    /// costs the same Argon2 run as a wrong password.
    pub fn verify_decoy(&self, password: &str) -> bool {
        let _ = self.verify(password, &self.decoy_hash);
        false
    }
}
