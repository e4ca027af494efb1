use base64::{Engine as _, engine::general_purpose};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// The size of a session token in bytes.
const SESSION_TOKEN_SIZE: usize = 32;

/// Generates a new random session token.
///
/// # Returns
///
/// A URL-safe base64-encoded token carrying 256 bits of entropy.
pub fn generate_session_token() -> String {
    let mut token = [0u8; SESSION_TOKEN_SIZE];
    OsRng.fill_bytes(&mut token);

    general_purpose::URL_SAFE_NO_PAD.encode(token)
}

/// Returns the hex SHA-256 of a token, used as its storage key so a dump of the
/// session store does not contain live cookies.
pub fn token_fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
