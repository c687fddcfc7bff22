//! AES-256-GCM envelope encryption for stored credentials.
//!
//! Every call to [`encrypt`] draws a fresh 96-bit nonce. The nonce is
//! prepended to the ciphertext and the whole blob is base64-encoded so it fits
//! in a single TEXT column.

use super::CredentialError;
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

/// Size of the encryption key in bytes (256 bits)
const KEY_SIZE: usize = 32;

/// Size of the nonce in bytes (96 bits, standard for GCM)
const NONCE_SIZE: usize = 12;

/// Size of the GCM authentication tag in bytes
const TAG_SIZE: usize = 16;

/// Validates that the master key decodes to exactly 32 bytes.
///
/// # Arguments
/// * `key_base64` - Base64-encoded master key
///
/// # Returns
/// * `Ok(Vec<u8>)` - Decoded key bytes (32 bytes)
/// * `Err(CredentialError::InvalidKey)` - Wrong length or invalid base64
pub fn validate_key(key_base64: &str) -> Result<Vec<u8>, CredentialError> {
    let key_bytes = BASE64
        .decode(key_base64.trim())
        .map_err(|e| CredentialError::InvalidKey(format!("not valid base64: {}", e)))?;

    if key_bytes.len() != KEY_SIZE {
        return Err(CredentialError::InvalidKey(format!(
            "key must be {} bytes (256 bits), got {} bytes",
            KEY_SIZE,
            key_bytes.len()
        )));
    }

    Ok(key_bytes)
}

/// Encrypts plaintext and returns `base64(nonce ‖ ciphertext)`.
pub fn encrypt(plaintext: &str, key: &[u8]) -> Result<String, CredentialError> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CredentialError::InvalidKey(e.to_string()))?;

    // Never reuse a nonce under the same key
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|e| CredentialError::Encryption(e.to_string()))?;

    let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);

    Ok(BASE64.encode(blob))
}

/// Decrypts a blob produced by [`encrypt`].
///
/// Fails closed: any decoding problem, short blob, wrong key or tag mismatch
/// yields [`CredentialError::DecryptionFailed`] and no plaintext.
pub fn decrypt(blob: &str, key: &[u8]) -> Result<String, CredentialError> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CredentialError::InvalidKey(e.to_string()))?;

    let data = BASE64
        .decode(blob)
        .map_err(|_| CredentialError::DecryptionFailed)?;

    if data.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CredentialError::DecryptionFailed);
    }

    let (nonce, ciphertext) = data.split_at(NONCE_SIZE);

    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CredentialError::DecryptionFailed)?;

    String::from_utf8(plaintext).map_err(|_| CredentialError::DecryptionFailed)
}
