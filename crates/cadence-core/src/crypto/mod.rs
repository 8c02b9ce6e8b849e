//! Authenticated symmetric encryption (AES-256-GCM) with a PBKDF2-SHA256
//! derived key, for per-user memory files.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::Sha256;

/// Nonce size for AES-256-GCM (12 bytes / 96 bits).
const NONCE_SIZE: usize = 12;

/// Fixed, application-specific salt providing domain separation for the
/// key derivation. Not a secret; the master secret supplies the entropy.
const PBKDF2_SALT: &[u8] = b"cadence-core-encryption-salt-v1";

/// PBKDF2-HMAC-SHA256 iteration count. 100,000 is the floor OWASP
/// recommends for PBKDF2-SHA256 as of this writing.
const PBKDF2_ITERATIONS: u32 = 100_000;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    Encryption(String),
    #[error("decryption failed: {0}")]
    Decryption(String),
    #[error("ciphertext too short: expected at least {NONCE_SIZE} bytes for nonce")]
    CiphertextTooShort,
    #[error("invalid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("decrypted data is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("JSON (de)serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Derive a 256-bit key from a master secret via PBKDF2-HMAC-SHA256.
fn derive_key(master_secret: &[u8]) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(master_secret, PBKDF2_SALT, PBKDF2_ITERATIONS, &mut key);
    key
}

/// AEAD encryptor for JSON payloads, keyed from a master secret.
pub struct Encryptor {
    cipher: Aes256Gcm,
}

impl Encryptor {
    /// Build an encryptor, deriving the AES key from `master_secret` via
    /// PBKDF2-SHA256 at [`PBKDF2_ITERATIONS`] rounds.
    pub fn new(master_secret: &[u8]) -> Self {
        let key = derive_key(master_secret);
        let cipher = Aes256Gcm::new(&key.into());
        Self { cipher }
    }

    /// Encrypt raw bytes. Each call uses a fresh random nonce; the returned
    /// bytes are self-framed as `nonce || ciphertext || tag`.
    pub fn encrypt_bytes(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        aes_gcm::aead::rand_core::RngCore::fill_bytes(&mut OsRng, &mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend(ciphertext);
        Ok(result)
    }

    /// Decrypt bytes framed as `nonce || ciphertext || tag`. A single
    /// typed error covers every integrity failure (tampering, wrong key,
    /// truncation) by design — the caller cannot distinguish causes.
    pub fn decrypt_bytes(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.len() < NONCE_SIZE {
            return Err(CryptoError::CiphertextTooShort);
        }

        let (nonce_bytes, encrypted_data) = ciphertext.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, encrypted_data)
            .map_err(|e| CryptoError::Decryption(e.to_string()))
    }

    /// Encrypt a string, producing a base64url (no padding) wire string.
    pub fn encrypt_str(&self, plaintext: &str) -> Result<String, CryptoError> {
        let ciphertext = self.encrypt_bytes(plaintext.as_bytes())?;
        Ok(URL_SAFE_NO_PAD.encode(ciphertext))
    }

    /// Decrypt a base64url wire string back into a UTF-8 string.
    pub fn decrypt_str(&self, encoded: &str) -> Result<String, CryptoError> {
        let ciphertext = URL_SAFE_NO_PAD.decode(encoded)?;
        let plaintext = self.decrypt_bytes(&ciphertext)?;
        Ok(String::from_utf8(plaintext)?)
    }

    /// Serialize `value` as JSON and encrypt it to a base64url wire string.
    pub fn encrypt_obj<T: Serialize>(&self, value: &T) -> Result<String, CryptoError> {
        let json = serde_json::to_string(value)?;
        self.encrypt_str(&json)
    }

    /// Decrypt a base64url wire string and deserialize it as JSON.
    pub fn decrypt_obj<T: DeserializeOwned>(&self, encoded: &str) -> Result<T, CryptoError> {
        let json = self.decrypt_str(encoded)?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl std::fmt::Debug for Encryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encryptor").field("cipher", &"[REDACTED]").finish()
    }
}
