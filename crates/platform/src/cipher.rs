//! Secret cipher for the reversible (Encrypted) password format.
//!
//! AES-256-GCM keyed by a process-wide secret. The nonce is generated per
//! encryption and packed in front of the ciphertext, so a stored secret is
//! a single opaque base64 string.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, OsRng},
};
use rand::RngCore;
use thiserror::Error;

use crate::crypto::{from_base64, to_base64};

/// Size of the AES-256 key in bytes.
const KEY_SIZE: usize = 32;

/// Size of the GCM nonce in bytes.
const NONCE_SIZE: usize = 12;

/// Errors from secret encryption/decryption.
#[derive(Debug, Error)]
pub enum CipherError {
    #[error("Invalid encryption key length: expected {KEY_SIZE} bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
}

/// Reversible cipher over plaintext secrets.
#[derive(Clone)]
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl SecretCipher {
    /// Create from raw key bytes (must be exactly 32 bytes).
    pub fn from_key(key: &[u8]) -> Result<Self, CipherError> {
        if key.len() != KEY_SIZE {
            return Err(CipherError::InvalidKeyLength(key.len()));
        }

        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| CipherError::InvalidKeyFormat(e.to_string()))?;

        Ok(Self { cipher })
    }

    /// Create from a hex-encoded key string.
    pub fn from_hex_key(key_hex: &str) -> Result<Self, CipherError> {
        let key_bytes = hex::decode(key_hex.trim())
            .map_err(|e| CipherError::InvalidKeyFormat(e.to_string()))?;

        Self::from_key(&key_bytes)
    }

    /// Generate a new random hex-encoded key (for initial setup).
    #[must_use]
    pub fn generate_key() -> String {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        hex::encode(key)
    }

    /// Encrypt a plaintext secret into a single base64 string
    /// (`nonce || ciphertext`).
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;

        let mut packed = nonce_bytes.to_vec();
        packed.extend_from_slice(&ciphertext);

        Ok(to_base64(&packed))
    }

    /// Decrypt a stored secret back to its plaintext.
    pub fn decrypt(&self, stored: &str) -> Result<String, CipherError> {
        let packed =
            from_base64(stored).map_err(|e| CipherError::DecryptionFailed(e.to_string()))?;

        if packed.len() < NONCE_SIZE {
            return Err(CipherError::DecryptionFailed(
                "stored value too short".to_string(),
            ));
        }

        let (nonce_bytes, ciphertext) = packed.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| CipherError::DecryptionFailed(e.to_string()))?;

        String::from_utf8(plaintext).map_err(|e| CipherError::DecryptionFailed(e.to_string()))
    }
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher")
            .field("cipher", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> Vec<u8> {
        (0u8..32).collect()
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = SecretCipher::from_key(&test_key()).unwrap();

        let stored = cipher.encrypt("s3cret-password").unwrap();
        let recovered = cipher.decrypt(&stored).unwrap();

        assert_eq!(recovered, "s3cret-password");
    }

    #[test]
    fn test_encryption_is_randomized() {
        let cipher = SecretCipher::from_key(&test_key()).unwrap();

        let a = cipher.encrypt("same input").unwrap();
        let b = cipher.encrypt("same input").unwrap();

        // Fresh nonce per call
        assert_ne!(a, b);
        assert_eq!(cipher.decrypt(&a).unwrap(), cipher.decrypt(&b).unwrap());
    }

    #[test]
    fn test_wrong_key_fails_decryption() {
        let cipher = SecretCipher::from_key(&test_key()).unwrap();
        let mut wrong_key = test_key();
        wrong_key[0] ^= 0xFF;
        let other = SecretCipher::from_key(&wrong_key).unwrap();

        let stored = cipher.encrypt("s3cret").unwrap();
        assert!(matches!(
            other.decrypt(&stored),
            Err(CipherError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_invalid_key_length() {
        let result = SecretCipher::from_key(&[0u8; 16]);
        assert!(matches!(result, Err(CipherError::InvalidKeyLength(16))));
    }

    #[test]
    fn test_garbage_stored_value() {
        let cipher = SecretCipher::from_key(&test_key()).unwrap();
        assert!(cipher.decrypt("not base64 !!!").is_err());
        assert!(cipher.decrypt("AAAA").is_err()); // shorter than a nonce
    }

    #[test]
    fn test_from_hex_key() {
        let key_hex = SecretCipher::generate_key();
        assert_eq!(key_hex.len(), 64);

        let cipher = SecretCipher::from_hex_key(&key_hex).unwrap();
        let stored = cipher.encrypt("hello").unwrap();
        assert_eq!(cipher.decrypt(&stored).unwrap(), "hello");
    }
}
