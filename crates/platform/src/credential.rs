//! Credential Codec
//!
//! Encodes a plaintext secret into its storable form and verifies candidate
//! secrets against stored records. Three storage formats are supported:
//!
//! - `Clear` - stored value equals the plaintext
//! - `Encrypted` - reversible cipher keyed by a process-wide secret
//! - `Hashed` - salted one-way digest under a configured algorithm
//!
//! The format switch lives here and only here; registration, password change
//! and login all go through the same codec.

use std::fmt;
use std::str::FromStr;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::cipher::{CipherError, SecretCipher};
use crate::crypto::{constant_time_eq, from_base64, random_bytes, to_base64};

/// Salt length in bytes for the salted-digest algorithms.
const SALT_BYTES: usize = 16;

/// Errors from encoding credentials or constructing codec inputs.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The plaintext secret is empty or whitespace-only
    #[error("Secret cannot be empty")]
    EmptySecret,

    /// Encryption layer failure
    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// Hashing operation failed
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    /// Unknown password format name or id
    #[error("Unknown password format: {0}")]
    UnknownFormat(String),

    /// Unknown hash algorithm name
    #[error("Unknown hash algorithm: {0}")]
    UnknownAlgorithm(String),
}

/// Storage format of a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PasswordFormat {
    /// Plaintext storage (legacy installs only)
    Clear,
    /// Salted one-way hash
    Hashed,
    /// Reversible encryption keyed by a process-wide secret
    Encrypted,
}

impl PasswordFormat {
    /// Stable storage id.
    pub fn id(self) -> i32 {
        match self {
            Self::Clear => 0,
            Self::Hashed => 1,
            Self::Encrypted => 2,
        }
    }

    /// Resolve from a stable storage id.
    pub fn from_id(id: i32) -> Result<Self, CredentialError> {
        match id {
            0 => Ok(Self::Clear),
            1 => Ok(Self::Hashed),
            2 => Ok(Self::Encrypted),
            other => Err(CredentialError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for PasswordFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Clear => "Clear",
            Self::Hashed => "Hashed",
            Self::Encrypted => "Encrypted",
        };
        write!(f, "{name}")
    }
}

impl FromStr for PasswordFormat {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clear" => Ok(Self::Clear),
            "hashed" => Ok(Self::Hashed),
            "encrypted" => Ok(Self::Encrypted),
            other => Err(CredentialError::UnknownFormat(other.to_string())),
        }
    }
}

/// Hash algorithm for the `Hashed` format.
///
/// Each stored credential records the algorithm it was hashed with, so
/// history verification keeps working after the configured algorithm changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
    Argon2id,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
            Self::Argon2id => "ARGON2ID",
        };
        write!(f, "{name}")
    }
}

impl FromStr for HashAlgorithm {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SHA256" => Ok(Self::Sha256),
            "SHA512" => Ok(Self::Sha512),
            "ARGON2ID" => Ok(Self::Argon2id),
            other => Err(CredentialError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// The storable form of a secret.
///
/// `salt` and `algorithm` are present iff the format is `Hashed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedSecret {
    pub format: PasswordFormat,
    pub secret: String,
    pub salt: Option<String>,
    pub algorithm: Option<HashAlgorithm>,
}

/// Clear text secret with automatic memory zeroization.
///
/// Does not implement `Clone`; `Debug` output is redacted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextSecret(String);

impl ClearTextSecret {
    /// Wrap a plaintext secret, rejecting empty/whitespace-only input.
    pub fn new(raw: impl Into<String>) -> Result<Self, CredentialError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(CredentialError::EmptySecret);
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClearTextSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextSecret").field(&"[REDACTED]").finish()
    }
}

/// Encodes and verifies credentials for all three storage formats.
#[derive(Clone)]
pub struct CredentialCodec {
    cipher: SecretCipher,
    algorithm: HashAlgorithm,
}

impl CredentialCodec {
    pub fn new(cipher: SecretCipher, algorithm: HashAlgorithm) -> Self {
        Self { cipher, algorithm }
    }

    /// The currently configured hash algorithm for new `Hashed` credentials.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Encode a plaintext secret into its storable form.
    pub fn encode(
        &self,
        format: PasswordFormat,
        plaintext: &ClearTextSecret,
    ) -> Result<EncodedSecret, CredentialError> {
        match format {
            PasswordFormat::Clear => Ok(EncodedSecret {
                format,
                secret: plaintext.as_str().to_string(),
                salt: None,
                algorithm: None,
            }),
            PasswordFormat::Encrypted => Ok(EncodedSecret {
                format,
                secret: self.cipher.encrypt(plaintext.as_str())?,
                salt: None,
                algorithm: None,
            }),
            PasswordFormat::Hashed => self.encode_hashed(plaintext),
        }
    }

    fn encode_hashed(&self, plaintext: &ClearTextSecret) -> Result<EncodedSecret, CredentialError> {
        match self.algorithm {
            HashAlgorithm::Sha256 | HashAlgorithm::Sha512 => {
                let salt = random_bytes(SALT_BYTES);
                let digest = salted_digest(self.algorithm, &salt, plaintext.as_str());
                Ok(EncodedSecret {
                    format: PasswordFormat::Hashed,
                    secret: digest,
                    salt: Some(to_base64(&salt)),
                    algorithm: Some(self.algorithm),
                })
            }
            HashAlgorithm::Argon2id => {
                let salt = SaltString::generate(OsRng);
                let hash = Argon2::default()
                    .hash_password(plaintext.as_str().as_bytes(), &salt)
                    .map_err(|e| CredentialError::HashingFailed(e.to_string()))?;
                Ok(EncodedSecret {
                    format: PasswordFormat::Hashed,
                    secret: hash.to_string(),
                    salt: Some(salt.as_str().to_string()),
                    algorithm: Some(HashAlgorithm::Argon2id),
                })
            }
        }
    }

    /// Verify a candidate secret against a stored record.
    ///
    /// A missing credential or an empty candidate is `false`, never an error.
    pub fn verify(&self, stored: Option<&EncodedSecret>, candidate: &str) -> bool {
        let Some(stored) = stored else {
            return false;
        };
        if candidate.is_empty() {
            return false;
        }

        match stored.format {
            PasswordFormat::Clear => {
                constant_time_eq(stored.secret.as_bytes(), candidate.as_bytes())
            }
            PasswordFormat::Encrypted => match self.cipher.decrypt(&stored.secret) {
                // The cipher is nonce-randomized, so comparison happens on
                // the recovered plaintext rather than by re-encrypting.
                Ok(plain) => constant_time_eq(plain.as_bytes(), candidate.as_bytes()),
                Err(_) => false,
            },
            PasswordFormat::Hashed => self.verify_hashed(stored, candidate),
        }
    }

    fn verify_hashed(&self, stored: &EncodedSecret, candidate: &str) -> bool {
        // Fall back to the configured algorithm for records that predate
        // per-credential algorithm tracking.
        let algorithm = stored.algorithm.unwrap_or(self.algorithm);

        match algorithm {
            HashAlgorithm::Sha256 | HashAlgorithm::Sha512 => {
                let Some(salt_b64) = stored.salt.as_deref() else {
                    return false;
                };
                let Ok(salt) = from_base64(salt_b64) else {
                    return false;
                };
                let digest = salted_digest(algorithm, &salt, candidate);
                constant_time_eq(digest.as_bytes(), stored.secret.as_bytes())
            }
            HashAlgorithm::Argon2id => {
                let Ok(hash) = PasswordHash::new(&stored.secret) else {
                    return false;
                };
                // Argon2 uses constant-time comparison internally
                Argon2::default()
                    .verify_password(candidate.as_bytes(), &hash)
                    .is_ok()
            }
        }
    }
}

impl fmt::Debug for CredentialCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialCodec")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Hex digest of `salt || plaintext` under a salted-digest algorithm.
fn salted_digest(algorithm: HashAlgorithm, salt: &[u8], plaintext: &str) -> String {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(salt);
            hasher.update(plaintext.as_bytes());
            hex::encode(hasher.finalize())
        }
        HashAlgorithm::Sha512 => {
            let mut hasher = Sha512::new();
            hasher.update(salt);
            hasher.update(plaintext.as_bytes());
            hex::encode(hasher.finalize())
        }
        HashAlgorithm::Argon2id => unreachable!("argon2 does not use the digest path"),
    }
}
