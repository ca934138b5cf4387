//! Shared cryptographic primitives for the identity engine.
//!
//! - `crypto` - random bytes, opaque tokens, base64, constant-time compare
//! - `cipher` - AES-256-GCM secret cipher for the reversible password format
//! - `credential` - the credential codec (Clear / Encrypted / Hashed)

pub mod cipher;
pub mod credential;
pub mod crypto;

pub use cipher::{CipherError, SecretCipher};
pub use credential::{
    ClearTextSecret, CredentialCodec, CredentialError, EncodedSecret, HashAlgorithm,
    PasswordFormat,
};
