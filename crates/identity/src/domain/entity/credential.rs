//! Credential Record
//!
//! One row per password ever set for an identity. Insert-only: records are
//! never updated or deleted, and the current credential is the one with the
//! latest creation timestamp. History is retained so a new password can be
//! checked against recently used ones.

use chrono::{DateTime, Utc};
use platform::EncodedSecret;

/// One historical password record
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    /// Owning identity
    pub identity_id: i64,
    /// Stored form: format, secret, optional salt and hash algorithm
    pub secret: EncodedSecret,
    /// Creation timestamp; recency decides which credential is current
    pub created_at: DateTime<Utc>,
}

impl CredentialRecord {
    pub fn new(identity_id: i64, secret: EncodedSecret, now: DateTime<Utc>) -> Self {
        Self {
            identity_id,
            secret,
            created_at: now,
        }
    }
}
