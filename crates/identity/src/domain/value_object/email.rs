//! Email Value Object
//!
//! Validated email address. Basic shape validation only - proof of control
//! happens through the revalidation token flow.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{IdentityError, IdentityResult};

/// Maximum accepted email length.
pub const EMAIL_MAX_LENGTH: usize = 100;

/// Email address value object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    /// Create a new email with validation
    pub fn new(email: impl Into<String>) -> IdentityResult<Self> {
        let email = email.into().trim().to_lowercase();

        if email.is_empty() {
            return Err(IdentityError::EmailMissing);
        }

        if email.len() > EMAIL_MAX_LENGTH {
            return Err(IdentityError::EmailInvalid);
        }

        if !Self::is_valid_format(&email) {
            return Err(IdentityError::EmailInvalid);
        }

        Ok(Self(email))
    }

    /// Basic email format validation
    fn is_valid_format(email: &str) -> bool {
        // Must contain exactly one @
        let Some((local, domain)) = email.split_once('@') else {
            return false;
        };
        if local.contains('@') || domain.contains('@') {
            return false;
        }

        // Local part checks
        if local.is_empty() || local.len() > 64 {
            return false;
        }

        // Domain checks
        if domain.is_empty() || !domain.contains('.') {
            return false;
        }

        if !domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return false;
        }

        // Domain shouldn't start or end with dot or hyphen
        if domain.starts_with('.') || domain.ends_with('.') {
            return false;
        }
        if domain.starts_with('-') || domain.ends_with('-') {
            return false;
        }

        true
    }

    /// Create from a stored value (assumed already validated)
    pub fn from_db(email: impl Into<String>) -> Self {
        Self(email.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl FromStr for Email {
    type Err = IdentityError;

    fn from_str(s: &str) -> IdentityResult<Self> {
        Email::new(s)
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
