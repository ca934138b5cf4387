//! Username Value Object

use serde::{Deserialize, Serialize};

use crate::error::{IdentityError, IdentityResult};

/// Login username, only meaningful while the usernames feature is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Username(String);

impl Username {
    /// Create a new username with validation against the configured
    /// maximum length.
    pub fn new(raw: impl Into<String>, max_length: usize) -> IdentityResult<Self> {
        let username = raw.into().trim().to_string();

        if username.is_empty() {
            return Err(IdentityError::UsernameMissing);
        }

        if username.chars().count() > max_length {
            return Err(IdentityError::UsernameTooLong { max: max_length });
        }

        Ok(Self(username))
    }

    /// Create from a stored value (assumed already validated)
    pub fn from_db(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
