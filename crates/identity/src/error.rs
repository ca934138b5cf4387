//! Identity Error Types
//!
//! One enum covers both error categories the engine distinguishes:
//!
//! - business-rule violations: expected, human-readable, returned to the
//!   caller as data (duplicate email, wrong old password, invalid token, ...)
//! - faults: programming/configuration/storage errors that propagate
//!   unchanged and are never converted into business results
//!
//! `is_fault` tells the two apart. No operation retries storage calls.

use thiserror::Error;

/// Identity-engine result type alias
pub type IdentityResult<T> = Result<T, IdentityError>;

#[derive(Debug, Error)]
pub enum IdentityError {
    // --- business-rule violations -------------------------------------

    /// Registration attempted for a reserved system account
    #[error("System accounts cannot be registered")]
    SystemAccount,

    /// Identity already holds the Registered role
    #[error("Current identity is already registered")]
    AlreadyRegistered,

    /// Email missing from a request that requires one
    #[error("Email is required")]
    EmailMissing,

    /// Email is not RFC-shaped or exceeds the length limit
    #[error("Invalid email address")]
    EmailInvalid,

    /// Another identity already owns this email
    #[error("The specified email already exists")]
    EmailTaken,

    /// Password missing from a request that requires one
    #[error("Password is required")]
    PasswordMissing,

    /// Username missing while the usernames feature is enabled
    #[error("Username is required")]
    UsernameMissing,

    /// Another identity already owns this username
    #[error("The specified username already exists")]
    UsernameTaken,

    /// Username exceeds the configured maximum length
    #[error("Username is too long (maximum {max} characters)")]
    UsernameTooLong { max: usize },

    /// Lookup identifier (email/username) missing
    #[error("Identifier is required")]
    IdentifierMissing,

    /// No identity matches the supplied identifier
    #[error("User not found")]
    UserNotFound,

    /// Old password does not verify against the current credential
    #[error("Old password does not match")]
    OldPasswordMismatch,

    /// New password matches one of the recent credentials
    #[error("You entered a password that was already used")]
    PasswordReused,

    /// Supplied token does not match the active one
    #[error("Invalid or unknown token")]
    InvalidToken,

    /// The active token has aged past its validity window
    #[error("Token has expired")]
    TokenExpired,

    // --- faults -------------------------------------------------------

    /// Username operation while the usernames feature is disabled
    #[error("Usernames are disabled by configuration")]
    UsernamesDisabled,

    /// A required system role is missing from the store
    #[error("System role '{0}' could not be loaded")]
    MissingSystemRole(String),

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Credential encoding failure
    #[error(transparent)]
    Credential(#[from] platform::CredentialError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IdentityError {
    /// Whether this is a non-recoverable fault rather than a
    /// business-rule violation.
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            IdentityError::UsernamesDisabled
                | IdentityError::MissingSystemRole(_)
                | IdentityError::Configuration(_)
                | IdentityError::Credential(_)
                | IdentityError::Database(_)
                | IdentityError::Internal(_)
        )
    }

}
