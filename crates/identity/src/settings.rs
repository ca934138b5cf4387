//! Engine Settings
//!
//! Feature flags and tunables consumed by the workflows. Plain struct with
//! a `Default`; wiring values from the host configuration is the caller's
//! concern.

use chrono::{DateTime, Utc};
use platform::{HashAlgorithm, PasswordFormat};

use crate::domain::entity::{credential::CredentialRecord, role::Role};
use crate::domain::lockout::LockoutPolicy;
use crate::domain::password_expiry;

/// Identity engine configuration surface
#[derive(Debug, Clone)]
pub struct IdentitySettings {
    /// Whether identities log in by username instead of email
    pub usernames_enabled: bool,
    /// Storage format for newly created credentials
    pub default_password_format: PasswordFormat,
    /// Hash algorithm for new `Hashed` credentials
    pub hashed_password_algorithm: HashAlgorithm,
    /// Failed attempts before a lockout; `<= 0` disables lockout
    pub failed_login_max_attempts: i32,
    /// Lockout duration in minutes
    pub failed_login_lockout_minutes: i64,
    /// How many recent credentials a new password may not repeat; 0 disables
    pub unduplicated_passwords_count: u32,
    /// Recovery/revalidation token validity in whole days; 0 = never expires
    pub recovery_token_validity_days: i64,
    /// Global password lifetime in days; 0 disables expiry
    pub password_lifetime_days: i64,
    /// Maximum username length
    pub username_max_length: usize,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            usernames_enabled: false,
            default_password_format: PasswordFormat::Hashed,
            hashed_password_algorithm: HashAlgorithm::Argon2id,
            failed_login_max_attempts: 0,
            failed_login_lockout_minutes: 30,
            unduplicated_passwords_count: 4,
            recovery_token_validity_days: 7,
            password_lifetime_days: 0,
            username_max_length: 100,
        }
    }
}

impl IdentitySettings {
    /// Lockout policy derived from the failed-login settings.
    pub fn lockout_policy(&self) -> LockoutPolicy {
        LockoutPolicy {
            max_failures: self.failed_login_max_attempts,
            duration_minutes: self.failed_login_lockout_minutes,
        }
    }

    /// Whether the identity's password has aged past the configured
    /// lifetime. See `domain::password_expiry` for the policy rules.
    pub fn password_expired(
        &self,
        roles: &[Role],
        current_credential: Option<&CredentialRecord>,
        now: DateTime<Utc>,
    ) -> bool {
        password_expiry::is_expired(roles, self.password_lifetime_days, current_credential, now)
    }
}
