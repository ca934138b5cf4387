//! Password Expiry Policy
//!
//! Decides whether an identity's current credential has aged past the
//! configured lifetime. Pure function of role set, settings and the
//! current credential; the result changes at most once per password
//! change, so callers may memoize it within a single request scope
//! (never across requests).

use chrono::{DateTime, Utc};

use crate::domain::entity::credential::CredentialRecord;
use crate::domain::entity::role::{self, Role};

/// Whether the identity's password is expired.
///
/// - Guest identities never expire
/// - only roles with `enforce_password_lifetime` are subject to expiry
/// - `lifetime_days == 0` disables expiry globally
/// - a missing credential counts as expired
pub fn is_expired(
    roles: &[Role],
    lifetime_days: i64,
    current_credential: Option<&CredentialRecord>,
    now: DateTime<Utc>,
) -> bool {
    if role::is_guest(roles) {
        return false;
    }

    if !roles
        .iter()
        .any(|r| r.active && r.enforce_password_lifetime)
    {
        return false;
    }

    if lifetime_days == 0 {
        return false;
    }

    let Some(credential) = current_credential else {
        return true;
    };

    let age_in_days = (now - credential.created_at).num_days();
    age_in_days >= lifetime_days
}
