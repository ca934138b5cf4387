//! Lockout Policy
//!
//! Pure decision table applied after a failed password verify. The login
//! workflow checks `is_locked` *before* any verify and short-circuits
//! without touching the counter.

use chrono::{DateTime, Duration, Utc};

/// Brute-force lockout configuration
#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    /// Failed attempts before a lockout; `<= 0` disables lockout entirely
    pub max_failures: i32,
    /// Lockout duration in minutes
    pub duration_minutes: i64,
}

/// Outcome of applying the policy to one more failed attempt.
///
/// `cannot_login_until` is `Some` only when this attempt triggers a
/// lockout; otherwise the identity's existing value is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutDecision {
    pub failed_attempts: i32,
    pub cannot_login_until: Option<DateTime<Utc>>,
}

impl LockoutPolicy {
    /// Register one failed attempt on top of `current_failures`.
    ///
    /// The counter resets to 0 at the moment a lockout is applied, so it
    /// does not persist across the lockout window.
    pub fn register_failure(&self, current_failures: i32, now: DateTime<Utc>) -> LockoutDecision {
        let incremented = current_failures + 1;

        if self.max_failures <= 0 {
            // Lockout disabled: count only, never lock
            return LockoutDecision {
                failed_attempts: incremented,
                cannot_login_until: None,
            };
        }

        if incremented >= self.max_failures {
            LockoutDecision {
                failed_attempts: 0,
                cannot_login_until: Some(now + Duration::minutes(self.duration_minutes)),
            }
        } else {
            LockoutDecision {
                failed_attempts: incremented,
                cannot_login_until: None,
            }
        }
    }
}

/// Whether a lockout timestamp is present and still in the future.
pub fn is_locked(cannot_login_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    cannot_login_until.is_some_and(|until| now < until)
}
