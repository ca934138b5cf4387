//! Identity Entity
//!
//! The authenticable principal. Owned by the store; the workflows mutate it
//! through these methods and then persist via an explicit `update` call,
//! never in place without persistence.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::lockout::LockoutDecision;

/// Reserved system account names, excluded from normal registration/login.
pub mod system_accounts {
    pub const SEARCH_ENGINE: &str = "SearchEngine";
    pub const BACKGROUND_TASK: &str = "BackgroundTask";
}

/// Identity entity
#[derive(Debug, Clone)]
pub struct Identity {
    /// Numeric store identifier (0 until inserted)
    pub id: i64,
    /// Stable external identifier
    pub guid: Uuid,
    /// Live email address
    pub email: String,
    /// Optional login username (when the usernames feature is enabled)
    pub username: Option<String>,
    /// Whether the identity may authenticate
    pub active: bool,
    /// Soft-delete flag
    pub deleted: bool,
    /// Non-human account (background task, search engine)
    pub is_system_account: bool,
    /// Well-known name for system accounts
    pub system_name: Option<String>,
    /// Consecutive failed login attempts
    pub failed_login_attempts: i32,
    /// Login denied until this instant (lockout)
    pub cannot_login_until: Option<DateTime<Utc>>,
    /// Last successful login
    pub last_login_at: Option<DateTime<Utc>>,
    /// Pending email awaiting revalidation; live email is unchanged until
    /// the revalidation token is consumed
    pub email_to_revalidate: Option<String>,
    /// Force a fresh login on the next request
    pub must_re_login: bool,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Identity {
    /// Create a fresh, not-yet-persisted identity.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: 0,
            guid: Uuid::new_v4(),
            email: email.into(),
            username: None,
            active: true,
            deleted: false,
            is_system_account: false,
            system_name: None,
            failed_login_attempts: 0,
            cannot_login_until: None,
            last_login_at: None,
            email_to_revalidate: None,
            must_re_login: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_search_engine(&self) -> bool {
        self.is_system_account
            && self.system_name.as_deref() == Some(system_accounts::SEARCH_ENGINE)
    }

    pub fn is_background_task(&self) -> bool {
        self.is_system_account
            && self.system_name.as_deref() == Some(system_accounts::BACKGROUND_TASK)
    }

    /// Whether a lockout is currently in force.
    pub fn is_locked_out(&self, now: DateTime<Utc>) -> bool {
        crate::domain::lockout::is_locked(self.cannot_login_until, now)
    }

    /// Apply a lockout decision after a failed verify.
    ///
    /// Leaves `cannot_login_until` untouched unless the decision locks.
    pub fn apply_lockout(&mut self, decision: LockoutDecision) {
        self.failed_login_attempts = decision.failed_attempts;
        if decision.cannot_login_until.is_some() {
            self.cannot_login_until = decision.cannot_login_until;
        }
    }

    /// Record a successful login: reset the failure counter, clear any
    /// lockout and the re-login flag, stamp last-login.
    pub fn record_login(&mut self, now: DateTime<Utc>) {
        self.failed_login_attempts = 0;
        self.cannot_login_until = None;
        self.must_re_login = false;
        self.last_login_at = Some(now);
    }
}
