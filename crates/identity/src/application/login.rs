//! Login Workflow
//!
//! Orchestrates identity lookup, status checks, the lockout policy, the
//! credential codec and MFA gating into one of eight terminal outcomes.

use std::sync::Arc;

use chrono::Utc;
use derive_more::Display;
use platform::CredentialCodec;
use serde::Serialize;

use crate::domain::entity::role;
use crate::domain::repository::{
    AttributeStore, IdentityStore, MultiFactorCatalog, NotificationSink, attribute_keys,
};
use crate::error::IdentityResult;
use crate::settings::IdentitySettings;

/// Terminal outcome of a single login call.
///
/// Business outcomes, not errors: storage and invariant failures surface
/// through the `Err` side instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum LoginOutcome {
    #[display("User does not exist")]
    UserNotExist,
    #[display("User is deleted")]
    Deleted,
    #[display("User is not active")]
    NotActive,
    #[display("User is not registered")]
    NotRegistered,
    #[display("User is locked out")]
    LockedOut,
    #[display("Wrong password")]
    WrongPassword,
    #[display("Second authentication factor required")]
    MultiFactorRequired,
    #[display("Successful")]
    Successful,
}

/// Login workflow
pub struct LoginWorkflow<S, A, N, M>
where
    S: IdentityStore,
    A: AttributeStore,
    N: NotificationSink,
    M: MultiFactorCatalog,
{
    store: Arc<S>,
    attributes: Arc<A>,
    notifications: Arc<N>,
    mfa: Arc<M>,
    codec: Arc<CredentialCodec>,
    settings: Arc<IdentitySettings>,
}

impl<S, A, N, M> LoginWorkflow<S, A, N, M>
where
    S: IdentityStore,
    A: AttributeStore,
    N: NotificationSink,
    M: MultiFactorCatalog,
{
    pub fn new(
        store: Arc<S>,
        attributes: Arc<A>,
        notifications: Arc<N>,
        mfa: Arc<M>,
        codec: Arc<CredentialCodec>,
        settings: Arc<IdentitySettings>,
    ) -> Self {
        Self {
            store,
            attributes,
            notifications,
            mfa,
            codec,
            settings,
        }
    }

    /// Validate an identifier/secret pair, each step short-circuiting.
    pub async fn execute(&self, identifier: &str, password: &str) -> IdentityResult<LoginOutcome> {
        let identity = if self.settings.usernames_enabled {
            self.store.find_by_username(identifier).await?
        } else {
            self.store.find_by_email(identifier).await?
        };

        let Some(mut identity) = identity else {
            return Ok(LoginOutcome::UserNotExist);
        };

        if identity.deleted {
            return Ok(LoginOutcome::Deleted);
        }

        if !identity.active {
            return Ok(LoginOutcome::NotActive);
        }

        let roles = self.store.roles_of(identity.id).await?;
        if !role::is_registered(&roles) {
            return Ok(LoginOutcome::NotRegistered);
        }

        let now = Utc::now();
        if identity.is_locked_out(now) {
            // No verify, no counter mutation while the lockout holds
            return Ok(LoginOutcome::LockedOut);
        }

        let current = self.store.current_credential(identity.id).await?;
        if !self
            .codec
            .verify(current.as_ref().map(|c| &c.secret), password)
        {
            // Known race: the counter read-modify-write is not atomic, so
            // two concurrent failures can under-count toward the threshold.
            let decision = self
                .settings
                .lockout_policy()
                .register_failure(identity.failed_login_attempts, now);
            identity.apply_lockout(decision);
            self.store.update(&identity).await?;

            tracing::warn!(identity_id = identity.id, "Failed login attempt");
            return Ok(LoginOutcome::WrongPassword);
        }

        if let Some(provider) = self
            .attributes
            .get(identity.id, attribute_keys::SELECTED_MFA_PROVIDER)
            .await?
            .filter(|p| !p.is_empty())
        {
            if self.mfa.is_provider_active(&provider).await {
                // Counter reset, lockout clearing and last-login stamping
                // all belong to the successful branch, which the second
                // factor still gates.
                return Ok(LoginOutcome::MultiFactorRequired);
            }

            // A previously selected but deactivated provider never blocks
            // login; surface it as a non-blocking warning.
            self.notifications
                .warning(
                    &identity,
                    "The selected multi-factor provider is no longer available",
                )
                .await;
            tracing::warn!(
                identity_id = identity.id,
                provider = %provider,
                "Selected MFA provider is inactive, skipping second factor"
            );
        }

        identity.record_login(now);
        self.store.update(&identity).await?;
        self.notifications.user_logged_in(&identity).await;

        tracing::info!(identity_id = identity.id, "User logged in");

        Ok(LoginOutcome::Successful)
    }
}
