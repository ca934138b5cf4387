//! Identity Mutation Workflow
//!
//! Email and username changes. An email change can either commit directly
//! or go through revalidation: the new address is parked on the identity
//! and only becomes live when the revalidation token is consumed by the
//! confirmation step.

use std::sync::Arc;

use crate::application::recovery::{RecoveryTokenManager, TokenKind};
use crate::domain::entity::identity::Identity;
use crate::domain::repository::{AttributeStore, IdentityStore, Messenger, SubscriptionDirectory};
use crate::domain::value_object::{Email, Username};
use crate::error::{IdentityError, IdentityResult};
use crate::settings::IdentitySettings;

/// Identity mutation workflow
pub struct IdentityMutationWorkflow<S, A, M, D>
where
    S: IdentityStore,
    A: AttributeStore,
    M: Messenger,
    D: SubscriptionDirectory,
{
    store: Arc<S>,
    recovery: Arc<RecoveryTokenManager<A, M>>,
    subscriptions: Arc<D>,
    settings: Arc<IdentitySettings>,
}

impl<S, A, M, D> IdentityMutationWorkflow<S, A, M, D>
where
    S: IdentityStore,
    A: AttributeStore,
    M: Messenger,
    D: SubscriptionDirectory,
{
    pub fn new(
        store: Arc<S>,
        recovery: Arc<RecoveryTokenManager<A, M>>,
        subscriptions: Arc<D>,
        settings: Arc<IdentitySettings>,
    ) -> Self {
        Self {
            store,
            recovery,
            subscriptions,
            settings,
        }
    }

    /// Change the email address.
    ///
    /// With `require_validation` the live email stays untouched and the new
    /// address waits for `confirm_email_revalidation`; without it the email
    /// commits directly and any newsletter subscription follows it.
    pub async fn set_email(
        &self,
        identity: &mut Identity,
        new_email: &str,
        require_validation: bool,
        language_id: i64,
    ) -> IdentityResult<()> {
        let email = Email::new(new_email)?;

        if let Some(other) = self.store.find_by_email(email.as_str()).await? {
            if other.id != identity.id {
                return Err(IdentityError::EmailTaken);
            }
        }

        if require_validation {
            identity.email_to_revalidate = Some(email.into_inner());
            self.store.update(identity).await?;
            self.recovery
                .issue(identity, TokenKind::EmailRevalidation, language_id)
                .await?;

            tracing::info!(identity_id = identity.id, "Email revalidation requested");
            return Ok(());
        }

        let old_email = std::mem::replace(&mut identity.email, email.into_inner());
        self.store.update(identity).await?;

        if !old_email.eq_ignore_ascii_case(&identity.email) {
            self.subscriptions
                .migrate_email(&old_email, &identity.email)
                .await?;
        }

        tracing::info!(identity_id = identity.id, "Email changed");
        Ok(())
    }

    /// Consume a revalidation token and promote the pending email.
    pub async fn confirm_email_revalidation(
        &self,
        identity: &mut Identity,
        token: &str,
    ) -> IdentityResult<()> {
        if !self
            .recovery
            .validate(identity, TokenKind::EmailRevalidation, token)
            .await?
        {
            return Err(IdentityError::InvalidToken);
        }

        if self
            .recovery
            .is_expired(identity, TokenKind::EmailRevalidation)
            .await?
        {
            return Err(IdentityError::TokenExpired);
        }

        let Some(pending) = identity.email_to_revalidate.clone() else {
            return Err(IdentityError::InvalidToken);
        };

        // Uniqueness can have been lost while the token was in flight.
        // Checked before the entity is touched, so a rejection leaves the
        // pending email and the token in place for a retry.
        if let Some(other) = self.store.find_by_email(&pending).await? {
            if other.id != identity.id {
                return Err(IdentityError::EmailTaken);
            }
        }

        identity.email_to_revalidate = None;
        let old_email = std::mem::replace(&mut identity.email, pending);
        self.store.update(identity).await?;
        self.recovery
            .consume(identity, TokenKind::EmailRevalidation)
            .await?;

        if !old_email.eq_ignore_ascii_case(&identity.email) {
            self.subscriptions
                .migrate_email(&old_email, &identity.email)
                .await?;
        }

        tracing::info!(identity_id = identity.id, "Email revalidated");
        Ok(())
    }

    /// Change the username. Requires the usernames feature; calling this
    /// while it is disabled is a configuration fault, not a validation
    /// failure.
    pub async fn set_username(
        &self,
        identity: &mut Identity,
        new_username: &str,
    ) -> IdentityResult<()> {
        if !self.settings.usernames_enabled {
            return Err(IdentityError::UsernamesDisabled);
        }

        let username = Username::new(new_username, self.settings.username_max_length)?;

        if let Some(other) = self.store.find_by_username(username.as_str()).await? {
            if other.id != identity.id {
                return Err(IdentityError::UsernameTaken);
            }
        }

        identity.username = Some(username.into_inner());
        self.store.update(identity).await?;

        tracing::info!(identity_id = identity.id, "Username changed");
        Ok(())
    }
}
