//! Recovery Token Manager
//!
//! Issues, validates, expires and consumes the single-use opaque tokens
//! used for password recovery and email revalidation. A token lives as two
//! attributes on the identity (value + generated-at); issuing a new one
//! silently overwrites the previous one, so at most one is active per
//! identity and kind.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::entity::identity::Identity;
use crate::domain::repository::{AttributeStore, Messenger, attribute_keys};
use crate::error::IdentityResult;
use crate::settings::IdentitySettings;

/// What the token proves control of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    PasswordRecovery,
    EmailRevalidation,
}

impl TokenKind {
    fn token_key(self) -> &'static str {
        match self {
            Self::PasswordRecovery => attribute_keys::PASSWORD_RECOVERY_TOKEN,
            Self::EmailRevalidation => attribute_keys::EMAIL_REVALIDATION_TOKEN,
        }
    }

    fn generated_at_key(self) -> &'static str {
        match self {
            Self::PasswordRecovery => attribute_keys::PASSWORD_RECOVERY_GENERATED_AT,
            Self::EmailRevalidation => attribute_keys::EMAIL_REVALIDATION_GENERATED_AT,
        }
    }
}

/// Recovery token manager
pub struct RecoveryTokenManager<A, M>
where
    A: AttributeStore,
    M: Messenger,
{
    attributes: Arc<A>,
    messenger: Arc<M>,
    settings: Arc<IdentitySettings>,
}

impl<A, M> RecoveryTokenManager<A, M>
where
    A: AttributeStore,
    M: Messenger,
{
    pub fn new(attributes: Arc<A>, messenger: Arc<M>, settings: Arc<IdentitySettings>) -> Self {
        Self {
            attributes,
            messenger,
            settings,
        }
    }

    /// Issue a fresh token, overwriting any previous one, and hand it to
    /// the messaging collaborator for delivery.
    pub async fn issue(
        &self,
        identity: &Identity,
        kind: TokenKind,
        language_id: i64,
    ) -> IdentityResult<String> {
        let token = platform::crypto::random_token();
        let now = Utc::now();

        self.attributes
            .set(identity.id, kind.token_key(), Some(&token))
            .await?;
        self.attributes
            .set(
                identity.id,
                kind.generated_at_key(),
                Some(&now.to_rfc3339()),
            )
            .await?;

        // Delivery is best-effort; the message ids are not consulted
        match kind {
            TokenKind::PasswordRecovery => {
                self.messenger
                    .send_recovery_message(identity, language_id)
                    .await;
            }
            TokenKind::EmailRevalidation => {
                self.messenger
                    .send_revalidation_message(identity, language_id)
                    .await;
            }
        }

        tracing::info!(identity_id = identity.id, kind = ?kind, "Token issued");

        Ok(token)
    }

    /// Whether the candidate matches the active token
    /// (case-insensitively). A missing or cleared token never matches.
    pub async fn validate(
        &self,
        identity: &Identity,
        kind: TokenKind,
        candidate: &str,
    ) -> IdentityResult<bool> {
        let stored = self.attributes.get(identity.id, kind.token_key()).await?;

        Ok(match stored {
            Some(token) if !token.is_empty() => token.eq_ignore_ascii_case(candidate),
            _ => false,
        })
    }

    /// Whether the active token has aged past the configured validity
    /// window. A validity of 0 days means tokens never expire; a missing
    /// or unparsable generation timestamp counts as expired.
    pub async fn is_expired(&self, identity: &Identity, kind: TokenKind) -> IdentityResult<bool> {
        let validity_days = self.settings.recovery_token_validity_days;
        if validity_days == 0 {
            return Ok(false);
        }

        let Some(generated_at) = self
            .attributes
            .get(identity.id, kind.generated_at_key())
            .await?
        else {
            return Ok(true);
        };

        let Ok(generated_at) = DateTime::parse_from_rfc3339(&generated_at) else {
            return Ok(true);
        };

        let age_in_days = (Utc::now() - generated_at.with_timezone(&Utc)).num_days();
        Ok(age_in_days > validity_days)
    }

    /// Clear the token so a replayed message cannot validate again.
    pub async fn consume(&self, identity: &Identity, kind: TokenKind) -> IdentityResult<()> {
        self.attributes
            .set(identity.id, kind.token_key(), None)
            .await?;
        Ok(())
    }
}
