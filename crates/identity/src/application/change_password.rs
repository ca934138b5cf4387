//! Password Change Workflow
//!
//! Validates and persists a new credential. Prior credentials are never
//! updated or deleted; the new record is appended and recency decides which
//! one is current.

use std::sync::Arc;

use chrono::Utc;
use platform::{ClearTextSecret, CredentialCodec, PasswordFormat};

use crate::domain::entity::credential::CredentialRecord;
use crate::domain::repository::{IdentityStore, NotificationSink};
use crate::error::{IdentityError, IdentityResult};
use crate::settings::IdentitySettings;

/// Password change request
pub struct ChangePasswordRequest {
    /// Email identifying the identity
    pub email: String,
    /// Current secret; only consulted when `validate_request` is set
    pub old_password: String,
    pub new_password: String,
    /// Whether the old secret must verify against the current credential
    pub validate_request: bool,
    /// Storage format for the new credential; `None` uses the configured
    /// default
    pub format: Option<PasswordFormat>,
}

/// Password change workflow
pub struct PasswordChangeWorkflow<S, N>
where
    S: IdentityStore,
    N: NotificationSink,
{
    store: Arc<S>,
    notifications: Arc<N>,
    codec: Arc<CredentialCodec>,
    settings: Arc<IdentitySettings>,
}

impl<S, N> PasswordChangeWorkflow<S, N>
where
    S: IdentityStore,
    N: NotificationSink,
{
    pub fn new(
        store: Arc<S>,
        notifications: Arc<N>,
        codec: Arc<CredentialCodec>,
        settings: Arc<IdentitySettings>,
    ) -> Self {
        Self {
            store,
            notifications,
            codec,
            settings,
        }
    }

    pub async fn execute(&self, request: ChangePasswordRequest) -> IdentityResult<()> {
        if request.email.trim().is_empty() {
            return Err(IdentityError::IdentifierMissing);
        }

        if request.new_password.trim().is_empty() {
            return Err(IdentityError::PasswordMissing);
        }

        let identity = self
            .store
            .find_by_email(request.email.trim())
            .await?
            .ok_or(IdentityError::UserNotFound)?;

        if request.validate_request {
            let current = self.store.current_credential(identity.id).await?;
            if !self
                .codec
                .verify(current.as_ref().map(|c| &c.secret), &request.old_password)
            {
                return Err(IdentityError::OldPasswordMismatch);
            }
        }

        let history_count = self.settings.unduplicated_passwords_count;
        if history_count > 0 {
            let recent = self
                .store
                .recent_credentials(identity.id, history_count)
                .await?;
            // Each record verifies with its own stored format/salt/algorithm
            if recent
                .iter()
                .any(|c| self.codec.verify(Some(&c.secret), &request.new_password))
            {
                return Err(IdentityError::PasswordReused);
            }
        }

        let format = request
            .format
            .unwrap_or(self.settings.default_password_format);
        let secret = ClearTextSecret::new(request.new_password)?;
        let encoded = self.codec.encode(format, &secret)?;
        self.store
            .insert_credential(&CredentialRecord::new(identity.id, encoded, Utc::now()))
            .await?;

        self.notifications.password_changed(&identity).await;
        tracing::info!(identity_id = identity.id, "Password changed");

        Ok(())
    }
}
