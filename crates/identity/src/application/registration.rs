//! Registration Workflow
//!
//! Validates a new-identity request and materializes the first credential
//! plus the Registered role membership. Preconditions are checked in order
//! and the first failing rule is returned; violations are never aggregated.

use std::sync::Arc;

use chrono::Utc;
use platform::{ClearTextSecret, CredentialCodec, PasswordFormat};

use crate::domain::entity::credential::CredentialRecord;
use crate::domain::entity::identity::Identity;
use crate::domain::entity::role::{self, system_roles};
use crate::domain::repository::{IdentityStore, Messenger, NotificationSink};
use crate::domain::value_object::{Email, Username};
use crate::error::{IdentityError, IdentityResult};
use crate::settings::IdentitySettings;

/// How the new account is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationType {
    /// Immediately usable; a welcome message is sent
    Standard,
    /// The account holder must confirm the email address
    EmailValidation,
    /// An administrator approves the account out of band
    AdminApproval,
}

/// Registration request
pub struct RegistrationRequest {
    /// The candidate identity (a persisted guest row)
    pub identity: Identity,
    pub email: String,
    pub username: String,
    pub password: String,
    /// Storage format for the first credential; `None` uses the configured
    /// default
    pub format: Option<PasswordFormat>,
    /// Whether the account starts active
    pub is_approved: bool,
    pub registration_type: RegistrationType,
    pub language_id: i64,
}

/// Registration workflow
pub struct RegistrationWorkflow<S, N, M>
where
    S: IdentityStore,
    N: NotificationSink,
    M: Messenger,
{
    store: Arc<S>,
    notifications: Arc<N>,
    messenger: Arc<M>,
    codec: Arc<CredentialCodec>,
    settings: Arc<IdentitySettings>,
}

impl<S, N, M> RegistrationWorkflow<S, N, M>
where
    S: IdentityStore,
    N: NotificationSink,
    M: Messenger,
{
    pub fn new(
        store: Arc<S>,
        notifications: Arc<N>,
        messenger: Arc<M>,
        codec: Arc<CredentialCodec>,
        settings: Arc<IdentitySettings>,
    ) -> Self {
        Self {
            store,
            notifications,
            messenger,
            codec,
            settings,
        }
    }

    /// Register the candidate identity, returning its updated state.
    pub async fn execute(&self, request: RegistrationRequest) -> IdentityResult<Identity> {
        let mut identity = request.identity;

        if identity.id == 0 {
            return Err(IdentityError::Internal(
                "candidate identity must be persisted before registration".to_string(),
            ));
        }

        if identity.is_search_engine() || identity.is_background_task() {
            return Err(IdentityError::SystemAccount);
        }

        let roles = self.store.roles_of(identity.id).await?;
        if role::is_registered(&roles) {
            return Err(IdentityError::AlreadyRegistered);
        }

        let email = Email::new(&request.email)?;

        if request.password.trim().is_empty() {
            return Err(IdentityError::PasswordMissing);
        }

        let username = if self.settings.usernames_enabled {
            Some(Username::new(
                &request.username,
                self.settings.username_max_length,
            )?)
        } else {
            None
        };

        if let Some(other) = self.store.find_by_email(email.as_str()).await? {
            if other.id != identity.id {
                return Err(IdentityError::EmailTaken);
            }
        }

        if let Some(username) = &username {
            if let Some(other) = self.store.find_by_username(username.as_str()).await? {
                if other.id != identity.id {
                    return Err(IdentityError::UsernameTaken);
                }
            }
        }

        // All rules passed; from here on failures are faults.
        identity.email = email.into_inner();
        identity.username = username.map(Username::into_inner);
        identity.active = request.is_approved;

        let format = request
            .format
            .unwrap_or(self.settings.default_password_format);
        let secret = ClearTextSecret::new(request.password)?;
        let encoded = self.codec.encode(format, &secret)?;

        // Credential insert and identity update are two independent writes
        // with no compensating transaction; a failure between them
        // propagates so the caller can surface the inconsistency.
        self.store
            .insert_credential(&CredentialRecord::new(identity.id, encoded, Utc::now()))
            .await?;

        let registered = self
            .store
            .find_role_by_system_name(system_roles::REGISTERED)
            .await?
            .ok_or_else(|| {
                IdentityError::MissingSystemRole(system_roles::REGISTERED.to_string())
            })?;
        self.store.add_to_role(identity.id, registered.id).await?;

        if let Some(guests) = roles.iter().find(|r| r.is_system(system_roles::GUESTS)) {
            self.store.remove_from_role(identity.id, guests.id).await?;
        }

        self.store.update(&identity).await?;
        self.notifications.user_registered(&identity).await;

        match request.registration_type {
            RegistrationType::Standard => {
                self.messenger
                    .send_welcome_message(&identity, request.language_id)
                    .await;
            }
            RegistrationType::EmailValidation => {
                self.messenger
                    .send_email_validation_message(&identity, request.language_id)
                    .await;
            }
            RegistrationType::AdminApproval => {}
        }

        tracing::info!(identity_id = identity.id, "Identity registered");

        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::support::*;

    struct Fixture {
        store: Arc<MemoryStore>,
        notifications: Arc<MemoryNotifications>,
        messenger: Arc<MemoryMessenger>,
        workflow: RegistrationWorkflow<MemoryStore, MemoryNotifications, MemoryMessenger>,
    }

    fn fixture(settings: IdentitySettings) -> Fixture {
        let store = Arc::new(MemoryStore::default());
        store.seed_system_roles();
        let notifications = Arc::new(MemoryNotifications::default());
        let messenger = Arc::new(MemoryMessenger::default());
        let workflow = RegistrationWorkflow::new(
            store.clone(),
            notifications.clone(),
            messenger.clone(),
            Arc::new(test_codec()),
            Arc::new(settings),
        );
        Fixture {
            store,
            notifications,
            messenger,
            workflow,
        }
    }

    async fn guest(fx: &Fixture) -> Identity {
        let identity = fx.store.insert(&Identity::new("")).await.unwrap();
        let guests = fx
            .store
            .find_role_by_system_name(system_roles::GUESTS)
            .await
            .unwrap()
            .unwrap();
        fx.store.add_to_role(identity.id, guests.id).await.unwrap();
        identity
    }

    fn request(identity: Identity, email: &str, password: &str) -> RegistrationRequest {
        RegistrationRequest {
            identity,
            email: email.to_string(),
            username: String::new(),
            password: password.to_string(),
            format: Some(PasswordFormat::Hashed),
            is_approved: true,
            registration_type: RegistrationType::Standard,
            language_id: 1,
        }
    }

    #[tokio::test]
    async fn test_happy_path_usernames_disabled() {
        let fx = fixture(IdentitySettings::default());
        let identity = guest(&fx).await;
        let id = identity.id;

        let registered = fx
            .workflow
            .execute(request(identity, "a@b.com", "valid-password"))
            .await
            .unwrap();

        assert_eq!(registered.email, "a@b.com");
        assert!(registered.active);
        assert_eq!(fx.store.credential_count(id), 1);
        assert!(fx.store.has_role(id, system_roles::REGISTERED));
        assert!(!fx.store.has_role(id, system_roles::GUESTS));
        assert_eq!(fx.notifications.events(), vec![format!("user_registered:{id}")]);
        assert_eq!(fx.messenger.sent(), vec![("welcome", id)]);
    }

    #[tokio::test]
    async fn test_unspecified_format_uses_settings_default() {
        let fx = fixture(IdentitySettings {
            default_password_format: PasswordFormat::Clear,
            ..IdentitySettings::default()
        });
        let identity = guest(&fx).await;
        let id = identity.id;

        let mut req = request(identity, "a@b.com", "valid-password");
        req.format = None;
        fx.workflow.execute(req).await.unwrap();

        let current = fx.store.current_credential(id).await.unwrap().unwrap();
        assert_eq!(current.secret.format, PasswordFormat::Clear);
        assert_eq!(current.secret.secret, "valid-password");
    }

    #[tokio::test]
    async fn test_duplicate_email_inserts_no_second_credential() {
        let fx = fixture(IdentitySettings::default());
        let first = guest(&fx).await;
        fx.workflow
            .execute(request(first, "a@b.com", "valid-password"))
            .await
            .unwrap();

        let second = guest(&fx).await;
        let second_id = second.id;
        let err = fx
            .workflow
            .execute(request(second, "a@b.com", "other-password"))
            .await
            .unwrap_err();

        assert!(matches!(err, IdentityError::EmailTaken));
        assert_eq!(err.to_string(), "The specified email already exists");
        assert_eq!(fx.store.credential_count(second_id), 0);
        assert!(!fx.store.has_role(second_id, system_roles::REGISTERED));
    }

    #[tokio::test]
    async fn test_system_account_rejected() {
        let fx = fixture(IdentitySettings::default());
        let mut identity = guest(&fx).await;
        identity.is_system_account = true;
        identity.system_name =
            Some(crate::domain::entity::identity::system_accounts::SEARCH_ENGINE.to_string());

        let err = fx
            .workflow
            .execute(request(identity, "bot@b.com", "pw-good-enough"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::SystemAccount));
    }

    #[tokio::test]
    async fn test_already_registered_rejected() {
        let fx = fixture(IdentitySettings::default());
        let identity = guest(&fx).await;
        let registered = fx
            .workflow
            .execute(request(identity, "a@b.com", "valid-password"))
            .await
            .unwrap();

        let err = fx
            .workflow
            .execute(request(registered, "a2@b.com", "valid-password"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::AlreadyRegistered));
    }

    #[tokio::test]
    async fn test_first_failing_rule_wins() {
        // Both email and password are invalid; email is checked first
        let fx = fixture(IdentitySettings::default());
        let identity = guest(&fx).await;

        let err = fx
            .workflow
            .execute(request(identity, "", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::EmailMissing));
    }

    #[tokio::test]
    async fn test_empty_password_rejected() {
        let fx = fixture(IdentitySettings::default());
        let identity = guest(&fx).await;

        let err = fx
            .workflow
            .execute(request(identity, "a@b.com", "   "))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::PasswordMissing));
    }

    #[tokio::test]
    async fn test_username_required_when_enabled() {
        let fx = fixture(IdentitySettings {
            usernames_enabled: true,
            ..IdentitySettings::default()
        });
        let identity = guest(&fx).await;

        let err = fx
            .workflow
            .execute(request(identity, "a@b.com", "valid-password"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::UsernameMissing));
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let fx = fixture(IdentitySettings {
            usernames_enabled: true,
            ..IdentitySettings::default()
        });

        let first = guest(&fx).await;
        let mut req = request(first, "a@b.com", "valid-password");
        req.username = "alice".to_string();
        fx.workflow.execute(req).await.unwrap();

        let second = guest(&fx).await;
        let mut req = request(second, "b@b.com", "valid-password");
        req.username = "alice".to_string();
        let err = fx.workflow.execute(req).await.unwrap_err();
        assert!(matches!(err, IdentityError::UsernameTaken));
    }

    #[tokio::test]
    async fn test_admin_approval_sends_nothing_and_stays_inactive() {
        let fx = fixture(IdentitySettings::default());
        let identity = guest(&fx).await;
        let id = identity.id;

        let mut req = request(identity, "a@b.com", "valid-password");
        req.is_approved = false;
        req.registration_type = RegistrationType::AdminApproval;

        let registered = fx.workflow.execute(req).await.unwrap();
        assert!(!registered.active);
        assert!(fx.messenger.sent().is_empty());
        assert_eq!(fx.store.credential_count(id), 1);
    }

    #[tokio::test]
    async fn test_missing_registered_role_is_fault() {
        let store = Arc::new(MemoryStore::default()); // no seeded roles
        let notifications = Arc::new(MemoryNotifications::default());
        let messenger = Arc::new(MemoryMessenger::default());
        let workflow = RegistrationWorkflow::new(
            store.clone(),
            notifications,
            messenger,
            Arc::new(test_codec()),
            Arc::new(IdentitySettings::default()),
        );

        let identity = store.insert(&Identity::new("")).await.unwrap();
        let err = workflow
            .execute(request(identity, "a@b.com", "valid-password"))
            .await
            .unwrap_err();

        assert!(matches!(err, IdentityError::MissingSystemRole(_)));
        assert!(err.is_fault());
    }
}
