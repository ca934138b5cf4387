//! Collaborator Traits
//!
//! Contracts the engine needs from the outside world: the identity store,
//! the per-identity attribute store, the notification sink, the messaging
//! collaborator, the MFA provider catalog and the newsletter subscription
//! directory. Storage implementations live in the infrastructure layer.

use crate::domain::entity::{credential::CredentialRecord, identity::Identity, role::Role};
use crate::error::IdentityResult;
use uuid::Uuid;

/// Attribute keys the engine owns on the attribute store.
pub mod attribute_keys {
    pub const PASSWORD_RECOVERY_TOKEN: &str = "PasswordRecoveryToken";
    pub const PASSWORD_RECOVERY_GENERATED_AT: &str = "PasswordRecoveryTokenGeneratedAt";
    pub const EMAIL_REVALIDATION_TOKEN: &str = "EmailRevalidationToken";
    pub const EMAIL_REVALIDATION_GENERATED_AT: &str = "EmailRevalidationTokenGeneratedAt";
    pub const SELECTED_MFA_PROVIDER: &str = "SelectedMultiFactorProvider";
}

/// Identity store trait
#[trait_variant::make(IdentityStore: Send)]
pub trait LocalIdentityStore {
    /// Insert a new identity, returning it with its assigned id
    async fn insert(&self, identity: &Identity) -> IdentityResult<Identity>;

    /// Persist changes to an existing identity (last write wins)
    async fn update(&self, identity: &Identity) -> IdentityResult<()>;

    async fn find_by_id(&self, id: i64) -> IdentityResult<Option<Identity>>;

    async fn find_by_guid(&self, guid: Uuid) -> IdentityResult<Option<Identity>>;

    async fn find_by_email(&self, email: &str) -> IdentityResult<Option<Identity>>;

    async fn find_by_username(&self, username: &str) -> IdentityResult<Option<Identity>>;

    async fn find_by_system_name(&self, system_name: &str) -> IdentityResult<Option<Identity>>;

    /// All roles the identity is a member of
    async fn roles_of(&self, identity_id: i64) -> IdentityResult<Vec<Role>>;

    async fn find_role_by_system_name(&self, system_name: &str) -> IdentityResult<Option<Role>>;

    async fn add_to_role(&self, identity_id: i64, role_id: i64) -> IdentityResult<()>;

    async fn remove_from_role(&self, identity_id: i64, role_id: i64) -> IdentityResult<()>;

    /// The credential with the latest creation timestamp, if any
    async fn current_credential(&self, identity_id: i64)
    -> IdentityResult<Option<CredentialRecord>>;

    /// Up to `count` credentials, most recent first
    async fn recent_credentials(
        &self,
        identity_id: i64,
        count: u32,
    ) -> IdentityResult<Vec<CredentialRecord>>;

    /// Append a credential to the history (insert-only)
    async fn insert_credential(&self, credential: &CredentialRecord) -> IdentityResult<()>;
}

/// Typed get/set of a single attribute keyed by (identity, key)
#[trait_variant::make(AttributeStore: Send)]
pub trait LocalAttributeStore {
    async fn get(&self, identity_id: i64, key: &str) -> IdentityResult<Option<String>>;

    /// Set an attribute; `None` clears it
    async fn set(&self, identity_id: i64, key: &str, value: Option<&str>) -> IdentityResult<()>;
}

/// Domain-event and warning sink. Purely observational: the engine never
/// depends on it for correctness, so the methods are infallible.
#[trait_variant::make(NotificationSink: Send)]
pub trait LocalNotificationSink {
    async fn user_registered(&self, identity: &Identity);

    async fn user_logged_in(&self, identity: &Identity);

    async fn password_changed(&self, identity: &Identity);

    /// Non-blocking, user-visible warning
    async fn warning(&self, identity: &Identity, message: &str);
}

/// Outbound message delivery. Best-effort, fire-and-forget from the
/// engine's perspective; returns opaque message identifiers.
#[trait_variant::make(Messenger: Send)]
pub trait LocalMessenger {
    async fn send_recovery_message(&self, identity: &Identity, language_id: i64) -> Vec<u64>;

    async fn send_revalidation_message(&self, identity: &Identity, language_id: i64) -> Vec<u64>;

    async fn send_welcome_message(&self, identity: &Identity, language_id: i64) -> Vec<u64>;

    async fn send_email_validation_message(&self, identity: &Identity, language_id: i64)
    -> Vec<u64>;
}

/// Second-factor provider availability, decided outside the engine.
#[trait_variant::make(MultiFactorCatalog: Send)]
pub trait LocalMultiFactorCatalog {
    async fn is_provider_active(&self, system_name: &str) -> bool;
}

/// External newsletter subscription records keyed by email.
#[trait_variant::make(SubscriptionDirectory: Send)]
pub trait LocalSubscriptionDirectory {
    /// Move a subscription from `old_email` to `new_email`, if one exists
    async fn migrate_email(&self, old_email: &str, new_email: &str) -> IdentityResult<()>;
}
