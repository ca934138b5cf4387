//! In-memory collaborator implementations shared by the workflow tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::Utc;
use platform::{ClearTextSecret, CredentialCodec, HashAlgorithm, PasswordFormat, SecretCipher};
use uuid::Uuid;

use crate::domain::entity::role::system_roles;
use crate::domain::entity::{CredentialRecord, Identity, Role};
use crate::domain::repository::{
    AttributeStore, IdentityStore, Messenger, MultiFactorCatalog, NotificationSink,
    SubscriptionDirectory,
};
use crate::error::IdentityResult;

pub fn test_codec() -> CredentialCodec {
    let key: Vec<u8> = (0u8..32).collect();
    CredentialCodec::new(
        SecretCipher::from_key(&key).unwrap(),
        HashAlgorithm::Sha256,
    )
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    identities: Vec<Identity>,
    roles: Vec<Role>,
    memberships: HashSet<(i64, i64)>,
    credentials: Vec<CredentialRecord>,
    attributes: HashMap<(i64, String), String>,
    next_identity_id: i64,
    next_role_id: i64,
}

impl MemoryStore {
    /// Seed the Registered and Guests system roles.
    pub fn seed_system_roles(&self) {
        self.seed_role(system_roles::REGISTERED, true, false);
        self.seed_role(system_roles::GUESTS, true, false);
    }

    pub fn seed_role(&self, system_name: &str, active: bool, enforce_lifetime: bool) -> Role {
        let mut inner = self.inner.lock().unwrap();
        inner.next_role_id += 1;
        let role = Role {
            id: inner.next_role_id,
            name: system_name.to_string(),
            active,
            is_system_role: true,
            system_name: Some(system_name.to_string()),
            enforce_password_lifetime: enforce_lifetime,
        };
        inner.roles.push(role.clone());
        role
    }

    /// Insert an identity, give it the Registered role and a first
    /// credential. Returns the identity id.
    pub async fn seed_registered_identity(
        &self,
        email: &str,
        password: &str,
        codec: &CredentialCodec,
        format: PasswordFormat,
    ) -> i64 {
        let identity = self.insert(&Identity::new(email)).await.unwrap();

        let registered = self
            .find_role_by_system_name(system_roles::REGISTERED)
            .await
            .unwrap()
            .expect("seed_system_roles first");
        self.add_to_role(identity.id, registered.id).await.unwrap();

        let secret = ClearTextSecret::new(password).unwrap();
        let encoded = codec.encode(format, &secret).unwrap();
        self.insert_credential(&CredentialRecord::new(identity.id, encoded, Utc::now()))
            .await
            .unwrap();

        identity.id
    }

    pub fn identity(&self, id: i64) -> Identity {
        self.inner
            .lock()
            .unwrap()
            .identities
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .expect("identity exists")
    }

    pub fn mutate_identity(&self, id: i64, f: impl FnOnce(&mut Identity)) {
        let mut inner = self.inner.lock().unwrap();
        let identity = inner
            .identities
            .iter_mut()
            .find(|i| i.id == id)
            .expect("identity exists");
        f(identity);
    }

    pub fn credential_count(&self, identity_id: i64) -> usize {
        self.inner
            .lock()
            .unwrap()
            .credentials
            .iter()
            .filter(|c| c.identity_id == identity_id)
            .count()
    }

    pub fn has_role(&self, identity_id: i64, system_name: &str) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.roles.iter().any(|r| {
            r.system_name.as_deref() == Some(system_name)
                && inner.memberships.contains(&(identity_id, r.id))
        })
    }

    /// Backdate the creation timestamp of the latest credential.
    pub fn age_latest_credential(&self, identity_id: i64, days: i64) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(credential) = inner
            .credentials
            .iter_mut()
            .filter(|c| c.identity_id == identity_id)
            .last()
        {
            credential.created_at -= chrono::Duration::days(days);
        }
    }
}

impl IdentityStore for MemoryStore {
    async fn insert(&self, identity: &Identity) -> IdentityResult<Identity> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_identity_id += 1;
        let mut stored = identity.clone();
        stored.id = inner.next_identity_id;
        inner.identities.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, identity: &Identity) -> IdentityResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.identities.iter_mut().find(|i| i.id == identity.id) {
            *existing = identity.clone();
        }
        Ok(())
    }

    async fn find_by_id(&self, id: i64) -> IdentityResult<Option<Identity>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.identities.iter().find(|i| i.id == id).cloned())
    }

    async fn find_by_guid(&self, guid: Uuid) -> IdentityResult<Option<Identity>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.identities.iter().find(|i| i.guid == guid).cloned())
    }

    async fn find_by_email(&self, email: &str) -> IdentityResult<Option<Identity>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .identities
            .iter()
            .find(|i| i.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> IdentityResult<Option<Identity>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .identities
            .iter()
            .find(|i| i.username.as_deref() == Some(username))
            .cloned())
    }

    async fn find_by_system_name(&self, system_name: &str) -> IdentityResult<Option<Identity>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .identities
            .iter()
            .find(|i| i.system_name.as_deref() == Some(system_name))
            .cloned())
    }

    async fn roles_of(&self, identity_id: i64) -> IdentityResult<Vec<Role>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .roles
            .iter()
            .filter(|r| inner.memberships.contains(&(identity_id, r.id)))
            .cloned()
            .collect())
    }

    async fn find_role_by_system_name(&self, system_name: &str) -> IdentityResult<Option<Role>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .roles
            .iter()
            .find(|r| r.system_name.as_deref() == Some(system_name))
            .cloned())
    }

    async fn add_to_role(&self, identity_id: i64, role_id: i64) -> IdentityResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.memberships.insert((identity_id, role_id));
        Ok(())
    }

    async fn remove_from_role(&self, identity_id: i64, role_id: i64) -> IdentityResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.memberships.remove(&(identity_id, role_id));
        Ok(())
    }

    async fn current_credential(
        &self,
        identity_id: i64,
    ) -> IdentityResult<Option<CredentialRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .credentials
            .iter()
            .enumerate()
            .filter(|(_, c)| c.identity_id == identity_id)
            .max_by_key(|(index, c)| (c.created_at, *index))
            .map(|(_, c)| c.clone()))
    }

    async fn recent_credentials(
        &self,
        identity_id: i64,
        count: u32,
    ) -> IdentityResult<Vec<CredentialRecord>> {
        let inner = self.inner.lock().unwrap();
        let mut matching: Vec<(usize, &CredentialRecord)> = inner
            .credentials
            .iter()
            .enumerate()
            .filter(|(_, c)| c.identity_id == identity_id)
            .collect();
        matching.sort_by_key(|(index, c)| std::cmp::Reverse((c.created_at, *index)));
        Ok(matching
            .into_iter()
            .take(count as usize)
            .map(|(_, c)| c.clone())
            .collect())
    }

    async fn insert_credential(&self, credential: &CredentialRecord) -> IdentityResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.credentials.push(credential.clone());
        Ok(())
    }
}

impl AttributeStore for MemoryStore {
    async fn get(&self, identity_id: i64, key: &str) -> IdentityResult<Option<String>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.attributes.get(&(identity_id, key.to_string())).cloned())
    }

    async fn set(&self, identity_id: i64, key: &str, value: Option<&str>) -> IdentityResult<()> {
        let mut inner = self.inner.lock().unwrap();
        match value {
            Some(value) => {
                inner
                    .attributes
                    .insert((identity_id, key.to_string()), value.to_string());
            }
            None => {
                inner.attributes.remove(&(identity_id, key.to_string()));
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryNotifications {
    events: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
}

impl MemoryNotifications {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }
}

impl NotificationSink for MemoryNotifications {
    async fn user_registered(&self, identity: &Identity) {
        self.events
            .lock()
            .unwrap()
            .push(format!("user_registered:{}", identity.id));
    }

    async fn user_logged_in(&self, identity: &Identity) {
        self.events
            .lock()
            .unwrap()
            .push(format!("user_logged_in:{}", identity.id));
    }

    async fn password_changed(&self, identity: &Identity) {
        self.events
            .lock()
            .unwrap()
            .push(format!("password_changed:{}", identity.id));
    }

    async fn warning(&self, _identity: &Identity, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }
}

#[derive(Default)]
pub struct MemoryMessenger {
    sent: Mutex<Vec<(&'static str, i64)>>,
}

impl MemoryMessenger {
    pub fn sent(&self) -> Vec<(&'static str, i64)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Messenger for MemoryMessenger {
    async fn send_recovery_message(&self, identity: &Identity, _language_id: i64) -> Vec<u64> {
        self.sent.lock().unwrap().push(("recovery", identity.id));
        vec![1]
    }

    async fn send_revalidation_message(&self, identity: &Identity, _language_id: i64) -> Vec<u64> {
        self.sent.lock().unwrap().push(("revalidation", identity.id));
        vec![1]
    }

    async fn send_welcome_message(&self, identity: &Identity, _language_id: i64) -> Vec<u64> {
        self.sent.lock().unwrap().push(("welcome", identity.id));
        vec![1]
    }

    async fn send_email_validation_message(
        &self,
        identity: &Identity,
        _language_id: i64,
    ) -> Vec<u64> {
        self.sent
            .lock()
            .unwrap()
            .push(("email_validation", identity.id));
        vec![1]
    }
}

#[derive(Default)]
pub struct StaticMfaCatalog {
    active: Mutex<HashSet<String>>,
}

impl StaticMfaCatalog {
    pub fn activate(&self, system_name: &str) {
        self.active.lock().unwrap().insert(system_name.to_string());
    }
}

impl MultiFactorCatalog for StaticMfaCatalog {
    async fn is_provider_active(&self, system_name: &str) -> bool {
        self.active.lock().unwrap().contains(system_name)
    }
}

#[derive(Default)]
pub struct MemorySubscriptions {
    migrated: Mutex<Vec<(String, String)>>,
}

impl MemorySubscriptions {
    pub fn migrated(&self) -> Vec<(String, String)> {
        self.migrated.lock().unwrap().clone()
    }
}

impl SubscriptionDirectory for MemorySubscriptions {
    async fn migrate_email(&self, old_email: &str, new_email: &str) -> IdentityResult<()> {
        self.migrated
            .lock()
            .unwrap()
            .push((old_email.to_string(), new_email.to_string()));
        Ok(())
    }
}
