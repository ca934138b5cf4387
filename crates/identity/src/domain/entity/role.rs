//! Role Entity
//!
//! Named group with an active flag. Membership is a many-to-many
//! association mutated explicitly through the store, never implicitly.

/// Well-known system role names.
pub mod system_roles {
    pub const ADMINISTRATORS: &str = "Administrators";
    pub const REGISTERED: &str = "Registered";
    pub const GUESTS: &str = "Guests";
}

/// Role entity
#[derive(Debug, Clone)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub active: bool,
    /// Required for engine semantics (Registered/Guests), never user-deletable
    pub is_system_role: bool,
    pub system_name: Option<String>,
    /// Whether members of this role are subject to password expiry
    pub enforce_password_lifetime: bool,
}

impl Role {
    pub fn is_system(&self, system_name: &str) -> bool {
        self.system_name.as_deref() == Some(system_name)
    }
}

/// Whether any of the given roles is the active `Registered` system role.
pub fn is_registered(roles: &[Role]) -> bool {
    roles
        .iter()
        .any(|r| r.active && r.is_system(system_roles::REGISTERED))
}

/// Whether any of the given roles is the `Guests` system role.
pub fn is_guest(roles: &[Role]) -> bool {
    roles.iter().any(|r| r.is_system(system_roles::GUESTS))
}
