//! Identity Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Business logic, entities, repository traits
//! - `application/` - Use cases and application services
//! - `infra/` - Database implementations
//!
//! ## Features
//! - Login resolution by email or username with lockout tracking
//! - Registration with guest-to-registered role promotion
//! - Password change with append-only credential history
//! - Opaque recovery / email-revalidation tokens with expiry
//! - Email and username mutation, optionally gated by revalidation
//!
//! ## Security Model
//! - Passwords hashed with Argon2id by default (SHA-2 digests and a
//!   reversible AES-256-GCM format remain supported for stored data)
//! - Credentials are append-only; recency decides which one is current
//! - Automatic lockout after failed login attempts
//! - Recovery tokens are single-use and overwritten on re-issue

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod settings;

// Re-exports for convenience
pub use error::{IdentityError, IdentityResult};
pub use infra::postgres::PgIdentityStore;
pub use settings::IdentitySettings;

pub mod workflows {
    pub use crate::application::change_password::{ChangePasswordRequest, PasswordChangeWorkflow};
    pub use crate::application::identity_mutation::IdentityMutationWorkflow;
    pub use crate::application::login::{LoginOutcome, LoginWorkflow};
    pub use crate::application::recovery::{RecoveryTokenManager, TokenKind};
    pub use crate::application::registration::{
        RegistrationRequest, RegistrationType, RegistrationWorkflow,
    };
}

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
}

pub mod store {
    pub use crate::infra::postgres::PgIdentityStore as IdentityDb;
}
