pub mod credential;
pub mod identity;
pub mod role;

pub use credential::CredentialRecord;
pub use identity::Identity;
pub use role::Role;
