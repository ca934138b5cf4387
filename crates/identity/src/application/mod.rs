//! Application layer: the workflows controllers call into.

pub mod change_password;
pub mod identity_mutation;
pub mod login;
pub mod recovery;
pub mod registration;

#[cfg(test)]
pub(crate) mod support;
