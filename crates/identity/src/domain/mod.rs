//! Domain layer: entities, value objects, pure policies and the
//! collaborator traits the workflows depend on.

pub mod entity;
pub mod lockout;
pub mod password_expiry;
pub mod repository;
pub mod value_object;
