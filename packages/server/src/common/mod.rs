// Common types shared across domains and the HTTP layer

pub mod auth;
pub mod entity_ids;
pub mod id;

pub use auth::{AuthError, UserRole};
pub use entity_ids::*;
pub use id::Id;
