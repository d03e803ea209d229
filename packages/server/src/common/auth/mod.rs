/// Authorization primitives for the dashboard.
///
/// Only managers and admins may push a post out to the social networks:
///
/// ```rust
/// use socials_core::common::UserRole;
///
/// assert!(UserRole::Manager.can_publish());
/// assert!(!UserRole::User.can_publish());
/// ```
mod errors;
mod role;

pub use errors::AuthError;
pub use role::UserRole;
