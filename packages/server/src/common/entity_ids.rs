//! Typed ID definitions for the entities this service reads and writes.

pub use super::id::Id;

/// Marker type for Post entities.
pub struct Post;

/// Marker type for SocialAccount entities.
pub struct SocialAccount;

/// Marker type for dashboard users.
pub struct User;

pub type PostId = Id<Post>;

pub type SocialAccountId = Id<SocialAccount>;

pub type UserId = Id<User>;
