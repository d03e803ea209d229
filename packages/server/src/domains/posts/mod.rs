pub mod models;

pub use models::post::{DuePost, MediaItem, MediaType, Platform, Post, PostStatus, PostType, UserTag};
