pub mod models;

pub use models::SocialAccount;
