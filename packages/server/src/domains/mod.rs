// Business domains
pub mod auth;
pub mod posts;
pub mod publishing;
pub mod social_accounts;
