pub mod social_account;

pub use social_account::*;
