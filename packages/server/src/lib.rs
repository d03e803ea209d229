// Sophia Socials - publishing core
//
// Publishes scheduled social media posts through n8n automation webhooks and
// records the outcome on each post. Triggered by an external scheduler (or the
// optional in-process cron) and by managers from the dashboard.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
