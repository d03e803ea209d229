// HTTP routes
pub mod health;
pub mod publish;
pub mod scheduled;

pub use health::*;
pub use publish::*;
pub use scheduled::*;
