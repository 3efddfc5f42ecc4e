pub mod error;
pub mod types;
pub mod config;
pub mod channel;
pub mod render;
pub mod provider;
pub mod responder;
pub mod router;
pub mod fulfillment;
pub mod service;
pub mod util;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_HASH: &str = env!("GIT_HASH");
