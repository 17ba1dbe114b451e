pub mod client;
pub mod config;
pub mod error;
pub mod history;
pub mod platform;
pub mod protocol;
pub mod session;
