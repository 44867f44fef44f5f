pub mod config;
pub mod entity;
pub mod error;
pub mod server;
pub mod store;
pub type Result<T> = std::result::Result<T, crate::error::RelayError>;
