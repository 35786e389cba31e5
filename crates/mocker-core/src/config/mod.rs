//! Configuration loading: client options and fixture files.

pub mod client;
pub mod error;
pub mod parser;

pub use client::ClientConfig;
pub use error::ConfigError;
