//! Client module - HTTP transport, configuration and logging setup

pub mod config;
pub mod http;
pub mod logging;

pub use config::{Config, ConfigError, ConfigOrigin};
pub use http::{ClientError, HttpMemoryClient};
pub use logging::init_logging;
