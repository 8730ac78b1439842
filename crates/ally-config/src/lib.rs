//! Typed configuration for ally applications.
//!
//! This crate provides a strongly-typed configuration with support for:
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Overview
//!
//! [`AllyConfig`] holds every section:
//!
//! - [`ServerConfig`] - Bind address and the resources root URI
//! - [`LoggingConfig`] / [`MetricsConfig`] - Telemetry settings
//! - [`CdmConfig`] - Content repository and content serving
//! - [`GatewayConfig`] - How the gateway is provided
//! - [`AclConfig`] - Access control synchronization settings
//!
//! # Example
//!
//! ```no_run
//! use ally_config::ConfigLoader;
//!
//! # fn main() -> Result<(), ally_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_dotenv()
//!     .with_optional_file("ally.toml")?
//!     .with_env_prefix("ALLY")
//!     .load()?;
//!
//! println!("Serving content from: {}", config.cdm.repository_path);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! root_uri = "resources"
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [cdm]
//! repository_path = "workspace/cdm"
//! server_uri = "/content/"
//! server_provide_content = true
//! root_uri_content = "content"
//!
//! [gateway]
//! mode = "external"
//!
//! [acl]
//! anonymous_groups = ["Anonymous"]
//! right_type = "GUI Access"
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::AllyConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{
    AclConfig, CdmConfig, GatewayConfig, GatewayMode, LoggingConfig, MetricsConfig, ServerConfig,
};
