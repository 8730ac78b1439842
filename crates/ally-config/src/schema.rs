//! Configuration schema types.
//!
//! This module defines the structure of all configuration sections.

use ally_telemetry::{LogConfig, LogFormat};
use serde::{Deserialize, Serialize};

/// Server configuration section.
///
/// # Example
///
/// ```
/// use ally_config::ServerConfig;
///
/// let config = ServerConfig::default();
/// assert_eq!(config.root_uri, "resources");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// The root URI of the REST resources.
    #[serde(default = "default_root_uri")]
    pub root_uri: String,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            root_uri: default_root_uri(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_root_uri() -> String {
    "resources".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directives (e.g., "info", "ally_core=debug").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Enable ANSI colors.
    #[serde(default)]
    pub ansi_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::Json,
            ansi_enabled: false,
        }
    }
}

impl LoggingConfig {
    /// Converts the section into the logging subsystem configuration.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            format: self.format,
            ansi: self.ansi_enabled,
            ..LogConfig::default()
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// Metrics configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics.
    #[serde(default)]
    pub enabled: bool,

    /// Address of the metrics listener, if any.
    #[serde(default)]
    pub addr: Option<String>,
}

/// Content delivery configuration section.
///
/// # Example
///
/// ```
/// use ally_config::CdmConfig;
///
/// let config = CdmConfig::default();
/// assert!(config.server_provide_content);
/// assert_eq!(config.root_uri_content, "content");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CdmConfig {
    /// The local repository of published content.
    #[serde(default = "default_repository_path")]
    pub repository_path: String,

    /// The URI the content is served under, prefixed to `http` URIs.
    #[serde(default = "default_server_uri")]
    pub server_uri: String,

    /// Serve the repository content from this server.
    #[serde(default = "default_true")]
    pub server_provide_content: bool,

    /// The root URI matching content paths.
    #[serde(default = "default_root_uri_content")]
    pub root_uri_content: String,
}

impl Default for CdmConfig {
    fn default() -> Self {
        Self {
            repository_path: default_repository_path(),
            server_uri: default_server_uri(),
            server_provide_content: true,
            root_uri_content: default_root_uri_content(),
        }
    }
}

fn default_repository_path() -> String {
    "workspace/cdm".to_string()
}

fn default_server_uri() -> String {
    "/content/".to_string()
}

fn default_root_uri_content() -> String {
    "content".to_string()
}

/// How the gateway is provided.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GatewayMode {
    /// The gateway routes every request of this server.
    External,
    /// The gateway is only used by internal calls.
    Internal,
    /// No gateway.
    #[default]
    None,
}

/// Gateway configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// The gateway mode.
    #[serde(default)]
    pub mode: GatewayMode,
}

/// Access control configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AclConfig {
    /// Groups marked as anonymous when synchronized.
    #[serde(default = "default_anonymous_groups")]
    pub anonymous_groups: Vec<String>,

    /// The right type of the configured rights.
    #[serde(default = "default_right_type")]
    pub right_type: String,
}

impl Default for AclConfig {
    fn default() -> Self {
        Self {
            anonymous_groups: default_anonymous_groups(),
            right_type: default_right_type(),
        }
    }
}

fn default_anonymous_groups() -> Vec<String> {
    vec!["Anonymous".to_string()]
}

fn default_right_type() -> String {
    "GUI Access".to_string()
}
