//! Main configuration type.

use serde::{Deserialize, Serialize};

use crate::{
    AclConfig, CdmConfig, ConfigError, GatewayConfig, LoggingConfig, MetricsConfig, ServerConfig,
};
use ally_telemetry::TelemetryConfig;

/// Complete ally application configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use ally_config::AllyConfig;
///
/// let config = AllyConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct AllyConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Content delivery configuration.
    #[serde(default)]
    pub cdm: CdmConfig,

    /// Gateway configuration.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Access control configuration.
    #[serde(default)]
    pub acl: AclConfig,
}

impl AllyConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - An address is not a socket address
    /// - A root URI is empty or the content root equals the resources root
    /// - The CDM repository path is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .server
            .http_addr
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if let Some(addr) = self.metrics.addr.as_deref().filter(|_| self.metrics.enabled) {
            if addr.parse::<std::net::SocketAddr>().is_err() {
                return Err(ConfigError::invalid_value(
                    "metrics.addr",
                    format!("invalid socket address: {addr}"),
                ));
            }
        }

        let root_uri = self.server.root_uri.trim_matches('/');
        if root_uri.is_empty() {
            return Err(ConfigError::invalid_value("server.root_uri", "must not be empty"));
        }

        if self.cdm.repository_path.is_empty() {
            return Err(ConfigError::invalid_value(
                "cdm.repository_path",
                "must not be empty",
            ));
        }

        if self.cdm.server_provide_content {
            let root_uri_content = self.cdm.root_uri_content.trim_matches('/');
            if root_uri_content.is_empty() {
                return Err(ConfigError::invalid_value(
                    "cdm.root_uri_content",
                    "must not be empty when serving content",
                ));
            }
            if root_uri_content == root_uri {
                return Err(ConfigError::invalid_value(
                    "cdm.root_uri_content",
                    format!("conflicts with server.root_uri '{root_uri}'"),
                ));
            }
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// Pretty, colored debug logs and metrics enabled without a listener.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = ally_telemetry::LogFormat::Pretty;
        config.logging.ansi_enabled = true;
        config.metrics.enabled = true;
        config
    }

    /// Returns the telemetry subsystem configuration.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig {
            logging: self.logging.to_log_config(),
            metrics: ally_telemetry::MetricsConfig {
                enabled: self.metrics.enabled,
                addr: self.metrics.addr.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GatewayMode;

    #[test]
    fn test_invalid_http_addr() {
        let mut config = AllyConfig::default();
        config.server.http_addr = "localhost".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.http_addr"));
    }

    #[test]
    fn test_content_root_conflicts_with_resources() {
        let mut config = AllyConfig::default();
        config.cdm.root_uri_content = "/resources/".to_string();
        assert!(config.validate().is_err());

        config.cdm.server_provide_content = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_metrics_addr_checked_when_enabled() {
        let mut config = AllyConfig::default();
        config.metrics.addr = Some("nowhere".to_string());
        assert!(config.validate().is_ok());

        config.metrics.enabled = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_development_preset() {
        let config = AllyConfig::development();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.gateway.mode, GatewayMode::None);
        let telemetry = config.telemetry();
        assert!(telemetry.metrics.enabled);
        assert!(telemetry.logging.ansi);
    }
}
