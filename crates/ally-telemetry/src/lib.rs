//! Observability for ally.
//!
//! - **Logging**: structured `tracing` output in JSON, pretty or compact form
//! - **Metrics**: chain execution counters and durations via the `metrics` crate
//!
//! # Standard Metrics
//!
//! ```text
//! # TYPE ally_chain_executions_total counter
//! ally_chain_executions_total{processing="resources",outcome="completed"} 1234
//! ally_chain_executions_total{processing="resources",outcome="cancelled"} 56
//!
//! # TYPE ally_chain_duration_seconds histogram
//! ally_chain_duration_seconds_bucket{processing="resources",le="0.01"} 1000
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use ally_telemetry::{init_telemetry, TelemetryConfig};
//!
//! init_telemetry(&TelemetryConfig::default())?;
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use metrics::{init_metrics, record_chain, ChainOutcome, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Configuration for all telemetry subsystems.
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    /// Logging configuration.
    pub logging: LogConfig,

    /// Metrics configuration.
    pub metrics: MetricsConfig,
}

/// Initializes logging, then metrics.
///
/// # Errors
///
/// Returns `TelemetryError` if any subsystem fails to initialize.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)
}
