//! Processing metrics.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `ally_chain_executions_total` | Counter | `processing`, `outcome` | Chain executions |
//! | `ally_chain_duration_seconds` | Histogram | `processing` | Chain execution time |
//! | `ally_invokers_dropped_total` | Counter | `reason` | Invokers removed while assembling |
//!
//! Recording works without an installed recorder, values are then discarded.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fmt;
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, Default)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Address to expose metrics on (e.g., "0.0.0.0:9090"), if any.
    pub addr: Option<String>,
}

/// How a chain execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Every processor ran.
    Completed,
    /// A processor cancelled the chain.
    Cancelled,
    /// A processor aborted.
    Aborted,
    /// A processor failed.
    Failed,
}

impl ChainOutcome {
    /// Returns the metric label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ChainOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Installs the Prometheus recorder.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidAddress` for a bad listen address and
/// `TelemetryError::MetricsInit` if a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    match &config.addr {
        Some(addr) => {
            let addr: SocketAddr = addr
                .parse()
                .map_err(|e| TelemetryError::InvalidAddress(format!("{addr}: {e}")))?;
            // Serves the scrape endpoint itself, must run inside a Tokio runtime.
            PrometheusBuilder::new()
                .with_http_listener(addr)
                .install()
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        }
        None => {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
            let _ = METRICS_HANDLE.set(handle);
        }
    }

    describe();
    Ok(())
}

/// Renders metrics in Prometheus format.
///
/// Returns `None` if metrics are not initialized or are served by the
/// exporter listener.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn describe() {
    describe_counter!(
        "ally_chain_executions_total",
        "Total number of chain executions by outcome"
    );
    describe_histogram!(
        "ally_chain_duration_seconds",
        "Chain execution duration in seconds"
    );
    describe_counter!(
        "ally_invokers_dropped_total",
        "Invokers removed from the register while assembling"
    );
}

/// Records a finished chain execution.
pub fn record_chain(processing: &str, outcome: ChainOutcome, duration: Duration) {
    counter!(
        "ally_chain_executions_total",
        "processing" => processing.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);

    histogram!(
        "ally_chain_duration_seconds",
        "processing" => processing.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records invokers dropped from a register.
pub fn record_dropped_invokers(reason: &'static str, count: usize) {
    counter!("ally_invokers_dropped_total", "reason" => reason).increment(count as u64);
}
