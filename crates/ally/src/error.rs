//! Application errors.

use ally_cdm::CdmError;
use ally_config::ConfigError;
use ally_core::AllyError;
use ally_design::{AssemblyError, ResolveError};
use ally_telemetry::TelemetryError;
use thiserror::Error;

/// Errors raised while wiring or starting an application.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Telemetry could not be initialized.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// The content repository cannot be used.
    #[error(transparent)]
    Cdm(#[from] CdmError),

    /// An assembly cannot be built.
    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    /// An assembly cannot be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Invokers cannot be registered.
    #[error(transparent)]
    Ally(#[from] AllyError),
}
