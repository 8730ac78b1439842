//! # Ally
//!
//! **REST framework built on processor pipelines**
//!
//! Requests and assembly-time registrations flow through chains of
//! processors. Each processor declares the context attributes it requires,
//! defines or optionally uses; declarations are resolved into typed
//! contexts before anything runs.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ally::prelude::*;
//!
//! # async fn run() -> Result<(), ally::ApplicationError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_optional_file("ally.toml")?
//!     .with_env_prefix("ALLY")
//!     .load()?;
//!
//! let mut app = Application::from_config(config)?;
//! app.resources_mut().add(InvokingHandler::new())?;
//! app.add_source(request::spec().defines(&request::INVOKER));
//!
//! let server = app.server_processing()?;
//! # let _ = server;
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! | Crate | Role |
//! |-------|------|
//! | [`design`] | Contexts, processors, assemblies and their resolution |
//! | [`core`] | API types, codes, DI container and request processors |
//! | [`config`] | Layered configuration |
//! | [`telemetry`] | Logging and metrics |
//! | [`cdm`] | Content delivery |
//! | [`acl`] | Gateway ACL glue |

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod application;
mod error;

pub use ally_acl as acl;
pub use ally_cdm as cdm;
pub use ally_config as config;
pub use ally_core as core;
pub use ally_design as design;
pub use ally_telemetry as telemetry;

pub use application::{Application, CONTENT, GATEWAY, RESOURCES};
pub use ally_config::{AllyConfig, ConfigLoader};
pub use error::ApplicationError;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{AllyConfig, Application, ApplicationError, ConfigLoader};

    pub use ally_core::prelude::*;
    pub use ally_core::{Container, Inject};

    pub use ally_design::prelude::*;

    pub use ally_cdm::{Cdm, ContentDeliveryHandler, LocalFileSystemCdm};
}
