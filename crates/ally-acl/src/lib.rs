//! # Ally ACL
//!
//! Access control glue for the ally gateway.
//!
//! - [`FilterTargetHandler`] runs in the assembler processing and resolves
//!   the property each ACL filter checks.
//! - [`SynchronizeGroupsHandler`] and [`SynchronizeRightsHandler`] make the
//!   database hold the groups and rights of the configuration.
//!
//! Storage is abstracted by the [`service`] traits.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod filter_target;
pub mod service;
pub mod synchronize;

#[cfg(test)]
mod fixtures;

/// The domain of the ACL models.
pub const DOMAIN: &str = "ACL/";

pub use error::{SyncError, SyncResult};
pub use filter_target::{acl_filter, FilterTargetHandler};
pub use service::{
    EntityService, Group, GroupService, Right, RightId, RightService, RightType, RightTypeService,
};
pub use synchronize::{
    sync_with_database, SynchronizeGroupsHandler, SynchronizeRightsHandler,
};
