//! # Ally CDM
//!
//! Content delivery for ally applications.
//!
//! A content delivery manager ([`Cdm`]) publishes content under repository
//! paths and tells the URI it is delivered at, per protocol:
//!
//! | Type | Role |
//! |------|------|
//! | [`LocalFileSystemCdm`] | Stores content under a local directory |
//! | [`ExtendPathCdm`] | Formats paths with a `{}` pattern, then delegates |
//! | [`ContentDeliveryHandler`] | Serves repository files in the content assembly |
//!
//! ## Example
//!
//! ```no_run
//! use ally_cdm::{Cdm, LocalFileSystemCdm, Metadata};
//! use bytes::Bytes;
//!
//! # async fn publish() -> Result<(), ally_cdm::CdmError> {
//! let cdm = LocalFileSystemCdm::new("workspace/cdm", "/content/")?;
//! cdm.publish_content("docs/readme.txt", Bytes::from_static(b"hello"), Metadata::new())
//!     .await?;
//! assert_eq!(cdm.get_uri("docs/readme.txt", "http")?, "/content/docs/readme.txt");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod delivery;
mod error;
pub mod extend;
pub mod local;
pub mod manager;

pub use delivery::ContentDeliveryHandler;
pub use error::CdmError;
pub use extend::ExtendPathCdm;
pub use local::LocalFileSystemCdm;
pub use manager::{Cdm, CdmResult, Metadata, PROTOCOL_FILE, PROTOCOL_HTTP};
