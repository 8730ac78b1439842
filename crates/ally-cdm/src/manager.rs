//! The content delivery manager interface.

use crate::error::CdmError;
use ally_design::BoxFuture;
use bytes::Bytes;
use serde_json::{Map, Value};
use std::path::Path;

/// Metadata published with a content.
pub type Metadata = Map<String, Value>;

/// Result type of content delivery operations.
pub type CdmResult<T> = Result<T, CdmError>;

/// The `http` protocol, URIs served by the content router.
pub const PROTOCOL_HTTP: &str = "http";
/// The `file` protocol, absolute paths on the local file system.
pub const PROTOCOL_FILE: &str = "file";

/// Publishes content under repository paths and tells where it is delivered.
///
/// Repository paths are relative, `/` separated, and never leave the
/// repository.
pub trait Cdm: Send + Sync {
    /// Publishes a copy of a local file.
    fn publish_from_file<'a>(
        &'a self,
        path: &'a str,
        file_path: &'a Path,
        metadata: Metadata,
    ) -> BoxFuture<'a, CdmResult<()>>;

    /// Publishes content bytes.
    fn publish_content<'a>(
        &'a self,
        path: &'a str,
        content: Bytes,
        metadata: Metadata,
    ) -> BoxFuture<'a, CdmResult<()>>;

    /// Merges metadata into the metadata of a published content.
    fn update_metadata<'a>(&'a self, path: &'a str, metadata: Metadata)
        -> BoxFuture<'a, CdmResult<()>>;

    /// Moves a published content, with its metadata.
    fn republish<'a>(&'a self, old_path: &'a str, new_path: &'a str) -> BoxFuture<'a, CdmResult<()>>;

    /// Removes a published content.
    fn remove<'a>(&'a self, path: &'a str) -> BoxFuture<'a, CdmResult<()>>;

    /// Returns the protocols [`Cdm::get_uri`] supports.
    fn supported_protocols(&self) -> Vec<&'static str>;

    /// Returns the URI of a path for a protocol.
    fn get_uri(&self, path: &str, protocol: &str) -> CdmResult<String>;

    /// Returns the metadata of a published content.
    fn get_metadata<'a>(&'a self, path: &'a str) -> BoxFuture<'a, CdmResult<Metadata>>;
}
