//! Local file system content delivery.
//!
//! Content is stored as plain files under the repository directory. The
//! metadata of `a/b.txt` is stored as JSON in `.metadata/a/b.txt.json`, so
//! the repository can be served as is.

use crate::error::CdmError;
use crate::manager::{Cdm, CdmResult, Metadata, PROTOCOL_FILE, PROTOCOL_HTTP};
use ally_design::BoxFuture;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// The repository directory holding metadata files.
pub const METADATA_DIR: &str = ".metadata";

/// Normalizes a repository path.
///
/// Empty and `.` segments are dropped. Paths leaving the repository or
/// pointing into the metadata directory are rejected.
///
/// ```
/// use ally_cdm::local::normalize;
///
/// assert_eq!(normalize("/images//./logo.png").unwrap(), "images/logo.png");
/// assert!(normalize("images/../../etc/passwd").is_err());
/// ```
///
/// # Errors
///
/// Returns `CdmError::InvalidPath` for rejected paths.
pub fn normalize(path: &str) -> CdmResult<String> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(CdmError::invalid_path(path, "leaves the repository")),
            segment if segment.contains('\\') => {
                return Err(CdmError::invalid_path(path, "contains a backslash"))
            }
            segment => segments.push(segment),
        }
    }
    match segments.first() {
        None => Err(CdmError::invalid_path(path, "empty path")),
        Some(&METADATA_DIR) => Err(CdmError::invalid_path(path, "reserved for metadata")),
        Some(_) => Ok(segments.join("/")),
    }
}

/// Content delivery manager over a local directory.
#[derive(Debug, Clone)]
pub struct LocalFileSystemCdm {
    repository: PathBuf,
    server_uri: String,
}

impl LocalFileSystemCdm {
    /// Creates the manager over `repository`, served under `server_uri`.
    ///
    /// # Errors
    ///
    /// Returns `CdmError::Io` if the current directory is needed to make the
    /// repository path absolute and cannot be read.
    pub fn new(repository: impl Into<PathBuf>, server_uri: impl Into<String>) -> CdmResult<Self> {
        let repository = repository.into();
        let repository = if repository.is_absolute() {
            repository
        } else {
            std::env::current_dir()
                .map_err(|e| CdmError::io(&repository, e))?
                .join(repository)
        };
        Ok(Self {
            repository,
            server_uri: server_uri.into(),
        })
    }

    /// Returns the absolute repository directory.
    #[must_use]
    pub fn repository(&self) -> &Path {
        &self.repository
    }

    /// Returns the file of a repository path.
    ///
    /// # Errors
    ///
    /// Returns `CdmError::InvalidPath` for rejected paths.
    pub fn content_file(&self, path: &str) -> CdmResult<PathBuf> {
        Ok(self.repository.join(normalize(path)?))
    }

    fn metadata_file(&self, path: &str) -> CdmResult<PathBuf> {
        Ok(self
            .repository
            .join(METADATA_DIR)
            .join(format!("{}.json", normalize(path)?)))
    }

    async fn ensure_published(&self, path: &str) -> CdmResult<PathBuf> {
        let file = self.content_file(path)?;
        match fs::metadata(&file).await {
            Ok(info) if info.is_file() => Ok(file),
            Ok(_) => Err(CdmError::not_found(path)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CdmError::not_found(path)),
            Err(e) => Err(CdmError::io(file, e)),
        }
    }

    async fn read_metadata(&self, path: &str) -> CdmResult<Metadata> {
        let file = self.metadata_file(path)?;
        match fs::read(&file).await {
            Ok(content) => Ok(serde_json::from_slice(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Metadata::new()),
            Err(e) => Err(CdmError::io(file, e)),
        }
    }

    async fn write_metadata(&self, path: &str, metadata: &Metadata) -> CdmResult<()> {
        let file = self.metadata_file(path)?;
        if metadata.is_empty() {
            return remove_if_exists(&file).await;
        }
        create_parent(&file).await?;
        let content = serde_json::to_vec_pretty(metadata)?;
        fs::write(&file, content)
            .await
            .map_err(|e| CdmError::io(file, e))
    }
}

async fn create_parent(file: &Path) -> CdmResult<()> {
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| CdmError::io(parent, e))?;
    }
    Ok(())
}

async fn remove_if_exists(file: &Path) -> CdmResult<()> {
    match fs::remove_file(file).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CdmError::io(file, e)),
    }
}

impl Cdm for LocalFileSystemCdm {
    fn publish_from_file<'a>(
        &'a self,
        path: &'a str,
        file_path: &'a Path,
        metadata: Metadata,
    ) -> BoxFuture<'a, CdmResult<()>> {
        Box::pin(async move {
            let file = self.content_file(path)?;
            create_parent(&file).await?;
            fs::copy(file_path, &file)
                .await
                .map_err(|e| CdmError::io(file_path, e))?;
            self.write_metadata(path, &metadata).await?;
            debug!(%path, from = %file_path.display(), "Published content from file");
            Ok(())
        })
    }

    fn publish_content<'a>(
        &'a self,
        path: &'a str,
        content: Bytes,
        metadata: Metadata,
    ) -> BoxFuture<'a, CdmResult<()>> {
        Box::pin(async move {
            let file = self.content_file(path)?;
            create_parent(&file).await?;
            fs::write(&file, &content)
                .await
                .map_err(|e| CdmError::io(&file, e))?;
            self.write_metadata(path, &metadata).await?;
            debug!(%path, length = content.len(), "Published content");
            Ok(())
        })
    }

    fn update_metadata<'a>(
        &'a self,
        path: &'a str,
        metadata: Metadata,
    ) -> BoxFuture<'a, CdmResult<()>> {
        Box::pin(async move {
            self.ensure_published(path).await?;
            let mut current = self.read_metadata(path).await?;
            current.extend(metadata);
            self.write_metadata(path, &current).await
        })
    }

    fn republish<'a>(&'a self, old_path: &'a str, new_path: &'a str) -> BoxFuture<'a, CdmResult<()>> {
        Box::pin(async move {
            let old_file = self.ensure_published(old_path).await?;
            let new_file = self.content_file(new_path)?;
            create_parent(&new_file).await?;
            fs::rename(&old_file, &new_file)
                .await
                .map_err(|e| CdmError::io(&old_file, e))?;

            let metadata = self.read_metadata(old_path).await?;
            remove_if_exists(&self.metadata_file(old_path)?).await?;
            self.write_metadata(new_path, &metadata).await?;
            debug!(from = %old_path, to = %new_path, "Republished content");
            Ok(())
        })
    }

    fn remove<'a>(&'a self, path: &'a str) -> BoxFuture<'a, CdmResult<()>> {
        Box::pin(async move {
            let file = self.ensure_published(path).await?;
            fs::remove_file(&file)
                .await
                .map_err(|e| CdmError::io(&file, e))?;
            remove_if_exists(&self.metadata_file(path)?).await?;
            debug!(%path, "Removed content");
            Ok(())
        })
    }

    fn supported_protocols(&self) -> Vec<&'static str> {
        vec![PROTOCOL_HTTP, PROTOCOL_FILE]
    }

    fn get_uri(&self, path: &str, protocol: &str) -> CdmResult<String> {
        let path = normalize(path)?;
        match protocol {
            PROTOCOL_HTTP => Ok(format!("{}{path}", self.server_uri)),
            PROTOCOL_FILE => Ok(self.repository.join(&path).display().to_string()),
            other => Err(CdmError::UnsupportedProtocol(other.to_string())),
        }
    }

    fn get_metadata<'a>(&'a self, path: &'a str) -> BoxFuture<'a, CdmResult<Metadata>> {
        Box::pin(async move {
            self.ensure_published(path).await?;
            self.read_metadata(path).await
        })
    }
}
