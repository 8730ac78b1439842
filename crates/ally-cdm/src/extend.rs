//! Path extending content delivery.

use crate::error::CdmError;
use crate::manager::{Cdm, CdmResult, Metadata};
use ally_design::BoxFuture;
use bytes::Bytes;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Delegates to a wrapped manager after formatting every path with a pattern.
///
/// The pattern holds one `{}` placeholder, replaced by the path.
///
/// ```
/// use ally_cdm::{ExtendPathCdm, LocalFileSystemCdm, Cdm};
/// use std::sync::Arc;
///
/// let local = LocalFileSystemCdm::new("/srv/cdm", "/content/").unwrap();
/// let cdm = ExtendPathCdm::new(Arc::new(local), "media/{}").unwrap();
/// assert_eq!(cdm.get_uri("logo.png", "http").unwrap(), "/content/media/logo.png");
/// ```
pub struct ExtendPathCdm {
    wrapped: Arc<dyn Cdm>,
    prefix: String,
    suffix: String,
}

impl ExtendPathCdm {
    /// Creates the manager.
    ///
    /// # Errors
    ///
    /// Returns `CdmError::InvalidPattern` unless the pattern holds exactly
    /// one `{}`.
    pub fn new(wrapped: Arc<dyn Cdm>, pattern: &str) -> CdmResult<Self> {
        let mut parts = pattern.split("{}");
        match (parts.next(), parts.next(), parts.next()) {
            (Some(prefix), Some(suffix), None) => Ok(Self {
                wrapped,
                prefix: prefix.to_string(),
                suffix: suffix.to_string(),
            }),
            _ => Err(CdmError::InvalidPattern(pattern.to_string())),
        }
    }

    /// Returns the path given to the wrapped manager.
    #[must_use]
    pub fn extend(&self, path: &str) -> String {
        format!("{}{path}{}", self.prefix, self.suffix)
    }
}

impl Cdm for ExtendPathCdm {
    fn publish_from_file<'a>(
        &'a self,
        path: &'a str,
        file_path: &'a Path,
        metadata: Metadata,
    ) -> BoxFuture<'a, CdmResult<()>> {
        Box::pin(async move {
            let path = self.extend(path);
            self.wrapped
                .publish_from_file(&path, file_path, metadata)
                .await
        })
    }

    fn publish_content<'a>(
        &'a self,
        path: &'a str,
        content: Bytes,
        metadata: Metadata,
    ) -> BoxFuture<'a, CdmResult<()>> {
        Box::pin(async move {
            let path = self.extend(path);
            self.wrapped.publish_content(&path, content, metadata).await
        })
    }

    fn update_metadata<'a>(
        &'a self,
        path: &'a str,
        metadata: Metadata,
    ) -> BoxFuture<'a, CdmResult<()>> {
        Box::pin(async move {
            let path = self.extend(path);
            self.wrapped.update_metadata(&path, metadata).await
        })
    }

    fn republish<'a>(&'a self, old_path: &'a str, new_path: &'a str) -> BoxFuture<'a, CdmResult<()>> {
        Box::pin(async move {
            let old_path = self.extend(old_path);
            let new_path = self.extend(new_path);
            self.wrapped.republish(&old_path, &new_path).await
        })
    }

    fn remove<'a>(&'a self, path: &'a str) -> BoxFuture<'a, CdmResult<()>> {
        Box::pin(async move {
            let path = self.extend(path);
            self.wrapped.remove(&path).await
        })
    }

    fn supported_protocols(&self) -> Vec<&'static str> {
        self.wrapped.supported_protocols()
    }

    fn get_uri(&self, path: &str, protocol: &str) -> CdmResult<String> {
        self.wrapped.get_uri(&self.extend(path), protocol)
    }

    fn get_metadata<'a>(&'a self, path: &'a str) -> BoxFuture<'a, CdmResult<Metadata>> {
        Box::pin(async move {
            let path = self.extend(path);
            self.wrapped.get_metadata(&path).await
        })
    }
}

impl fmt::Debug for ExtendPathCdm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendPathCdm")
            .field("pattern", &format!("{}{{}}{}", self.prefix, self.suffix))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LocalFileSystemCdm;

    #[test]
    fn test_pattern_needs_one_placeholder() {
        let local: Arc<dyn Cdm> = Arc::new(LocalFileSystemCdm::new("/srv/cdm", "/content/").unwrap());
        assert!(ExtendPathCdm::new(Arc::clone(&local), "media").is_err());
        assert!(ExtendPathCdm::new(Arc::clone(&local), "{}/{}").is_err());

        let cdm = ExtendPathCdm::new(local, "users/{}/avatar").unwrap();
        assert_eq!(cdm.extend("7"), "users/7/avatar");
    }

    #[tokio::test]
    async fn test_delegates_with_extended_path() {
        let dir = tempfile::tempdir().unwrap();
        let local = Arc::new(LocalFileSystemCdm::new(dir.path(), "/content/").unwrap());
        let cdm = ExtendPathCdm::new(local.clone(), "media/{}").unwrap();

        cdm.publish_content("a.txt", Bytes::from_static(b"a"), Metadata::new())
            .await
            .unwrap();
        assert!(dir.path().join("media/a.txt").exists());

        cdm.republish("a.txt", "b.txt").await.unwrap();
        assert!(local.get_metadata("media/b.txt").await.is_ok());

        cdm.remove("b.txt").await.unwrap();
        assert!(!dir.path().join("media/b.txt").exists());
        assert_eq!(cdm.supported_protocols(), ["http", "file"]);
    }
}
