//! Serves published content.

use crate::local::normalize;
use ally_core::codes::{add_error, NOT_FOUND};
use ally_core::contexts::{request, response, response_content};
use ally_design::prelude::*;
use bytes::Bytes;
use mime::Mime;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Delivers the repository file of the request URI.
///
/// Runs in the content assembly, behind the content router that strips the
/// content root. A missing file, or a URI outside the repository, gives
/// NOT_FOUND.
#[derive(Debug, Clone)]
pub struct ContentDeliveryHandler {
    repository: PathBuf,
}

impl ContentDeliveryHandler {
    /// Creates the processor over a repository directory.
    #[must_use]
    pub fn new(repository: impl Into<PathBuf>) -> Self {
        Self {
            repository: repository.into(),
        }
    }

    async fn read(&self, uri: &str) -> Option<(Bytes, Mime)> {
        let path = normalize(uri).ok()?;
        let file = self.repository.join(&path);
        let content = fs::read(&file).await.ok()?;
        Some((Bytes::from(content), content_type(&file)))
    }
}

impl Processor for ContentDeliveryHandler {
    fn name(&self) -> &str {
        "content_delivery"
    }

    fn contexts(&self) -> Vec<ContextSpec> {
        vec![
            request::spec().requires(&request::URI),
            response::coded_error(),
            response_content::spec()
                .defines(&response_content::SOURCE)
                .defines(&response_content::TYPE)
                .defines(&response_content::LENGTH),
        ]
    }

    fn process<'a>(&'a self, chain: &'a mut Chain) -> BoxFuture<'a, Result<(), ProcessError>> {
        Box::pin(async move {
            let uri = chain.arg(request::CONTEXT)?.require(&request::URI)?.clone();

            let Some((source, kind)) = self.read(&uri).await else {
                debug!(%uri, "No content to deliver");
                let resp = chain.arg_mut(response::CONTEXT)?;
                NOT_FOUND.set(resp)?;
                add_error(resp, format!("Invalid content path '{uri}'"))?;
                return Ok(());
            };

            let content = chain.arg_mut(response_content::CONTEXT)?;
            content.set(&response_content::LENGTH, source.len() as u64)?;
            content.set(&response_content::TYPE, kind.to_string())?;
            content.set(&response_content::SOURCE, source)?;
            Ok(())
        })
    }
}

/// Returns the content type of a file from its extension.
#[must_use]
pub fn content_type(file: &Path) -> Mime {
    let extension = file
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_lowercase);
    match extension.as_deref() {
        Some("txt") => mime::TEXT_PLAIN_UTF_8,
        Some("html" | "htm") => mime::TEXT_HTML_UTF_8,
        Some("css") => mime::TEXT_CSS_UTF_8,
        Some("js") => mime::APPLICATION_JAVASCRIPT_UTF_8,
        Some("json") => mime::APPLICATION_JSON,
        Some("xml") => mime::TEXT_XML,
        Some("png") => mime::IMAGE_PNG,
        Some("jpg" | "jpeg") => mime::IMAGE_JPEG,
        Some("gif") => mime::IMAGE_GIF,
        Some("svg") => mime::IMAGE_SVG,
        Some("pdf") => mime::APPLICATION_PDF,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}
