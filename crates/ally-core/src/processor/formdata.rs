//! Multipart form data to URL encoded content.
//!
//! When the request content is the first part of a `multipart/form-data`
//! content, the leading form fields are collected and the request content is
//! rewritten as one URL encoded content. The first file part stops the
//! collection; it stays fetchable after the rewritten content so that later
//! decoders can consume the upload.

use crate::codes::{add_error, MULTIPART_ERROR};
use crate::contexts::request_content::{
    self, FetchNext, CHAR_SET, DISPOSITION, DISPOSITION_ATTR, FETCH_NEXT, NAME,
    PREVIOUS_CONTENT, SOURCE, TYPE,
};
use crate::contexts::response;
use ally_design::prelude::*;
use bytes::Bytes;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::debug;

/// The default pattern of multipart form data content types.
pub const MULTIPART_PATTERN: &str = r"^multipart/form\-data$";

static DEFAULT_MULTIPART: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

fn default_multipart() -> Result<&'static Regex, ProcessError> {
    DEFAULT_MULTIPART
        .get_or_init(|| Regex::new(MULTIPART_PATTERN))
        .as_ref()
        .map_err(|err| anyhow::Error::from(err.clone()).into())
}

/// A text that cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The character set is not supported.
    #[error("Unknown character set '{0}'")]
    UnknownCharSet(String),
    /// A byte sequence is not valid in the character set.
    #[error("Invalid {char_set} content at byte {position}")]
    Invalid {
        /// The character set decoded with.
        char_set: String,
        /// Offset of the first invalid byte.
        position: usize,
    },
}

/// Converts multipart form data into URL encoded content.
#[derive(Debug, Clone)]
pub struct ParseFormDataHandler {
    multipart: Option<Regex>,
    char_set: String,
    content_type_url_encoded: String,
    content_disposition: String,
    attr_name: String,
    attr_file: String,
}

enum Part {
    Parameter(String, String),
    File,
    Invalid(String),
}

impl ParseFormDataHandler {
    /// Creates the processor with the default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            multipart: None,
            char_set: "ASCII".to_string(),
            content_type_url_encoded: mime::APPLICATION_WWW_FORM_URLENCODED
                .essence_str()
                .to_string(),
            content_disposition: "form-data".to_string(),
            attr_name: "name".to_string(),
            attr_file: "filename".to_string(),
        }
    }

    /// Sets the pattern of multipart content types.
    pub fn with_multipart_pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.multipart = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Sets the content type of the rewritten content.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type_url_encoded = content_type.into();
        self
    }

    fn parse(&self, chain: &mut Chain) -> Result<(), ProcessError> {
        let content = chain.arg(request_content::CONTEXT)?;
        let Some(previous) = content.get(&PREVIOUS_CONTENT)?.cloned() else {
            // Not a part of a multipart content.
            return Ok(());
        };
        let pattern = match &self.multipart {
            Some(pattern) => pattern,
            None => default_multipart()?,
        };
        let multipart = previous.read().get(&TYPE)?.cloned();
        match multipart {
            Some(kind) if pattern.is_match(&kind) => {
                debug!(content_type = %kind, "Content type is multipart form data");
            }
            _ => return Ok(()),
        }
        let char_set = content.require(&CHAR_SET)?.clone();

        let mut parameters = Vec::new();
        let mut current: Option<SharedContext> = None;
        let remaining = loop {
            let part = match &current {
                None => self.read_part(chain.arg_mut(request_content::CONTEXT)?, &char_set)?,
                Some(shared) => self.read_part(&mut shared.write(), &char_set)?,
            };
            match part {
                Part::Invalid(message) => {
                    let response = chain.arg_mut(response::CONTEXT)?;
                    MULTIPART_ERROR.set(response)?;
                    add_error(response, message)?;
                    return Ok(());
                }
                Part::File => break current,
                Part::Parameter(name, value) => {
                    parameters.push((name, value));
                    let fetch = match &current {
                        None => chain
                            .arg(request_content::CONTEXT)?
                            .get(&FETCH_NEXT)?
                            .cloned(),
                        Some(shared) => shared.read().get(&FETCH_NEXT)?.cloned(),
                    };
                    match fetch.and_then(|fetch| fetch()) {
                        Some(next) => current = Some(next),
                        None => break None,
                    }
                }
            }
        };

        if parameters.is_empty() {
            return Ok(());
        }
        let encoded = serde_urlencoded::to_string(&parameters).map_err(anyhow::Error::from)?;
        let fetch_next: FetchNext = Arc::new(move || remaining.clone());

        let content = chain.arg_mut(request_content::CONTEXT)?;
        content.set(&TYPE, self.content_type_url_encoded.clone())?;
        content.set(&CHAR_SET, self.char_set.clone())?;
        content.set(&FETCH_NEXT, fetch_next)?;
        content.set(&SOURCE, Bytes::from(encoded))?;
        Ok(())
    }

    fn read_part(&self, content: &mut Context, char_set: &str) -> Result<Part, ProcessError> {
        let disposition = content.get(&DISPOSITION)?.cloned().unwrap_or_default();
        if disposition != self.content_disposition {
            return Ok(Part::Invalid(format!(
                "Invalid multipart form data content disposition '{disposition}'"
            )));
        }

        let (file, name) = match content.get_mut(&DISPOSITION_ATTR)? {
            Some(attributes) => (
                attributes.shift_remove(&self.attr_file),
                attributes.shift_remove(&self.attr_name),
            ),
            None => (None, None),
        };
        if let Some(file) = file {
            content.set(&NAME, file)?;
            return Ok(Part::File);
        }
        let Some(name) = name.filter(|name| !name.is_empty()) else {
            return Ok(Part::Invalid(
                "Missing the content disposition header attribute name".to_string(),
            ));
        };

        let source = content.get(&SOURCE)?.cloned().unwrap_or_default();
        Ok(match decode(&source, char_set) {
            Ok(value) => Part::Parameter(name, value),
            Err(err) => Part::Invalid(err.to_string()),
        })
    }
}

impl Default for ParseFormDataHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for ParseFormDataHandler {
    fn name(&self) -> &str {
        "parse_form_data"
    }

    fn contexts(&self) -> Vec<ContextSpec> {
        vec![
            request_content::spec()
                .requires(&TYPE)
                .requires(&CHAR_SET)
                .requires(&DISPOSITION)
                .requires(&DISPOSITION_ATTR)
                .requires(&SOURCE)
                .requires(&PREVIOUS_CONTENT)
                .requires(&FETCH_NEXT)
                .defines(&NAME),
            response::coded_error(),
        ]
    }

    fn process<'a>(&'a self, chain: &'a mut Chain) -> BoxFuture<'a, Result<(), ProcessError>> {
        Box::pin(async move { self.parse(chain) })
    }
}

/// Decodes text in one of the supported character sets.
///
/// # Errors
///
/// Returns `DecodeError` if the character set is unknown or the source holds
/// bytes invalid for it.
pub fn decode(source: &[u8], char_set: &str) -> Result<String, DecodeError> {
    let invalid = |position| DecodeError::Invalid {
        char_set: char_set.to_string(),
        position,
    };
    match char_set.to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" => String::from_utf8(source.to_vec())
            .map_err(|err| invalid(err.utf8_error().valid_up_to())),
        "ascii" | "us-ascii" => match source.iter().position(|byte| !byte.is_ascii()) {
            Some(position) => Err(invalid(position)),
            None => Ok(source.iter().map(|&byte| char::from(byte)).collect()),
        },
        "iso-8859-1" | "latin-1" | "latin1" => Ok(source.iter().map(|&byte| char::from(byte)).collect()),
        _ => Err(DecodeError::UnknownCharSet(char_set.to_string())),
    }
}
