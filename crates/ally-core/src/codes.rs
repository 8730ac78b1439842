//! Response codes.
//!
//! A [`Code`] is set on the response context as three attributes: the code
//! name, the success flag and the HTTP status.

use crate::contexts::response::{CODE, ERROR_MESSAGES, IS_SUCCESS, STATUS};
use ally_design::{Context, ContextError};
use http::StatusCode;
use std::fmt;

/// A response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code {
    /// The code name.
    pub code: &'static str,
    /// True for success codes.
    pub is_success: bool,
    /// The HTTP status.
    pub status: u16,
}

impl Code {
    /// Creates a code.
    #[must_use]
    pub const fn new(code: &'static str, is_success: bool, status: u16) -> Self {
        Self {
            code,
            is_success,
            status,
        }
    }

    /// Sets the code on a response.
    pub fn set(&self, response: &mut Context) -> Result<(), ContextError> {
        response.set(&CODE, self.code.to_string())?;
        response.set(&IS_SUCCESS, self.is_success)?;
        response.set(&STATUS, self.status)?;
        Ok(())
    }

    /// Returns the HTTP status code.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.code)
    }
}

/// The request input is invalid.
pub const INPUT_ERROR: Code = Code::new("INPUT_ERROR", false, 400);
/// A model was inserted.
pub const INSERT_SUCCESS: Code = Code::new("INSERT_SUCCESS", true, 201);
/// A model could not be inserted.
pub const INSERT_ERROR: Code = Code::new("INSERT_ERROR", false, 400);
/// A model was updated.
pub const UPDATE_SUCCESS: Code = Code::new("UPDATE_SUCCESS", true, 200);
/// A model could not be updated.
pub const UPDATE_ERROR: Code = Code::new("UPDATE_ERROR", false, 400);
/// A model was deleted.
pub const DELETE_SUCCESS: Code = Code::new("DELETE_SUCCESS", true, 204);
/// A model could not be deleted.
pub const DELETE_ERROR: Code = Code::new("DELETE_ERROR", false, 404);
/// The multipart content is invalid.
pub const MULTIPART_ERROR: Code = Code::new("MULTIPART_ERROR", false, 400);
/// The requested resource does not exist.
pub const NOT_FOUND: Code = Code::new("NOT_FOUND", false, 404);

/// Appends an error message to a response.
pub fn add_error(response: &mut Context, message: impl Into<String>) -> Result<(), ContextError> {
    response
        .get_or_insert_with(&ERROR_MESSAGES, Vec::new)?
        .push(message.into());
    Ok(())
}

/// Returns true if a code marked the response as failed.
pub fn is_failed(response: &Context) -> Result<bool, ContextError> {
    Ok(response.get(&IS_SUCCESS)? == Some(&false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contexts::response;

    fn response() -> Context {
        Context::from_spec(&response::coded_error())
    }

    #[test]
    fn test_set_code() {
        let mut response = response();
        assert!(!is_failed(&response).unwrap());

        INSERT_ERROR.set(&mut response).unwrap();
        assert_eq!(response.get(&CODE).unwrap().map(String::as_str), Some("INSERT_ERROR"));
        assert_eq!(response.get(&STATUS).unwrap(), Some(&400));
        assert!(is_failed(&response).unwrap());

        DELETE_SUCCESS.set(&mut response).unwrap();
        assert!(!is_failed(&response).unwrap());
    }

    #[test]
    fn test_add_error_appends() {
        let mut response = response();
        add_error(&mut response, "first").unwrap();
        add_error(&mut response, "second").unwrap();
        assert_eq!(
            response.require(&ERROR_MESSAGES).unwrap(),
            &["first".to_string(), "second".to_string()]
        );
    }

    #[test]
    fn test_status_code() {
        assert_eq!(NOT_FOUND.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(INSERT_SUCCESS.to_string(), "201 INSERT_SUCCESS");
    }
}
