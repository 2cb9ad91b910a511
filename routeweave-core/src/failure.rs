//! Structured HTTP failures.
//!
//! A [`Failure`] is the canonical representation of an error outcome: a 4xx or
//! 5xx status code, headers to send along, and a JSON payload of the form
//! `{"statusCode": 400, "error": "Bad Request", "message": "..."}`.
//!
//! ```rust
//! use routeweave_core::Failure;
//!
//! let failure = Failure::not_found("no such user").with_header("x-reason", "lookup");
//! let output = failure.output();
//! assert_eq!(output.status_code, 404);
//! assert_eq!(output.payload["error"], "Not Found");
//! assert_eq!(output.headers.get("x-reason"), Some(&"lookup".to_string()));
//! ```

use crate::status::{HttpStatus, reason_phrase};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Boxed error accepted by [`Failure::wrap`].
pub type BoxError = Box<dyn StdError + Send + Sync>;

const MASKED_MESSAGE: &str = "An internal server error occurred";

/// An HTTP-level error outcome.
#[derive(Debug, Clone)]
pub struct Failure {
    status: u16,
    message: String,
    headers: HashMap<String, String>,
    data: Option<Value>,
    source: Option<Arc<dyn StdError + Send + Sync>>,
}

/// What a failure renders to on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureOutput {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub payload: Value,
}

impl Failure {
    /// Create a failure with an explicit status code.
    ///
    /// Codes below 400 do not describe a failure and are replaced with 500.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        let status = if status < 400 {
            routeweave_log::debug!("status {} is not an error status, using 500", status);
            HttpStatus::InternalServerError.code()
        } else {
            status
        };

        Self {
            status,
            message: message.into(),
            headers: HashMap::new(),
            data: None,
            source: None,
        }
    }

    /// Turn an arbitrary error into a failure with the given status.
    ///
    /// Wrapping something that already is a `Failure` returns it untouched.
    pub fn wrap(error: impl Into<BoxError>, status: u16) -> Self {
        let error = error.into();
        match error.downcast::<Failure>() {
            Ok(failure) => *failure,
            Err(error) => {
                let mut failure = Failure::new(status, error.to_string());
                failure.source = Some(Arc::from(error));
                failure
            }
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(HttpStatus::BadRequest.code(), message)
    }

    /// 401 with a `WWW-Authenticate` challenge for `scheme`.
    pub fn unauthorized(message: impl Into<String>, scheme: &str) -> Self {
        let message = message.into();
        let challenge = if message.is_empty() {
            scheme.to_string()
        } else {
            format!("{} error=\"{}\"", scheme, message.replace('"', "\\\""))
        };
        Self::new(HttpStatus::Unauthorized.code(), message)
            .with_header("WWW-Authenticate", challenge)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(HttpStatus::Forbidden.code(), message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(HttpStatus::NotFound.code(), message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(HttpStatus::Conflict.code(), message)
    }

    /// 429, optionally telling the client when to retry.
    pub fn too_many_requests(message: impl Into<String>, retry_after_secs: Option<u64>) -> Self {
        let failure = Self::new(HttpStatus::TooManyRequests.code(), message);
        match retry_after_secs {
            Some(secs) => failure.with_header("Retry-After", secs.to_string()),
            None => failure,
        }
    }

    /// 500. The message is kept for logs but never sent to the client.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(HttpStatus::InternalServerError.code(), message)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attach data for server-side consumers. Not part of the payload.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn is_server(&self) -> bool {
        self.status >= 500
    }

    /// Render status, headers and payload.
    pub fn output(&self) -> FailureOutput {
        let error = reason_phrase(self.status);
        let message = if self.is_server() {
            MASKED_MESSAGE
        } else if self.message.is_empty() {
            error
        } else {
            self.message.as_str()
        };

        FailureOutput {
            status_code: self.status,
            headers: self.headers.clone(),
            payload: json!({
                "statusCode": self.status,
                "error": error,
                "message": message,
            }),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.status, reason_phrase(self.status), self.message)
    }
}

impl StdError for Failure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn StdError + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let output = Failure::bad_request("\"name\" is required").output();
        assert_eq!(output.status_code, 400);
        assert_eq!(
            output.payload,
            json!({"statusCode": 400, "error": "Bad Request", "message": "\"name\" is required"})
        );
        assert!(output.headers.is_empty());
    }

    #[test]
    fn test_wrap_foreign_error() {
        let io = std::io::Error::other("disk on fire");
        let failure = Failure::wrap(io, 400);
        assert_eq!(failure.status(), 400);
        assert_eq!(failure.message(), "disk on fire");
        assert!(failure.source().is_some());
    }

    #[test]
    fn test_wrap_keeps_existing_failure() {
        let failure = Failure::wrap(Failure::conflict("taken"), 400);
        assert_eq!(failure.status(), 409);
        assert_eq!(failure.message(), "taken");
    }

    #[test]
    fn test_server_errors_are_masked() {
        let output = Failure::internal("db password is hunter2").output();
        assert_eq!(output.status_code, 500);
        assert_eq!(output.payload["message"], MASKED_MESSAGE);
    }

    #[test]
    fn test_non_error_status_becomes_500() {
        assert_eq!(Failure::new(200, "fine").status(), 500);
    }

    #[test]
    fn test_empty_message_uses_reason() {
        let output = Failure::not_found("").output();
        assert_eq!(output.payload["message"], "Not Found");
    }

    #[test]
    fn test_unauthorized_challenge() {
        let failure = Failure::unauthorized("expired", "Bearer");
        assert_eq!(
            failure.headers().get("WWW-Authenticate"),
            Some(&"Bearer error=\"expired\"".to_string())
        );
    }

    #[test]
    fn test_retry_after() {
        let failure = Failure::too_many_requests("slow down", Some(30));
        assert_eq!(failure.headers().get("Retry-After"), Some(&"30".to_string()));
        assert!(Failure::too_many_requests("slow down", None).headers().is_empty());
    }

    #[test]
    fn test_data_is_not_in_payload() {
        let failure = Failure::bad_request("nope").with_data(json!({"field": "age"}));
        assert_eq!(failure.data(), Some(&json!({"field": "age"})));
        assert!(failure.output().payload.get("field").is_none());
    }
}
