// Request-time error types

use crate::{Failure, HttpStatus};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A stage gave up with a structured failure; the failure capability
    /// renders it.
    #[error("{0}")]
    Failure(Box<Failure>),

    /// `respond_with_failure` was handed something that is not a failure.
    #[error("respond_with_failure expects a failure object, got: {0}")]
    InvalidFailureObject(String),

    /// A stage needed a per-request capability that was never installed.
    #[error("Request capability not installed: {0}")]
    CapabilityMissing(&'static str),

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    /// The route table refused a path pattern.
    #[error("Invalid route '{path}': {reason}")]
    InvalidRoute { path: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl Error {
    /// Status code used when this error reaches the transport unhandled.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Failure(failure) => failure.status(),
            Error::RouteNotFound(_) => HttpStatus::NotFound.code(),
            Error::MethodNotAllowed(_) => HttpStatus::MethodNotAllowed.code(),
            Error::Deserialization(_) => HttpStatus::BadRequest.code(),
            _ => HttpStatus::InternalServerError.code(),
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// Convert into a [`Failure`], keeping an existing one untouched.
    pub fn into_failure(self) -> Failure {
        match self {
            Error::Failure(failure) => *failure,
            other => {
                let status = other.status_code();
                Failure::new(status, other.to_string())
            }
        }
    }
}

impl From<Failure> for Error {
    fn from(failure: Failure) -> Self {
        Error::Failure(Box::new(failure))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
