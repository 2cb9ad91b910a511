// Registration-time errors

use thiserror::Error;

/// Why a route could not be registered.
///
/// Every variant carries the offending descriptor in serialized form.
/// Registration errors are programmer errors: nothing was retried and, except
/// for earlier elements of a best-effort batch, nothing was registered.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// The descriptor does not have the required shape.
    #[error("{reason} : {descriptor}")]
    MalformedDescriptor { reason: String, descriptor: String },

    /// `add_route` got something other than an object, or `add_routes`
    /// something other than an array.
    #[error("{subject} must be {expected}, got {found} : {descriptor}")]
    TypeMismatch {
        subject: &'static str,
        expected: &'static str,
        found: &'static str,
        descriptor: String,
    },

    /// The method is not one of GET, POST, PUT, DELETE, OPTIONS, TRACE, ALL.
    #[error("{method} not supported : {descriptor}")]
    UnsupportedMethod { method: String, descriptor: String },

    /// `config.validate` names no request facet.
    #[error("Please provide a validation schema : {descriptor}")]
    MissingSchema { descriptor: String },

    /// A facet schema could not be built.
    #[error("invalid schema for '{facet}': {reason} : {descriptor}")]
    InvalidSchema {
        facet: String,
        reason: String,
        descriptor: String,
    },

    /// The route table refused the compiled route.
    #[error("route table rejected route: {source} : {descriptor}")]
    Router {
        #[source]
        source: routeweave_core::Error,
        descriptor: String,
    },
}

impl RegistrationError {
    pub(crate) fn malformed(reason: impl Into<String>, descriptor: &str) -> Self {
        RegistrationError::MalformedDescriptor {
            reason: reason.into(),
            descriptor: descriptor.to_string(),
        }
    }

    /// Serialized descriptor the error refers to.
    pub fn descriptor(&self) -> &str {
        match self {
            RegistrationError::MalformedDescriptor { descriptor, .. }
            | RegistrationError::TypeMismatch { descriptor, .. }
            | RegistrationError::UnsupportedMethod { descriptor, .. }
            | RegistrationError::MissingSchema { descriptor }
            | RegistrationError::InvalidSchema { descriptor, .. }
            | RegistrationError::Router { descriptor, .. } => descriptor,
        }
    }

    /// Replace the serialized descriptor, used when an error raised for part
    /// of a route is reported against the whole route.
    pub(crate) fn with_descriptor(mut self, text: &str) -> Self {
        match &mut self {
            RegistrationError::MalformedDescriptor { descriptor, .. }
            | RegistrationError::TypeMismatch { descriptor, .. }
            | RegistrationError::UnsupportedMethod { descriptor, .. }
            | RegistrationError::MissingSchema { descriptor }
            | RegistrationError::InvalidSchema { descriptor, .. }
            | RegistrationError::Router { descriptor, .. } => *descriptor = text.to_string(),
        }
        self
    }
}

/// Failure loading [`RegistrarOptions`](crate::RegistrarOptions).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for {name}")]
    InvalidValue { name: String, value: String },

    #[error("Failed to load .env file: {0}")]
    DotenvError(#[from] dotenvy::Error),
}

/// Failure turning a route file into descriptors.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read route file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported route file format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to parse JSON routes: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML routes: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid route file: {0}")]
    Shape(String),

    #[error("route {index}: invalid schema for '{facet}': {source}")]
    Schema {
        index: usize,
        facet: String,
        #[source]
        source: routeweave_validation::SchemaError,
    },
}
