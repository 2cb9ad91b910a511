// Registrar options

use crate::{ConfigError, FailureOptions};
use routeweave_validation::{Presence, ValidationOptions};
use serde::Deserialize;
use serde_json::Value;
use std::env;

const ENV_ABORT_EARLY: &str = "ROUTEWEAVE_VALIDATION_ABORT_EARLY";
const ENV_ALLOW_UNKNOWN: &str = "ROUTEWEAVE_VALIDATION_ALLOW_UNKNOWN";
const ENV_CONVERT: &str = "ROUTEWEAVE_VALIDATION_CONVERT";
const ENV_PRESENCE: &str = "ROUTEWEAVE_VALIDATION_PRESENCE";

/// Options fixed when a [`RouteRegistrar`](crate::RouteRegistrar) is built
/// and shared, read-only, by every chain it compiles.
///
/// Deserializable from a config file with a `[validation]` table; the payload
/// transform can only be set in code.
///
/// ```toml
/// [validation]
/// abort_early = false
/// allow_unknown = true
/// presence = "required"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistrarOptions {
    #[serde(skip)]
    pub failure: FailureOptions,
    pub validation: ValidationOptions,
}

impl RegistrarOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validation(mut self, validation: ValidationOptions) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_failure(mut self, failure: FailureOptions) -> Self {
        self.failure = failure;
        self
    }

    /// Rewrite every failure payload before it is sent.
    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.failure = self.failure.with_transform(transform);
        self
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read validation options from `ROUTEWEAVE_VALIDATION_*` variables.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load a `.env` file (the nearest one when `path` is `None`), then read
    /// the environment like [`from_env`](Self::from_env).
    pub fn from_dotenv(path: Option<&str>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => dotenvy::from_path(path).map(|_| ())?,
            None => dotenvy::dotenv().map(|_| ())?,
        }
        Self::from_env()
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut validation = ValidationOptions::default();

        if let Some(value) = lookup(ENV_ABORT_EARLY) {
            validation.abort_early = parse_bool(ENV_ABORT_EARLY, &value)?;
        }
        if let Some(value) = lookup(ENV_ALLOW_UNKNOWN) {
            validation.allow_unknown = parse_bool(ENV_ALLOW_UNKNOWN, &value)?;
        }
        if let Some(value) = lookup(ENV_CONVERT) {
            validation.convert = parse_bool(ENV_CONVERT, &value)?;
        }
        if let Some(value) = lookup(ENV_PRESENCE) {
            validation.presence =
                Presence::from_name(value.trim()).ok_or_else(|| invalid(ENV_PRESENCE, &value))?;
        }

        Ok(Self {
            failure: FailureOptions::default(),
            validation,
        })
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(name, value)),
    }
}

fn invalid(name: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    }
}
