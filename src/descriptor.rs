// Route descriptors: the loose input tree and its validated form

use crate::RegistrationError;
use routeweave_core::Stage;
use routeweave_validation::Schema;
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A loosely typed route description.
///
/// This is JSON extended with two leaf kinds that data cannot express: stages
/// (handlers and middleware) and schemas. Callers assemble descriptors from
/// literals, with the [`Route`](crate::Route) builder or with the
/// [`RouteLoader`](crate::RouteLoader), and the registrar checks their shape
/// with [`validate_descriptor`].
#[derive(Clone)]
pub enum RouteValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<RouteValue>),
    Object(BTreeMap<String, RouteValue>),
    Stage(Stage),
    Schema(Schema),
}

impl RouteValue {
    /// An empty object.
    pub fn object() -> Self {
        RouteValue::Object(BTreeMap::new())
    }

    /// Set `key` on an object and return it. Other values are returned as is.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<RouteValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set `key` on an object, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RouteValue>) -> Option<RouteValue> {
        match self {
            RouteValue::Object(map) => map.insert(key.into(), value.into()),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&RouteValue> {
        self.as_object().and_then(|map| map.get(key))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RouteValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, RouteValue>> {
        match self {
            RouteValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[RouteValue]> {
        match self {
            RouteValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_stage(&self) -> Option<&Stage> {
        match self {
            RouteValue::Stage(stage) => Some(stage),
            _ => None,
        }
    }

    pub fn as_schema(&self) -> Option<&Schema> {
        match self {
            RouteValue::Schema(schema) => Some(schema),
            _ => None,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, RouteValue::Object(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, RouteValue::Array(_))
    }

    /// Kind name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RouteValue::Null => "null",
            RouteValue::Bool(_) => "boolean",
            RouteValue::Number(_) => "number",
            RouteValue::String(_) => "string",
            RouteValue::Array(_) => "array",
            RouteValue::Object(_) => "object",
            RouteValue::Stage(_) => "stage",
            RouteValue::Schema(_) => "schema",
        }
    }

    /// JSON form used in diagnostics.
    ///
    /// Stages have no data form: they are left out of objects and become
    /// `null` inside arrays. Schemas render as `{"$schema": description}`.
    pub fn to_json(&self) -> Value {
        self.json_form().unwrap_or(Value::Null)
    }

    fn json_form(&self) -> Option<Value> {
        let value = match self {
            RouteValue::Null => Value::Null,
            RouteValue::Bool(b) => Value::Bool(*b),
            RouteValue::Number(n) => Value::Number(n.clone()),
            RouteValue::String(s) => Value::String(s.clone()),
            RouteValue::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| item.json_form().unwrap_or(Value::Null))
                    .collect(),
            ),
            RouteValue::Object(map) => Value::Object(
                map.iter()
                    .filter_map(|(key, value)| Some((key.clone(), value.json_form()?)))
                    .collect(),
            ),
            RouteValue::Stage(_) => return None,
            RouteValue::Schema(schema) => schema.to_literal(),
        };
        Some(value)
    }

    /// Compact JSON text of [`to_json`](Self::to_json).
    pub fn serialize(&self) -> String {
        self.to_json().to_string()
    }
}

impl fmt::Debug for RouteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteValue::Null => f.write_str("Null"),
            RouteValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            RouteValue::Number(n) => f.debug_tuple("Number").field(n).finish(),
            RouteValue::String(s) => f.debug_tuple("String").field(s).finish(),
            RouteValue::Array(items) => f.debug_list().entries(items).finish(),
            RouteValue::Object(map) => f.debug_map().entries(map).finish(),
            RouteValue::Stage(stage) => f.debug_tuple("Stage").field(&stage.name()).finish(),
            RouteValue::Schema(schema) => f.debug_tuple("Schema").field(schema).finish(),
        }
    }
}

impl fmt::Display for RouteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl From<&str> for RouteValue {
    fn from(s: &str) -> Self {
        RouteValue::String(s.to_string())
    }
}

impl From<String> for RouteValue {
    fn from(s: String) -> Self {
        RouteValue::String(s)
    }
}

impl From<bool> for RouteValue {
    fn from(b: bool) -> Self {
        RouteValue::Bool(b)
    }
}

impl From<i64> for RouteValue {
    fn from(n: i64) -> Self {
        RouteValue::Number(n.into())
    }
}

impl From<u64> for RouteValue {
    fn from(n: u64) -> Self {
        RouteValue::Number(n.into())
    }
}

impl From<f64> for RouteValue {
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(RouteValue::Null, RouteValue::Number)
    }
}

impl From<Stage> for RouteValue {
    fn from(stage: Stage) -> Self {
        RouteValue::Stage(stage)
    }
}

impl From<Schema> for RouteValue {
    fn from(schema: Schema) -> Self {
        RouteValue::Schema(schema)
    }
}

impl From<Vec<RouteValue>> for RouteValue {
    fn from(items: Vec<RouteValue>) -> Self {
        RouteValue::Array(items)
    }
}

impl From<BTreeMap<String, RouteValue>> for RouteValue {
    fn from(map: BTreeMap<String, RouteValue>) -> Self {
        RouteValue::Object(map)
    }
}

impl From<Value> for RouteValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RouteValue::Null,
            Value::Bool(b) => RouteValue::Bool(b),
            Value::Number(n) => RouteValue::Number(n),
            Value::String(s) => RouteValue::String(s),
            Value::Array(items) => RouteValue::Array(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => RouteValue::Object(
                map.into_iter().map(|(key, value)| (key, value.into())).collect(),
            ),
        }
    }
}

/// `config` part of a validated descriptor.
#[derive(Clone)]
pub struct RouteConfig {
    pub handler: Stage,
    /// Facet name to schema, exactly as given.
    pub validate: Option<BTreeMap<String, RouteValue>>,
    /// Extra stages run between validation and the handler.
    pub middleware: Vec<Stage>,
}

impl fmt::Debug for RouteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteConfig")
            .field("handler", &self.handler.name())
            .field("validate", &self.validate)
            .field(
                "middleware",
                &self.middleware.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// A descriptor that passed [`validate_descriptor`].
#[derive(Clone, Debug)]
pub struct RouteDescriptor {
    /// Method as given. Non-string methods are kept in serialized form and
    /// rejected when the route is dispatched.
    pub method: String,
    pub path: String,
    pub config: RouteConfig,
    serialized: String,
}

impl RouteDescriptor {
    /// Serialized form of the descriptor this was validated from.
    pub fn serialized(&self) -> &str {
        &self.serialized
    }
}

/// Check the shape of a route descriptor.
///
/// Only structure is checked: `method`, `path` and `config` must be present,
/// `config.handler` must be a stage, `config.validate` an object and
/// `config.middleware` a stage or an array of stages. The method value, the
/// path syntax and schema contents are left to later steps; unknown fields are
/// ignored.
pub fn validate_descriptor(route: &RouteValue) -> Result<RouteDescriptor, RegistrationError> {
    let text = route.serialize();
    let malformed = |reason: &str| RegistrationError::malformed(reason, &text);

    let Some(fields) = route.as_object() else {
        return Err(malformed("route must be an object"));
    };

    let method = fields
        .get("method")
        .ok_or_else(|| malformed("'method' missing from route"))?;
    let path = fields
        .get("path")
        .ok_or_else(|| malformed("'path' missing from route"))?;
    let config = fields
        .get("config")
        .ok_or_else(|| malformed("'config' missing from route"))?;
    let config = config
        .as_object()
        .ok_or_else(|| malformed("'config' must be an object for route"))?;

    let handler = config
        .get("handler")
        .ok_or_else(|| malformed("'handler' missing from route.config"))?
        .as_stage()
        .cloned()
        .ok_or_else(|| malformed("'handler' must be a stage for route.config.handler"))?;

    let validate = match config.get("validate") {
        None => None,
        Some(RouteValue::Object(map)) => Some(map.clone()),
        Some(_) => {
            return Err(malformed(
                "'validate' must be an object for route.config.validate",
            ));
        }
    };

    let middleware = match config.get("middleware") {
        None => Vec::new(),
        Some(RouteValue::Stage(stage)) => vec![stage.clone()],
        Some(RouteValue::Array(items)) => items
            .iter()
            .map(|item| item.as_stage().cloned())
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                malformed("'middleware' must be a stage or array of stages for route.config.middleware")
            })?,
        Some(_) => {
            return Err(malformed(
                "'middleware' must be a stage or array of stages for route.config.middleware",
            ));
        }
    };

    let path = path
        .as_str()
        .ok_or_else(|| malformed("'path' must be a string for route"))?
        .to_string();

    let method = match method {
        RouteValue::String(method) => method.clone(),
        other => other.serialize(),
    };

    Ok(RouteDescriptor {
        method,
        path,
        config: RouteConfig {
            handler,
            validate,
            middleware,
        },
        serialized: text,
    })
}
