// Route tables loaded from JSON or TOML files

use crate::{LoadError, RouteValue};
use routeweave_core::{Facet, Stage};
use routeweave_log::{debug, warn};
use routeweave_validation::Schema;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// Stages that route files may refer to by name.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    stages: HashMap<String, Stage>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `stage` under `name`, returning the stage it replaces.
    pub fn register(&mut self, name: impl Into<String>, stage: Stage) -> Option<Stage> {
        self.stages.insert(name.into(), stage)
    }

    pub fn with(mut self, name: impl Into<String>, stage: Stage) -> Self {
        self.register(name, stage);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Stage> {
        self.stages.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.stages.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.stages.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Supported route file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            _ => None,
        }
    }
}

/// Turns route files into descriptors ready for
/// [`RouteRegistrar::add_routes`](crate::RouteRegistrar::add_routes).
///
/// A file holds an array of routes, either at the top level (JSON only) or
/// under a `routes` key:
///
/// ```toml
/// [[routes]]
/// method = "get"
/// path = "/users/{id}"
/// config.handler = "users.show"
/// config.middleware = ["auth"]
/// config.validate.params = { id = { "$schema" = { type = "number", integer = true } } }
/// ```
///
/// `handler` and `middleware` names are looked up in the
/// [`HandlerRegistry`]. Names that are not registered stay strings, so
/// registration rejects the route as usual. `validate` entries are read with
/// [`Schema::from_literal`]; keys naming no request facet are left as they are
/// for registration to ignore.
pub struct RouteLoader {
    registry: HandlerRegistry,
}

impl RouteLoader {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Load a route file, picking the format from its extension.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<RouteValue, LoadError> {
        let path = path.as_ref();
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or_default();
        let format = FileFormat::from_extension(ext)
            .ok_or_else(|| LoadError::UnsupportedFormat(path.display().to_string()))?;

        let content = fs::read_to_string(path)?;
        debug!("loading routes from {}", path.display());
        self.parse(&content, format)
    }

    pub fn parse(&self, content: &str, format: FileFormat) -> Result<RouteValue, LoadError> {
        match format {
            FileFormat::Json => self.read_json(content),
            FileFormat::Toml => self.read_toml(content),
        }
    }

    pub fn read_json(&self, content: &str) -> Result<RouteValue, LoadError> {
        self.read_value(serde_json::from_str(content)?)
    }

    pub fn read_toml(&self, content: &str) -> Result<RouteValue, LoadError> {
        self.read_value(toml::from_str::<Value>(content)?)
    }

    /// Resolve an already parsed route table.
    pub fn read_value(&self, value: Value) -> Result<RouteValue, LoadError> {
        let routes = match value {
            Value::Array(routes) => routes,
            Value::Object(mut fields) => match fields.remove("routes") {
                Some(Value::Array(routes)) => routes,
                _ => {
                    return Err(LoadError::Shape(
                        "expected a `routes` array".to_string(),
                    ));
                }
            },
            other => {
                return Err(LoadError::Shape(format!(
                    "expected an array of routes, got {}",
                    other
                )));
            }
        };

        let routes = routes
            .into_iter()
            .enumerate()
            .map(|(index, route)| self.route(index, route))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RouteValue::Array(routes))
    }

    fn route(&self, index: usize, route: Value) -> Result<RouteValue, LoadError> {
        // Anything that is not an object is left for registration to reject.
        let Value::Object(mut fields) = route else {
            return Ok(route.into());
        };
        let config = fields.remove("config");

        let mut value = RouteValue::from(Value::Object(fields));
        if let Some(config) = config {
            value.insert("config", self.config(index, config)?);
        }
        Ok(value)
    }

    fn config(&self, index: usize, config: Value) -> Result<RouteValue, LoadError> {
        let Value::Object(mut fields) = config else {
            return Ok(config.into());
        };
        let handler = fields.remove("handler");
        let middleware = fields.remove("middleware");
        let validate = fields.remove("validate");

        let mut value = RouteValue::from(Value::Object(fields));
        if let Some(handler) = handler {
            value.insert("handler", self.resolve(handler));
        }
        if let Some(middleware) = middleware {
            let middleware = match middleware {
                Value::Array(names) => {
                    RouteValue::Array(names.into_iter().map(|name| self.resolve(name)).collect())
                }
                name => self.resolve(name),
            };
            value.insert("middleware", middleware);
        }
        if let Some(validate) = validate {
            let validate = match validate {
                Value::Object(facets) => {
                    let mut schemas = BTreeMap::new();
                    for (facet, literal) in facets {
                        if Facet::from_name(&facet).is_none() {
                            schemas.insert(facet, literal.into());
                            continue;
                        }
                        let schema = Schema::from_literal(&literal).map_err(|source| {
                            LoadError::Schema {
                                index,
                                facet: facet.clone(),
                                source,
                            }
                        })?;
                        schemas.insert(facet, RouteValue::Schema(schema));
                    }
                    RouteValue::Object(schemas)
                }
                other => other.into(),
            };
            value.insert("validate", validate);
        }
        Ok(value)
    }

    fn resolve(&self, name: Value) -> RouteValue {
        if let Value::String(key) = &name {
            match self.registry.get(key) {
                Some(stage) => return RouteValue::Stage(stage.clone()),
                None => warn!("no stage registered as '{}'", key),
            }
        }
        name.into()
    }
}
