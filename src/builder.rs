// Typed builder producing route descriptors

use crate::RouteValue;
use routeweave_core::{Facet, RouteMethod, Stage};
use std::collections::BTreeMap;

/// Builds a route descriptor in code.
///
/// The result is an ordinary [`RouteValue`] and goes through the same checks
/// as hand-written descriptors; a route built without a handler is rejected
/// at registration.
///
/// ```
/// use routeweave::{Facet, Route, Schema, handler_fn, HttpResponse};
///
/// let route = Route::get("/users/{id}")
///     .validate(Facet::Params, Schema::object().key("id", Schema::number().integer()))
///     .handler(handler_fn(|_ctx| async { Ok(HttpResponse::ok()) }));
///
/// let value = route.into_value();
/// assert_eq!(value.get("method").and_then(|m| m.as_str()), Some("GET"));
/// ```
#[derive(Clone, Default)]
pub struct Route {
    method: String,
    path: String,
    handler: Option<Stage>,
    middleware: Vec<Stage>,
    validate: BTreeMap<String, RouteValue>,
    extra: BTreeMap<String, RouteValue>,
}

impl Route {
    /// A route for any method name; unsupported names fail at registration.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn method(method: RouteMethod, path: impl Into<String>) -> Self {
        Self::new(method.as_str(), path)
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::method(RouteMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::method(RouteMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::method(RouteMethod::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::method(RouteMethod::Delete, path)
    }

    pub fn options(path: impl Into<String>) -> Self {
        Self::method(RouteMethod::Options, path)
    }

    pub fn trace(path: impl Into<String>) -> Self {
        Self::method(RouteMethod::Trace, path)
    }

    pub fn all(path: impl Into<String>) -> Self {
        Self::method(RouteMethod::All, path)
    }

    pub fn handler(mut self, handler: Stage) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Append a stage to run before the handler.
    pub fn middleware(mut self, stage: Stage) -> Self {
        self.middleware.push(stage);
        self
    }

    /// Validate `facet` with `schema`, either a [`Schema`](crate::Schema)
    /// or a literal.
    pub fn validate(mut self, facet: Facet, schema: impl Into<RouteValue>) -> Self {
        self.validate.insert(facet.as_str().to_string(), schema.into());
        self
    }

    /// Attach a field the registrar ignores, such as a description.
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<RouteValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn into_value(self) -> RouteValue {
        let mut config = RouteValue::object();
        if let Some(handler) = self.handler {
            config.insert("handler", handler);
        }
        if !self.validate.is_empty() {
            config.insert("validate", RouteValue::Object(self.validate));
        }
        let mut middleware = self.middleware;
        match middleware.len() {
            0 => {}
            1 => {
                if let Some(stage) = middleware.pop() {
                    config.insert("middleware", stage);
                }
            }
            _ => {
                let stages = middleware.into_iter().map(RouteValue::Stage).collect::<Vec<_>>();
                config.insert("middleware", stages);
            }
        }

        let mut route = RouteValue::Object(self.extra);
        route.insert("method", self.method);
        route.insert("path", self.path);
        route.insert("config", config);
        route
    }
}

impl From<Route> for RouteValue {
    fn from(route: Route) -> Self {
        route.into_value()
    }
}
