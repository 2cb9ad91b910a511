//! Chain compilation and dispatch.
//!
//! A [`RouteRegistrar`] owns a [`RouteTable`] and turns route descriptors into
//! registrations on it. Each descriptor is checked with
//! [`validate_descriptor`], compiled into a [`Chain`] of
//!
//! 1. the failure capability,
//! 2. the validation stage, when `config.validate` is given,
//! 3. `config.middleware`, in the order given,
//! 4. `config.handler`,
//!
//! and handed to the table entry point named by its method.

use crate::capability::{FailureCapability, FailureOptions};
use crate::descriptor::{RouteDescriptor, RouteValue, validate_descriptor};
use crate::validate::ValidationStage;
use crate::{RegistrarOptions, RegistrationError};
use routeweave_core::{Chain, RouteMethod, RouteTable, Stage};
use routeweave_log::{debug, info};
use routeweave_validation::ValidationOptions;
use std::sync::Arc;

/// A descriptor compiled into its chain, ready for dispatch.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    /// Method as given in the descriptor.
    pub method: String,
    pub path: String,
    pub chain: Chain,
    descriptor: String,
}

impl CompiledRoute {
    /// Serialized descriptor this route was compiled from.
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }
}

/// Registers declarative routes on a route table.
///
/// Registration is synchronous and happens before serving; the registrar is
/// usually dropped (or turned back into its table with
/// [`into_table`](Self::into_table)) once the routes are in.
///
/// ```
/// use routeweave::{Route, RouteRegistrar, Router, handler_fn, HttpResponse};
///
/// let mut registrar = RouteRegistrar::new(Router::new());
/// registrar
///     .add_route(Route::get("/health").handler(handler_fn(|_ctx| async {
///         Ok(HttpResponse::ok().with_body("ok"))
///     })))
///     .unwrap();
///
/// let router = registrar.into_table();
/// assert_eq!(router.len(), 1);
/// ```
pub struct RouteRegistrar<R: RouteTable> {
    table: R,
    failure: Arc<FailureOptions>,
    validation: Arc<ValidationOptions>,
    registered: usize,
}

impl<R: RouteTable> RouteRegistrar<R> {
    pub fn new(table: R) -> Self {
        Self::with_options(table, RegistrarOptions::default())
    }

    pub fn with_options(table: R, options: RegistrarOptions) -> Self {
        Self {
            table,
            failure: Arc::new(options.failure),
            validation: Arc::new(options.validation),
            registered: 0,
        }
    }

    pub fn table(&self) -> &R {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut R {
        &mut self.table
    }

    pub fn into_table(self) -> R {
        self.table
    }

    /// Number of routes registered through this registrar.
    pub fn registered(&self) -> usize {
        self.registered
    }

    pub fn validation_options(&self) -> &ValidationOptions {
        &self.validation
    }

    /// Validate, compile and register one route.
    ///
    /// `route` must be an object; see [`validate_descriptor`] for the shape.
    pub fn add_route(&mut self, route: impl Into<RouteValue>) -> Result<(), RegistrationError> {
        let route = route.into();
        if !route.is_object() {
            return Err(type_mismatch("route", "an object", &route));
        }

        let compiled = self.compile(&validate_descriptor(&route)?)?;
        self.dispatch(compiled)
    }

    /// Register every route of an array, in order.
    ///
    /// Routes are validated, compiled and registered one at a time. The first
    /// failure ends the call and routes before it stay registered; use
    /// [`add_routes_atomic`](Self::add_routes_atomic) to check everything
    /// first.
    pub fn add_routes(&mut self, routes: impl Into<RouteValue>) -> Result<(), RegistrationError> {
        let routes = routes.into();
        let Some(items) = routes.as_array() else {
            return Err(type_mismatch("routes", "an array", &routes));
        };

        for route in items {
            let compiled = self.compile(&validate_descriptor(route)?)?;
            self.dispatch(compiled)?;
        }
        Ok(())
    }

    /// Register every route of an array, or none of them when one is
    /// malformed or names an unsupported method.
    ///
    /// The table itself can still refuse a route part way through (a
    /// conflicting path, say); routes registered before that stay.
    pub fn add_routes_atomic(
        &mut self,
        routes: impl Into<RouteValue>,
    ) -> Result<(), RegistrationError> {
        let routes = routes.into();
        let Some(items) = routes.as_array() else {
            return Err(type_mismatch("routes", "an array", &routes));
        };

        let compiled = items
            .iter()
            .map(|route| {
                let compiled = self.compile(&validate_descriptor(route)?)?;
                resolve_method(&compiled)?;
                Ok(compiled)
            })
            .collect::<Result<Vec<_>, RegistrationError>>()?;

        for route in compiled {
            self.dispatch(route)?;
        }
        Ok(())
    }

    /// Build the chain for a validated descriptor. Nothing is registered.
    pub fn compile(&self, descriptor: &RouteDescriptor) -> Result<CompiledRoute, RegistrationError> {
        let config = &descriptor.config;
        let mut stages: Vec<Stage> = Vec::with_capacity(config.middleware.len() + 3);

        stages.push(Arc::new(FailureCapability::new(self.failure.clone())));

        if let Some(schemas) = &config.validate {
            let stage = ValidationStage::build(schemas, self.validation.clone())
                .map_err(|e| e.with_descriptor(descriptor.serialized()))?;
            stages.push(Arc::new(stage));
        }

        stages.extend(config.middleware.iter().cloned());
        stages.push(config.handler.clone());

        let chain = Chain::new(stages);
        debug!(
            "compiled {} {} into {:?}",
            descriptor.method, descriptor.path, chain
        );

        Ok(CompiledRoute {
            method: descriptor.method.clone(),
            path: descriptor.path.clone(),
            chain,
            descriptor: descriptor.serialized().to_string(),
        })
    }

    /// Hand a compiled route to the table entry point for its method.
    pub fn dispatch(&mut self, route: CompiledRoute) -> Result<(), RegistrationError> {
        let method = resolve_method(&route)?;
        let CompiledRoute {
            path,
            chain,
            descriptor,
            ..
        } = route;
        let stages = chain.len();

        let result = match method {
            RouteMethod::Get => self.table.get(&path, chain),
            RouteMethod::Post => self.table.post(&path, chain),
            RouteMethod::Put => self.table.put(&path, chain),
            RouteMethod::Delete => self.table.delete(&path, chain),
            RouteMethod::Options => self.table.options(&path, chain),
            RouteMethod::Trace => self.table.trace(&path, chain),
            RouteMethod::All => self.table.all(&path, chain),
        };
        result.map_err(|source| RegistrationError::Router { source, descriptor })?;

        self.registered += 1;
        info!("registered {} {} ({} stages)", method, path, stages);
        Ok(())
    }
}

fn resolve_method(route: &CompiledRoute) -> Result<RouteMethod, RegistrationError> {
    RouteMethod::parse(&route.method).ok_or_else(|| RegistrationError::UnsupportedMethod {
        method: route.method.clone(),
        descriptor: route.descriptor.clone(),
    })
}

fn type_mismatch(subject: &'static str, expected: &'static str, value: &RouteValue) -> RegistrationError {
    RegistrationError::TypeMismatch {
        subject,
        expected,
        found: value.kind(),
        descriptor: value.serialize(),
    }
}
