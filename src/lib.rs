// Routeweave - declarative route registration
//
// Routes are described as data (method, path, handler, middleware and
// per-facet validation schemas), checked, compiled into middleware chains
// and registered on a route table.

//! Declarative route registration.
//!
//! ```
//! use routeweave::{Facet, HttpResponse, Route, RouteRegistrar, Router, Schema, handler_fn};
//!
//! let mut registrar = RouteRegistrar::new(Router::new());
//! registrar
//!     .add_route(
//!         Route::post("/users")
//!             .validate(Facet::Body, Schema::object().key("name", Schema::string().required()))
//!             .handler(handler_fn(|_ctx| async { Ok(HttpResponse::created()) })),
//!     )
//!     .unwrap();
//! assert_eq!(registrar.table().len(), 1);
//! ```

pub mod builder;
pub mod capability;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod loader;
pub mod registrar;
pub mod validate;

pub use builder::*;
pub use capability::*;
pub use config::*;
pub use descriptor::*;
pub use error::*;
pub use loader::*;
pub use registrar::*;
pub use validate::*;

// Re-export core functionality
pub use routeweave_core::*;

pub use routeweave_validation::{
    Presence, Schema, SchemaError, ValidationError, ValidationErrors, ValidationOptions,
};

#[cfg(feature = "testing")]
pub use routeweave_testing;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Error,
        Facet,
        Failure,
        HandlerRegistry,
        HttpRequest,
        HttpResponse,
        Middleware,
        Next,
        RegistrarOptions,
        RegistrationError,
        RequestContext,
        RespondWithFailure,
        Route,
        RouteLoader,
        RouteMethod,
        RouteRegistrar,
        RouteTable,
        RouteValue,
        Router,
        Schema,
        Stage,
        ValidationOptions,
        handler_fn,
        middleware_fn,
        named_handler_fn,
        named_middleware_fn,
    };
}
