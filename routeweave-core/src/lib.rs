// Core library for routeweave
// Request/response types, structured failures, stages and the route table

pub mod context;
pub mod error;
pub mod extensions;
pub mod facet;
pub mod failure;
pub mod http;
pub mod method;
pub mod middleware;
pub mod routing;
pub mod status;

pub use context::*;
pub use error::*;
pub use extensions::*;
pub use facet::*;
pub use failure::*;
pub use http::{HttpRequest, HttpResponse};
pub use method::*;
pub use middleware::*;
pub use routing::*;
pub use status::*;
