//! Schema validation for routeweave
//!
//! Validates JSON values (request facets, in practice) against declarative
//! schemas. Schemas are built in code, from literals or from descriptions
//! loaded out of route files.
//!
//! ```
//! use routeweave_validation::{Schema, ValidationOptions};
//! use serde_json::json;
//!
//! let query = Schema::object()
//!     .key("page", Schema::number().integer().min(1.0))
//!     .key("sort", Schema::valid(["asc", "desc"]));
//!
//! // Query values arrive as strings and are converted by default.
//! let options = ValidationOptions::default();
//! assert!(query.validate(Some(&json!({"page": "2", "sort": "asc"})), &options).is_ok());
//! assert!(query.validate(Some(&json!({"page": "0"})), &options).is_err());
//! ```

mod describe;
mod errors;
mod options;
mod schema;

pub use describe::SCHEMA_KEY;
pub use errors::*;
pub use options::*;
pub use schema::Schema;
