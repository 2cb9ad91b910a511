//! Testing utilities for routeweave.
//!
//! - **TestClient** - drives a [`Router`](routeweave_core::Router) in process
//! - **TestRequestBuilder** - headers, query, cookies and JSON bodies
//! - **RecordingRouteTable** - a [`RouteTable`](routeweave_core::RouteTable)
//!   spy that records every registration call
//! - **MockStage** - a stage that counts its invocations
//! - **Assertions** - status, header and body checks
//!
//! ```
//! use routeweave_core::{Chain, HttpResponse, RouteTable, Router, handler_fn};
//! use routeweave_testing::*;
//!
//! # tokio_test::block_on(async {
//! let mut router = Router::new();
//! router
//!     .get("/hello", Chain::new(vec![handler_fn(|_ctx| async {
//!         Ok(HttpResponse::ok().with_body("Hello!"))
//!     })]))
//!     .unwrap();
//!
//! let client = TestClient::from_router(router);
//! let response = client.get("/hello").await;
//! assert_status(&response, 200);
//! assert_eq!(response.body_string(), Some("Hello!".to_string()));
//! # });
//! ```

mod assertions;
mod mock;
mod recording;
mod test_client;

pub use assertions::*;
pub use mock::*;
pub use recording::*;
pub use test_client::*;
