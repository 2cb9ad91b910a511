// Per-request context passed down a chain

use crate::{Extensions, Facet, HttpRequest};
use serde_json::Value;

/// Everything a stage gets to see about the request in flight.
///
/// A context is created fresh for every request and moved from stage to
/// stage, so values stored in its extensions are never shared between
/// requests.
#[derive(Debug, Default)]
pub struct RequestContext {
    pub request: HttpRequest,
    pub extensions: Extensions,
}

impl RequestContext {
    pub fn new(request: HttpRequest) -> Self {
        Self {
            request,
            extensions: Extensions::new(),
        }
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut HttpRequest {
        &mut self.request
    }

    pub fn facet(&self, facet: Facet) -> Value {
        self.request.facet(facet)
    }

    pub fn into_request(self) -> HttpRequest {
        self.request
    }
}
