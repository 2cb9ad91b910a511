// Mock stages for chain tests

use async_trait::async_trait;
use routeweave_core::{Error, HttpResponse, Middleware, Next, RequestContext, Stage};
use std::sync::{Arc, Mutex};

/// A stage that records each request it sees.
///
/// A handler mock answers with its configured response; a passthrough mock
/// continues the chain. Clones share the call log, so keep a clone around
/// after handing the stage to a chain.
#[derive(Clone)]
pub struct MockStage {
    name: String,
    calls: Arc<Mutex<Vec<String>>>,
    response: Option<HttpResponse>,
}

impl MockStage {
    /// Terminal mock answering `200` with its name as the body.
    pub fn handler(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            response: Some(HttpResponse::ok().with_body(name.to_string())),
        }
    }

    /// Mock that continues the chain.
    pub fn passthrough(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            response: None,
        }
    }

    /// Answer with `response` instead of the default.
    pub fn with_response(mut self, response: HttpResponse) -> Self {
        self.response = Some(response);
        self
    }

    pub fn stage(&self) -> Stage {
        Arc::new(self.clone())
    }

    /// Number of requests seen
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn was_called(&self) -> bool {
        self.call_count() > 0
    }

    /// `METHOD path` of every request seen, in order
    pub fn get_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl Middleware for MockStage {
    async fn handle(&self, ctx: RequestContext, next: Next) -> Result<HttpResponse, Error> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}", ctx.request.method, ctx.request.path));

        match &self.response {
            Some(response) => Ok(response.clone()),
            None => next(ctx).await,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
