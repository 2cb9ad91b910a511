//! Per-request failure responses.
//!
//! Every compiled chain starts with a [`FailureCapability`]. It installs a
//! fresh [`FailureResponder`] into the request's extensions, so later stages
//! can end the request with a structured failure:
//!
//! ```ignore
//! use routeweave::{Failure, RespondWithFailure};
//!
//! async fn show(ctx: RequestContext) -> Result<HttpResponse, Error> {
//!     match lookup(&ctx) {
//!         Some(user) => HttpResponse::json(&user),
//!         None => ctx.respond_with_failure(Failure::not_found("no such user")),
//!     }
//! }
//! ```
//!
//! Stages may also just return `Err(Failure)`; the capability renders those
//! the same way once the rest of the chain has unwound.

use async_trait::async_trait;
use routeweave_core::{
    BoxError, Error, Failure, HttpResponse, Middleware, Next, RequestContext,
};
use routeweave_log::{debug, error};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Rewrites a failure payload before it is sent.
pub type PayloadTransform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// How failures are rendered.
#[derive(Clone, Default)]
pub struct FailureOptions {
    transform: Option<PayloadTransform>,
}

impl FailureOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite every failure payload with `transform`.
    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn has_transform(&self) -> bool {
        self.transform.is_some()
    }

    fn render(&self, payload: Value) -> Value {
        match &self.transform {
            Some(transform) => transform(payload),
            None => payload,
        }
    }
}

impl fmt::Debug for FailureOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureOptions")
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// Turns failures into responses for one request.
#[derive(Debug, Clone)]
pub struct FailureResponder {
    id: Uuid,
    options: Arc<FailureOptions>,
}

impl FailureResponder {
    pub fn new(options: Arc<FailureOptions>) -> Self {
        Self {
            id: Uuid::new_v4(),
            options,
        }
    }

    /// Identifies the request this responder was installed for.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Render `failure`: its status, its headers and its payload as JSON,
    /// passed through the configured transform.
    pub fn respond(&self, failure: &Failure) -> Result<HttpResponse, Error> {
        let output = failure.output();
        let mut response = HttpResponse::new(output.status_code);
        if !output.headers.is_empty() {
            response.headers.extend(output.headers);
        }

        let payload = self.options.render(output.payload);
        debug!(
            "request {} answered with failure {} ({})",
            self.id,
            output.status_code,
            failure.message()
        );
        response.with_json(&payload)
    }
}

/// Capability stage placed at the head of every compiled chain.
pub struct FailureCapability {
    options: Arc<FailureOptions>,
}

impl FailureCapability {
    pub fn new(options: Arc<FailureOptions>) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Middleware for FailureCapability {
    async fn handle(&self, mut ctx: RequestContext, next: Next) -> Result<HttpResponse, Error> {
        let responder = FailureResponder::new(self.options.clone());
        ctx.extensions.insert(responder.clone());

        match next(ctx).await {
            Err(Error::Failure(failure)) => responder.respond(&failure),
            other => other,
        }
    }

    fn name(&self) -> &str {
        "failure_capability"
    }
}

/// Access to the request's [`FailureResponder`].
pub trait RespondWithFailure {
    fn failure_responder(&self) -> Result<&FailureResponder, Error>;

    /// Finish the request with `failure`.
    ///
    /// Accepts a [`Failure`], or an [`Error::Failure`]. Anything else is a
    /// caller bug and yields [`Error::InvalidFailureObject`].
    fn respond_with_failure<E>(&self, failure: E) -> Result<HttpResponse, Error>
    where
        E: Into<BoxError>;
}

impl RespondWithFailure for RequestContext {
    fn failure_responder(&self) -> Result<&FailureResponder, Error> {
        self.extensions
            .get::<FailureResponder>()
            .ok_or(Error::CapabilityMissing("failure responder"))
    }

    fn respond_with_failure<E>(&self, failure: E) -> Result<HttpResponse, Error>
    where
        E: Into<BoxError>,
    {
        let responder = self.failure_responder()?;
        let failure = as_failure(failure.into()).map_err(|other| {
            error!(
                "respond_with_failure called with a non-failure on {} {}: {}",
                self.request.method, self.request.path, other
            );
            Error::InvalidFailureObject(other.to_string())
        })?;
        responder.respond(&failure)
    }
}

fn as_failure(error: BoxError) -> Result<Failure, BoxError> {
    let error = match error.downcast::<Failure>() {
        Ok(failure) => return Ok(*failure),
        Err(error) => error,
    };
    match error.downcast::<Error>() {
        Ok(boxed) => match *boxed {
            Error::Failure(failure) => Ok(*failure),
            other => Err(Box::new(other)),
        },
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routeweave_core::{Chain, HttpRequest, handler_fn, named_handler_fn};
    use serde_json::json;

    fn run(chain: &Chain) -> impl std::future::Future<Output = Result<HttpResponse, Error>> + '_ {
        chain.run(RequestContext::new(HttpRequest::new("GET", "/things")))
    }

    fn chain(options: FailureOptions, handler: routeweave_core::Stage) -> Chain {
        Chain::new(vec![
            Arc::new(FailureCapability::new(Arc::new(options))),
            handler,
        ])
    }

    #[tokio::test]
    async fn test_respond_with_failure() {
        let chain = chain(
            FailureOptions::new(),
            handler_fn(|ctx: RequestContext| async move {
                ctx.respond_with_failure(Failure::conflict("already exists"))
            }),
        );

        let response = run(&chain).await.unwrap();
        assert_eq!(response.status, 409);
        assert_eq!(
            response.body_json().unwrap(),
            json!({"statusCode": 409, "error": "Conflict", "message": "already exists"})
        );
        assert_eq!(
            response.headers.get("Content-Type"),
            Some(&"application/json".to_string())
        );
    }

    #[tokio::test]
    async fn test_headers_are_applied() {
        let chain = chain(
            FailureOptions::new(),
            handler_fn(|ctx: RequestContext| async move {
                ctx.respond_with_failure(Failure::unauthorized("expired", "Bearer"))
            }),
        );

        let response = run(&chain).await.unwrap();
        assert_eq!(response.status, 401);
        assert_eq!(
            response.headers.get("WWW-Authenticate"),
            Some(&"Bearer error=\"expired\"".to_string())
        );
    }

    #[tokio::test]
    async fn test_transform_rewrites_payload() {
        let options = FailureOptions::new().with_transform(|payload| {
            json!({"ok": false, "code": payload["statusCode"], "reason": payload["message"]})
        });
        let chain = chain(
            options,
            handler_fn(|ctx: RequestContext| async move {
                ctx.respond_with_failure(Failure::bad_request("nope"))
            }),
        );

        let response = run(&chain).await.unwrap();
        assert_eq!(response.status, 400);
        assert_eq!(
            response.body_json().unwrap(),
            json!({"ok": false, "code": 400, "reason": "nope"})
        );
    }

    #[tokio::test]
    async fn test_returned_failures_are_rendered() {
        let chain = chain(
            FailureOptions::new(),
            handler_fn(|_ctx| async { Err(Failure::forbidden("not yours").into()) }),
        );
        let response = run(&chain).await.unwrap();
        assert_eq!(response.status, 403);
        assert_eq!(response.body_json().unwrap()["message"], "not yours");
    }

    #[tokio::test]
    async fn test_other_errors_pass_through() {
        let chain = chain(
            FailureOptions::new(),
            handler_fn(|_ctx| async { Err(Error::Internal("db down".into())) }),
        );
        assert!(matches!(run(&chain).await, Err(Error::Internal(_))));
    }

    #[tokio::test]
    async fn test_non_failure_is_rejected() {
        let chain = chain(
            FailureOptions::new(),
            handler_fn(|ctx: RequestContext| async move {
                ctx.respond_with_failure("plain message")
            }),
        );
        let err = run(&chain).await.unwrap_err();
        assert!(matches!(err, Error::InvalidFailureObject(ref msg) if msg == "plain message"));

        let chain = self::chain(
            FailureOptions::new(),
            handler_fn(|ctx: RequestContext| async move {
                ctx.respond_with_failure(Error::RouteNotFound("x".into()))
            }),
        );
        assert!(matches!(run(&chain).await, Err(Error::InvalidFailureObject(_))));
    }

    #[tokio::test]
    async fn test_error_wrapped_failure_is_accepted() {
        let chain = chain(
            FailureOptions::new(),
            handler_fn(|ctx: RequestContext| async move {
                ctx.respond_with_failure(Error::from(Failure::not_found("gone")))
            }),
        );
        assert_eq!(run(&chain).await.unwrap().status, 404);
    }

    #[tokio::test]
    async fn test_missing_capability() {
        let bare = Chain::new(vec![named_handler_fn("bare", |ctx: RequestContext| async move {
            ctx.respond_with_failure(Failure::bad_request("x"))
        })]);
        assert!(matches!(
            run(&bare).await,
            Err(Error::CapabilityMissing("failure responder"))
        ));
    }

    #[tokio::test]
    async fn test_server_failures_are_masked() {
        let chain = chain(
            FailureOptions::new(),
            handler_fn(|ctx: RequestContext| async move {
                ctx.respond_with_failure(Failure::internal("stack trace here"))
            }),
        );
        let body = run(&chain).await.unwrap().body_json().unwrap();
        assert_eq!(body["message"], "An internal server error occurred");
    }
}
