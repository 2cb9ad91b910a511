// Stages and compiled chains

use crate::{Error, HttpResponse, RequestContext};
use async_trait::async_trait;
use routeweave_log::trace;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by chain continuations.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Continuation handed to a stage: runs the rest of the chain.
pub type Next = Box<dyn FnOnce(RequestContext) -> BoxFuture<Result<HttpResponse, Error>> + Send>;

/// One unit of request processing.
///
/// A stage either calls `next` to continue, produces the response itself, or
/// returns an error.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, ctx: RequestContext, next: Next) -> Result<HttpResponse, Error>;

    /// Name used in logs and chain descriptions.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Shared, type-erased stage.
pub type Stage = Arc<dyn Middleware>;

/// Stage backed by a closure that receives the continuation.
pub struct MiddlewareFn<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F, Fut> Middleware for MiddlewareFn<F>
where
    F: Fn(RequestContext, Next) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    async fn handle(&self, ctx: RequestContext, next: Next) -> Result<HttpResponse, Error> {
        (self.f)(ctx, next).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Terminal stage backed by a closure. It never continues the chain.
pub struct HandlerFn<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F, Fut> Middleware for HandlerFn<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    async fn handle(&self, ctx: RequestContext, _next: Next) -> Result<HttpResponse, Error> {
        (self.f)(ctx).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Wrap a `(ctx, next)` closure as a stage.
pub fn middleware_fn<F, Fut>(f: F) -> Stage
where
    F: Fn(RequestContext, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    named_middleware_fn("middleware_fn", f)
}

pub fn named_middleware_fn<F, Fut>(name: impl Into<String>, f: F) -> Stage
where
    F: Fn(RequestContext, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    Arc::new(MiddlewareFn {
        name: name.into(),
        f,
    })
}

/// Wrap a `ctx -> response` closure as a terminal stage.
pub fn handler_fn<F, Fut>(f: F) -> Stage
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    named_handler_fn("handler_fn", f)
}

pub fn named_handler_fn<F, Fut>(name: impl Into<String>, f: F) -> Stage
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    Arc::new(HandlerFn {
        name: name.into(),
        f,
    })
}

/// Immutable, ordered sequence of stages registered for one route.
#[derive(Clone)]
pub struct Chain {
    stages: Arc<[Stage]>,
}

impl Chain {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self {
            stages: stages.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Stage names in execution order.
    pub fn names(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.name().to_string()).collect()
    }

    /// Run the chain from its first stage.
    pub async fn run(&self, ctx: RequestContext) -> Result<HttpResponse, Error> {
        trace!(
            "running chain of {} stages for {} {}",
            self.stages.len(),
            ctx.request.method,
            ctx.request.path
        );
        self.execute_from(0, ctx).await
    }

    fn execute_from(&self, index: usize, ctx: RequestContext) -> BoxFuture<Result<HttpResponse, Error>> {
        let Some(stage) = self.stages.get(index).cloned() else {
            // Every stage continued, including the last one.
            let target = format!("{} {}", ctx.request.method, ctx.request.path);
            return Box::pin(async move { Err(Error::RouteNotFound(target)) });
        };

        let chain = self.clone();
        trace!("entering stage {} ({})", index, stage.name());
        Box::pin(async move {
            stage
                .handle(ctx, Box::new(move |ctx| chain.execute_from(index + 1, ctx)))
                .await
        })
    }
}

impl FromIterator<Stage> for Chain {
    fn from_iter<I: IntoIterator<Item = Stage>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
