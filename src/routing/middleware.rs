//! Middleware composition.
//!
//! For a matched route the chain is `global + parent groups + route`, with the
//! handler invocation as the innermost unit. Each middleware receives the
//! request and a [`Next`] continuation; not calling it short-circuits the rest
//! of the chain.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use log::trace;

use crate::http::{HttpRequest, HttpResponse};
use crate::routing::container::{resolve_middleware_alias, Container};
use crate::routing::error::Error;

/// Request/response processing wrapped around a handler.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Process a request, usually by delegating to `next` and decorating the result.
    async fn process(&self, request: HttpRequest, next: Next<'_>) -> Result<HttpResponse, Error>;

    /// The post-response hook of this middleware, if it has one.
    fn send_hook(&self) -> Option<&dyn SendHook> {
        None
    }

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Transforms an outgoing response right before it is handed to the transport.
pub trait SendHook: Send + Sync {
    /// Return the response to send; declining means returning it unchanged.
    fn before_send(&self, response: HttpResponse) -> HttpResponse;
}

/// The innermost unit of a chain.
#[async_trait]
pub trait Endpoint: Send + Sync {
    async fn call(&self, request: HttpRequest) -> Result<HttpResponse, Error>;
}

/// The remainder of a middleware chain.
///
/// `run` consumes the continuation, so a middleware can call it at most once.
pub struct Next<'a> {
    middleware: &'a [Arc<dyn Middleware>],
    endpoint: &'a dyn Endpoint,
}

impl<'a> Next<'a> {
    pub fn new(middleware: &'a [Arc<dyn Middleware>], endpoint: &'a dyn Endpoint) -> Self {
        Self { middleware, endpoint }
    }

    pub async fn run(self, request: HttpRequest) -> Result<HttpResponse, Error> {
        match self.middleware.split_first() {
            Some((current, rest)) => {
                trace!("Entering middleware {}", current.name());
                current.process(request, Next::new(rest, self.endpoint)).await
            }
            None => self.endpoint.call(request).await,
        }
    }
}

/// A middleware given directly, or an id to be looked up in the container
/// when the chain is built.
#[derive(Clone)]
pub enum MiddlewareRef {
    Instance(Arc<dyn Middleware>),
    Alias(String),
}

impl MiddlewareRef {
    pub fn resolve(&self, container: Option<&dyn Container>) -> Result<Arc<dyn Middleware>, Error> {
        match self {
            MiddlewareRef::Instance(middleware) => Ok(middleware.clone()),
            MiddlewareRef::Alias(id) => {
                let container = container.ok_or(Error::ContainerRequired)?;
                let id = resolve_middleware_alias(Some(container), id)?;
                container
                    .middleware(&id)
                    .ok_or(Error::UnknownMiddleware(id))
            }
        }
    }
}

impl fmt::Debug for MiddlewareRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MiddlewareRef::Instance(middleware) => f.debug_tuple("Instance").field(&middleware.name()).finish(),
            MiddlewareRef::Alias(id) => f.debug_tuple("Alias").field(id).finish(),
        }
    }
}

/// An ordered middleware stack for one request.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    stack: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve and append one scope of middleware (global, a group, or the route).
    pub fn extend_scope(&mut self, scope: &[MiddlewareRef], container: Option<&dyn Container>) -> Result<(), Error> {
        for middleware in scope {
            self.stack.push(middleware.resolve(container)?);
        }
        Ok(())
    }

    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.stack.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Drive the request through the whole chain, top-down, ending at `endpoint`.
    pub async fn run(&self, request: HttpRequest, endpoint: &dyn Endpoint) -> Result<HttpResponse, Error> {
        Next::new(&self.stack, endpoint).run(request).await
    }

    /// The queue consumed by the before-send step.
    pub fn send_queue(&self) -> SendQueue {
        SendQueue {
            queue: self.stack.iter().cloned().collect(),
        }
    }
}

/// Middleware waiting for their before-send hook, front first.
#[derive(Clone, Default)]
pub struct SendQueue {
    queue: VecDeque<Arc<dyn Middleware>>,
}

impl SendQueue {
    /// Pop middleware from the front until one with a send hook is found and
    /// run that single hook. Middleware without a hook are dropped on the way.
    pub fn send(&mut self, response: HttpResponse) -> HttpResponse {
        while let Some(middleware) = self.queue.pop_front() {
            match middleware.send_hook() {
                Some(hook) => {
                    trace!("Running before-send hook of {}", middleware.name());
                    return hook.before_send(response);
                }
                None => trace!("Skipping {} in before-send queue", middleware.name()),
            }
        }
        response
    }

    /// Run every remaining hook, front to back.
    pub fn drain(&mut self, mut response: HttpResponse) -> HttpResponse {
        while !self.queue.is_empty() {
            response = self.send(response);
        }
        response
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
