//! The router facade: registration, dispatch, request handling and URLs.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error, info, warn};

use crate::config::RouterConfig;
use crate::http::{HttpRequest, HttpResponse, Method, StatusCode};
use crate::routing::arguments::{ArgumentResolver, Arguments};
use crate::routing::container::{resolve_middleware_alias, Container};
use crate::routing::context::RequestContext;
use crate::routing::dispatcher::{Dispatcher, MatchResult};
use crate::routing::error::{CompilationError, Error, UrlGenerationError};
use crate::routing::handler::{Handler, Strategy};
use crate::routing::middleware::{Endpoint, Middleware, MiddlewareChain, MiddlewareRef, SendQueue};
use crate::routing::params::Params;
use crate::routing::pattern::PatternCompiler;
use crate::routing::route::{CurrentRoute, GroupId, MiddlewareHolder, RouteDefinition, RouteId};
use crate::routing::table::{GroupBuilder, RouteBuilder, RouteTable};
use crate::routing::url::{UrlArgs, UrlGenerator, UrlOptions};
use crate::routing::xhr::XhrMiddleware;

/// Registers routes, matches requests against them and builds URLs.
///
/// Routes are compiled on the first dispatch (or an explicit [`compile`]),
/// after which the compiled structure is read-only. Registering another
/// route drops it, so the next dispatch compiles again.
///
/// [`compile`]: Router::compile
pub struct Router {
    config: RouterConfig,
    compiler: PatternCompiler,
    table: RouteTable,
    dispatcher: Option<Dispatcher>,
    middleware: Vec<MiddlewareRef>,
    container: Option<Arc<dyn Container>>,
    context: RequestContext,
    current: Option<CurrentRoute>,
    send_queue: Option<SendQueue>,
    fallback: Option<Handler>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

impl Router {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            compiler: config.pattern_compiler(),
            table: RouteTable::new(&config.normalized_base_prefix()),
            context: config.default_context.clone(),
            config,
            dispatcher: None,
            middleware: Vec::new(),
            container: None,
            current: None,
            send_queue: None,
            fallback: None,
        }
    }

    /// Use `container` for handler injection and middleware aliases.
    pub fn with_container(mut self, container: Arc<dyn Container>) -> Self {
        self.container = Some(container);
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn compiler(&self) -> &PatternCompiler {
        &self.compiler
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn set_context(&mut self, context: RequestContext) {
        self.context = context;
    }

    /// Register a route.
    pub fn map(&mut self, method: Method, path: &str, handler: Handler) -> RouteBuilder<'_> {
        self.registering();
        let (id, route) = self.table.insert_route(method, path, handler, None);
        RouteBuilder::new(route, id, self.container.as_deref())
    }

    pub fn get(&mut self, path: &str, handler: Handler) -> RouteBuilder<'_> {
        self.map(Method::GET, path, handler)
    }

    pub fn post(&mut self, path: &str, handler: Handler) -> RouteBuilder<'_> {
        self.map(Method::POST, path, handler)
    }

    pub fn put(&mut self, path: &str, handler: Handler) -> RouteBuilder<'_> {
        self.map(Method::PUT, path, handler)
    }

    pub fn patch(&mut self, path: &str, handler: Handler) -> RouteBuilder<'_> {
        self.map(Method::PATCH, path, handler)
    }

    pub fn delete(&mut self, path: &str, handler: Handler) -> RouteBuilder<'_> {
        self.map(Method::DELETE, path, handler)
    }

    pub fn head(&mut self, path: &str, handler: Handler) -> RouteBuilder<'_> {
        self.map(Method::HEAD, path, handler)
    }

    pub fn options(&mut self, path: &str, handler: Handler) -> RouteBuilder<'_> {
        self.map(Method::OPTIONS, path, handler)
    }

    /// Register a route only reachable by XMLHttpRequest callers.
    ///
    /// The guard is the container's `xhr` middleware when it has one, and a
    /// plain [`XhrMiddleware`] otherwise.
    pub fn xhr(&mut self, path: &str, handler: Handler, method: Method) -> RouteBuilder<'_> {
        let aliased = resolve_middleware_alias(self.container.as_deref(), "xhr").is_ok();
        self.registering();
        let (id, route) = self.table.insert_route(method, path, handler, None);
        if aliased {
            route.add_lazy_middleware("xhr");
        } else {
            route.add_middleware(Arc::new(XhrMiddleware));
        }
        RouteBuilder::new(route, id, self.container.as_deref())
    }

    /// Register a group of routes sharing `prefix` and the defaults set on it.
    pub fn group<F>(&mut self, prefix: &str, build: F) -> GroupId
    where
        F: FnOnce(&mut GroupBuilder<'_>),
    {
        self.registering();
        let id = self.table.add_group(prefix, None);
        build(&mut GroupBuilder::new(&mut self.table, id, self.container.as_deref()));
        id
    }

    /// Add global middleware, run for every request.
    pub fn middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.middleware.push(MiddlewareRef::Instance(Arc::new(middleware)));
        self
    }

    /// Add global middleware by container alias.
    pub fn middle(&mut self, alias: &str) -> Result<&mut Self, Error> {
        resolve_middleware_alias(self.container.as_deref(), alias)?;
        self.middleware.push(MiddlewareRef::Alias(alias.to_string()));
        Ok(self)
    }

    /// Produce the response for unmatched requests and HTTP errors.
    ///
    /// The handler can declare `status` and `message` parameters.
    pub fn set_fallback(&mut self, handler: Handler) {
        self.fallback = Some(handler);
    }

    /// Compile the registered routes.
    ///
    /// Compiling twice without [`invalidate`](Router::invalidate) in between is an error.
    pub fn compile(&mut self) -> Result<(), Error> {
        if self.dispatcher.is_some() {
            return Err(CompilationError::AlreadyCompiled.into());
        }
        self.dispatcher = Some(self.build_dispatcher()?);
        Ok(())
    }

    pub fn is_compiled(&self) -> bool {
        self.dispatcher.is_some()
    }

    /// Drop the compiled structure; the next dispatch compiles again.
    pub fn invalidate(&mut self) {
        self.dispatcher = None;
    }

    fn registering(&mut self) {
        if self.dispatcher.take().is_some() {
            warn!("Route registered after compilation, compiled routes invalidated");
        }
    }

    fn build_dispatcher(&self) -> Result<Dispatcher, Error> {
        let dispatcher = Dispatcher::compile(&self.table, &self.compiler, self.config.head_fallback_to_get)?;
        self.log_routes();
        Ok(dispatcher)
    }

    fn compiled(&mut self) -> Result<&Dispatcher, Error> {
        let dispatcher = match self.dispatcher.take() {
            Some(dispatcher) => dispatcher,
            None => self.build_dispatcher()?,
        };
        Ok(self.dispatcher.insert(dispatcher))
    }

    fn log_routes(&self) {
        info!("Registered endpoints:");
        for (_, route) in self.table.routes() {
            match route.name() {
                Some(name) => info!("  {} {} ({name})", route.method(), route.path()),
                None => info!("  {} {}", route.method(), route.path()),
            }
        }
    }

    /// Match `method` and `path` against the routes, using the current
    /// request context for constraints, and track the matched route.
    pub fn dispatch(&mut self, method: Method, path: &str) -> Result<MatchResult, Error> {
        let path = path.split_once('?').map_or(path, |(path, _)| path);
        let context = self.context.clone();
        let result = self.compiled()?.dispatch(method, path, &context);

        self.send_queue = None;
        self.current = match &result {
            MatchResult::Found(found) => self.table.route(found.route).map(|route| CurrentRoute {
                id: found.route,
                method: route.method(),
                name: route.name().map(str::to_string),
                path: route.path().to_string(),
                vars: found.vars.clone(),
            }),
            _ => None,
        };

        Ok(result)
    }

    /// Dispatch `request`, taking the context from its headers, and attach
    /// the matched route to it.
    pub fn match_request(&mut self, request: &mut HttpRequest) -> Result<MatchResult, Error> {
        self.context = RequestContext::from_request(request, &self.config.default_context);
        let result = self.dispatch(request.method, request.path_without_query())?;
        request.current_route = self.current.clone();
        Ok(result)
    }

    /// The route matched by the last dispatch.
    pub fn current(&self) -> Option<&CurrentRoute> {
        self.current.as_ref()
    }

    pub fn current_route_name(&self) -> Option<&str> {
        self.current.as_ref().and_then(|current| current.name.as_deref())
    }

    pub fn route(&self, id: RouteId) -> Option<&RouteDefinition> {
        self.table.route(id)
    }

    pub fn named_route(&self, name: &str) -> Option<&RouteDefinition> {
        self.table.find_by_name(name).and_then(|id| self.table.route(id))
    }

    /// Relative URL of a named route.
    pub fn url_for(&self, name: &str, args: &UrlArgs) -> Result<String, Error> {
        self.url_for_with(name, args, &UrlOptions::default())
    }

    pub fn url_for_with(&self, name: &str, args: &UrlArgs, options: &UrlOptions) -> Result<String, Error> {
        let id = self
            .table
            .find_by_name(name)
            .ok_or_else(|| UrlGenerationError::UnknownRoute(name.to_string()))?;
        self.url_for_route(id, args, options)
    }

    pub fn url_for_route(&self, id: RouteId, args: &UrlArgs, options: &UrlOptions) -> Result<String, Error> {
        let route = self
            .table
            .route(id)
            .ok_or_else(|| UrlGenerationError::UnknownRoute(format!("{id:?}")))?;
        let url = UrlGenerator::new(&self.compiler, &self.context)
            .with_constraints(self.table.effective_constraints(id))
            .generate(route.path(), args, options)?;
        Ok(url)
    }

    /// A redirect response to a named route.
    pub fn redirect(&self, name: &str, args: &UrlArgs, absolute: bool, status: StatusCode) -> Result<HttpResponse, Error> {
        let options = UrlOptions {
            absolute,
            ..UrlOptions::default()
        };
        let location = self.url_for_with(name, args, &options)?;
        Ok(HttpResponse::redirect(location, status))
    }

    /// Route `request` through the middleware chain to its handler.
    ///
    /// Unmatched requests only pass through the global middleware. HTTP
    /// errors become responses; any other error is returned.
    pub async fn handle(&mut self, mut request: HttpRequest) -> Result<HttpResponse, Error> {
        let result = self.match_request(&mut request)?;
        let chain = self.current_chain()?;
        let fallback_request = self.fallback.is_some().then(|| request.clone());

        let matched = match &result {
            MatchResult::Found(found) => self.table.route(found.route).map(|route| (found, route)),
            _ => None,
        };

        let response = match matched {
            Some((found, route)) => {
                let endpoint = RouteEndpoint {
                    handler: route.handler().clone(),
                    vars: found.vars.clone(),
                    strategy: self.table.effective_strategy(found.route).unwrap_or(self.config.strategy),
                    container: self.container.clone(),
                };
                chain.run(request, &endpoint).await
            }
            None => {
                let endpoint = StatusEndpoint {
                    status: match &result {
                        MatchResult::MethodNotAllowed(_) => StatusCode::MethodNotAllowed,
                        _ => StatusCode::NotFound,
                    },
                    allow: result.allow_header(),
                    fallback: self.fallback.clone(),
                    strategy: self.config.strategy,
                };
                chain.run(request, &endpoint).await
            }
        };

        self.send_queue = Some(chain.send_queue());

        match response {
            Ok(response) => Ok(response),
            Err(Error::Http { status, message }) => {
                debug!("Handler raised HTTP error {}: {message}", status.as_u16());
                match (&self.fallback, fallback_request) {
                    (Some(fallback), Some(request)) => {
                        call_fallback(fallback, self.config.strategy, status, message, request).await
                    }
                    _ => Ok(HttpResponse::new(status)
                        .with_content_type("text/plain")
                        .with_body_string(message)),
                }
            }
            Err(e) => {
                error!("Error handling request: {e}");
                Err(e)
            }
        }
    }

    /// Give the next middleware of the current cycle its before-send turn.
    ///
    /// Exactly one hook runs per call; middleware without a hook are skipped.
    pub fn send(&mut self, response: HttpResponse) -> Result<HttpResponse, Error> {
        Ok(self.send_queue()?.send(response))
    }

    /// Run every remaining before-send hook of the current cycle.
    pub fn drain_send(&mut self, response: HttpResponse) -> Result<HttpResponse, Error> {
        Ok(self.send_queue()?.drain(response))
    }

    fn send_queue(&mut self) -> Result<&mut SendQueue, Error> {
        let queue = match self.send_queue.take() {
            Some(queue) => queue,
            None => self.current_chain()?.send_queue(),
        };
        Ok(self.send_queue.insert(queue))
    }

    /// Global middleware, then the current route's groups, then the route.
    fn current_chain(&self) -> Result<MiddlewareChain, Error> {
        let container = self.container.as_deref();
        let mut chain = MiddlewareChain::new();
        chain.extend_scope(&self.middleware, container)?;

        if let Some(current) = &self.current {
            for group in self.table.group_chain(current.id) {
                chain.extend_scope(group.middleware_stack(), container)?;
            }
            if let Some(route) = self.table.route(current.id) {
                chain.extend_scope(route.middleware_stack(), container)?;
            }
        }

        Ok(chain)
    }
}

/// Binds arguments, calls the handler and applies the strategy.
struct RouteEndpoint {
    handler: Handler,
    vars: Params,
    strategy: Strategy,
    container: Option<Arc<dyn Container>>,
}

#[async_trait]
impl Endpoint for RouteEndpoint {
    async fn call(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        let params = self.handler.params();
        let bindings = ArgumentResolver::new(&self.vars, self.container.as_deref()).resolve(params);
        let args = Arguments::bind(bindings, params)?;
        let reply = self.handler.call(args, request).await?;
        self.strategy.respond(reply)
    }
}

/// Answers unmatched requests.
struct StatusEndpoint {
    status: StatusCode,
    allow: Option<String>,
    fallback: Option<Handler>,
    strategy: Strategy,
}

#[async_trait]
impl Endpoint for StatusEndpoint {
    async fn call(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        if let Some(fallback) = &self.fallback {
            let message = self.status.reason_phrase().to_string();
            return call_fallback(fallback, self.strategy, self.status, message, request).await;
        }

        let path = request.path_without_query();
        let response = match &self.allow {
            Some(allowed) => HttpResponse::new(StatusCode::MethodNotAllowed)
                .with_header("Allow", allowed.as_str())
                .with_content_type("text/plain")
                .with_body_string(format!(
                    "Method {method} not allowed for path: {path}. Allowed methods: {allowed}",
                    method = request.method,
                )),
            None => HttpResponse::new(self.status)
                .with_content_type("text/plain")
                .with_body_string(format!("Not found: {path}")),
        };
        Ok(response)
    }
}

async fn call_fallback(
    fallback: &Handler,
    strategy: Strategy,
    status: StatusCode,
    message: String,
    request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let vars: Params = [("status", status.as_u16().to_string()), ("message", message)]
        .into_iter()
        .collect();
    let bindings = ArgumentResolver::new(&vars, None).resolve(fallback.params());
    let args = Arguments::bind(bindings, fallback.params())?;
    let reply = fallback.call(args, request).await?;
    strategy.respond(reply)
}
