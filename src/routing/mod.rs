//! Request routing.
//!
//! This module compiles path templates, matches requests against the
//! registered routes, runs the middleware chain around the matched handler,
//! binds handler arguments and generates URLs back from routes.

mod arguments;
mod container;
mod context;
mod dispatcher;
mod error;
mod handler;
mod middleware;
mod params;
mod pattern;
mod route;
mod router;
mod table;
mod url;
mod xhr;

// Re-export public items
pub use arguments::{
    coerce, is_numeric, ArgumentBinding, ArgumentResolver, Arguments, BindingSource, ContainerResolver, ParamSpec,
    ParamType, Resolver, RouteVarResolver,
};
pub use container::{resolve_middleware_alias, Container, ServiceContainer, MIDDLEWARE_ALIAS_PREFIX};
pub use context::RequestContext;
pub use dispatcher::{Dispatcher, MatchResult, RouteMatch};
pub use error::{CompilationError, Error, UrlGenerationError};
pub use handler::{Handler, HandlerFn, HandlerFuture, Reply, Strategy};
pub use middleware::{Endpoint, Middleware, MiddlewareChain, MiddlewareRef, Next, SendHook, SendQueue};
pub use params::{Param, Params};
pub use pattern::{CompiledPattern, PatternCompiler, Segment, Variant, DEFAULT_PLACEHOLDER_REGEX, DEFAULT_SHORTCUTS};
pub use route::{
    ConstraintHolder, Constraints, CurrentRoute, GroupId, MiddlewareHolder, RouteDefinition, RouteGroup, RouteId,
};
pub use router::Router;
pub use table::{GroupBuilder, RouteBuilder, RouteTable};
pub use self::url::{UrlArgs, UrlGenerator, UrlOptions};
pub use xhr::{XhrMiddleware, XHR_HEADER};

pub(crate) use table::normalize_prefix;
