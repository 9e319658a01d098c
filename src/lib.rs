//! A small HTTP routing library.
//!
//! This library maps requests to handlers with a focus on predictable
//! matching and URLs that always round-trip back to the route they came from.
//!
//! # Features
//!
//! - Path templates with placeholders, shortcuts (`number`, `word`,
//!   `alphanum_dash`, `slug`, `uuid`), custom regexes and optional trailing parts
//! - Three-way dispatch: found, not found, or method not allowed with the
//!   allowed methods
//! - Route groups with shared prefixes, host/scheme/port constraints,
//!   middleware and response strategies
//! - Async middleware chains with a one-shot before-send hook
//! - Typed handler arguments bound from path variables or an injection container
//! - Reverse URL generation, relative or absolute
//!
//! # Examples
//!
//! ## Dispatching and URL generation
//!
//! ```
//! use microroute_rs::{Handler, MatchResult, Method, ParamType, Router, UrlArgs};
//!
//! # fn main() -> Result<(), microroute_rs::RoutingError> {
//! let mut router = Router::default();
//!
//! router
//!     .get(
//!         "/posts/{id:number}",
//!         Handler::new(|args, _request| async move {
//!             Ok::<_, microroute_rs::RoutingError>(format!("post {}", args.int("id").unwrap_or_default()))
//!         })
//!         .param("id", ParamType::Int),
//!     )
//!     .name("post.show");
//!
//! let url = router.url_for("post.show", &UrlArgs::new().with("id", 42))?;
//! assert_eq!(url, "/posts/42");
//!
//! match router.dispatch(Method::GET, &url)? {
//!     MatchResult::Found(found) => assert_eq!(found.vars.get("id"), Some("42")),
//!     other => panic!("unexpected outcome: {other:?}"),
//! }
//!
//! assert!(matches!(
//!     router.dispatch(Method::POST, &url)?,
//!     MatchResult::MethodNotAllowed(allowed) if allowed == vec![Method::GET]
//! ));
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! ```
//! use microroute_rs::{Router, RouterConfig};
//!
//! let config = RouterConfig::from_json(r#"{ "base_prefix": "app", "strategy": "json" }"#).unwrap();
//! let router = Router::new(config);
//!
//! assert_eq!(router.table().base_prefix(), "/app");
//! ```

// Export the http module
pub mod http;

// Export the routing module
pub mod routing;

// Export the config module
pub mod config;

// Re-export commonly used items for convenience
pub use config::RouterConfig;
pub use http::{Error as HttpError, HttpRequest, HttpResponse, Method, StatusCode};
pub use routing::{
    Arguments, CompilationError, Container, Error as RoutingError, Handler, MatchResult, Middleware, Next,
    ParamType, PatternCompiler, Reply, RequestContext, Router, ServiceContainer, Strategy, UrlArgs,
    UrlGenerationError, UrlOptions,
};
