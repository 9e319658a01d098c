//! Route and group definitions.

use std::sync::Arc;

use crate::http::Method;
use crate::routing::context::RequestContext;
use crate::routing::handler::{Handler, Strategy};
use crate::routing::middleware::{Middleware, MiddlewareRef};
use crate::routing::params::Params;

/// Handle to a route registered in a [`RouteTable`](crate::routing::RouteTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(pub(crate) usize);

/// Handle to a group registered in a [`RouteTable`](crate::routing::RouteTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub(crate) usize);

/// Host, scheme and port a request must have been addressed to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraints {
    pub host: Option<String>,
    pub scheme: Option<String>,
    pub port: Option<u16>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        self.host.is_none() && self.scheme.is_none() && self.port.is_none()
    }

    /// Fill the fields left unset here from `defaults`.
    pub fn or(&self, defaults: &Constraints) -> Constraints {
        Constraints {
            host: self.host.clone().or_else(|| defaults.host.clone()),
            scheme: self.scheme.clone().or_else(|| defaults.scheme.clone()),
            port: self.port.or(defaults.port),
        }
    }

    /// Evaluate the constraints against the context of the current request.
    pub fn matches(&self, context: &RequestContext) -> bool {
        self.host
            .as_deref()
            .map_or(true, |host| host.eq_ignore_ascii_case(&context.host))
            && self
                .scheme
                .as_deref()
                .map_or(true, |scheme| scheme.eq_ignore_ascii_case(&context.scheme))
            && self.port.map_or(true, |port| port == context.port)
    }
}

/// Something carrying host/scheme/port constraints.
pub trait ConstraintHolder {
    fn constraints(&self) -> &Constraints;
    fn constraints_mut(&mut self) -> &mut Constraints;

    fn set_host(&mut self, host: impl Into<String>) {
        self.constraints_mut().host = Some(host.into().to_ascii_lowercase());
    }

    fn set_scheme(&mut self, scheme: impl Into<String>) {
        self.constraints_mut().scheme = Some(scheme.into().to_ascii_lowercase());
    }

    fn set_port(&mut self, port: u16) {
        self.constraints_mut().port = Some(port);
    }
}

/// Something carrying an ordered middleware list.
pub trait MiddlewareHolder {
    fn middleware_stack(&self) -> &[MiddlewareRef];
    fn middleware_stack_mut(&mut self) -> &mut Vec<MiddlewareRef>;

    fn add_middleware(&mut self, middleware: Arc<dyn Middleware>) {
        self.middleware_stack_mut().push(MiddlewareRef::Instance(middleware));
    }

    fn add_lazy_middleware(&mut self, id: impl Into<String>) {
        self.middleware_stack_mut().push(MiddlewareRef::Alias(id.into()));
    }
}

/// A registered route: one method, one path template and its handler.
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) handler: Handler,
    pub(crate) name: Option<String>,
    pub(crate) constraints: Constraints,
    pub(crate) middleware: Vec<MiddlewareRef>,
    pub(crate) strategy: Option<Strategy>,
    pub(crate) group: Option<GroupId>,
}

impl RouteDefinition {
    pub fn new(method: Method, path: impl Into<String>, handler: Handler) -> Self {
        Self {
            method,
            path: path.into(),
            handler,
            name: None,
            constraints: Constraints::default(),
            middleware: Vec::new(),
            strategy: None,
            group: None,
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// The full path template, including group and base prefixes.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn strategy(&self) -> Option<Strategy> {
        self.strategy
    }

    pub fn parent_group(&self) -> Option<GroupId> {
        self.group
    }
}

impl ConstraintHolder for RouteDefinition {
    fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    fn constraints_mut(&mut self) -> &mut Constraints {
        &mut self.constraints
    }
}

impl MiddlewareHolder for RouteDefinition {
    fn middleware_stack(&self) -> &[MiddlewareRef] {
        &self.middleware
    }

    fn middleware_stack_mut(&mut self) -> &mut Vec<MiddlewareRef> {
        &mut self.middleware
    }
}

/// A path prefix plus defaults shared by the routes registered inside it.
#[derive(Debug, Clone, Default)]
pub struct RouteGroup {
    pub(crate) prefix: String,
    pub(crate) constraints: Constraints,
    pub(crate) middleware: Vec<MiddlewareRef>,
    pub(crate) strategy: Option<Strategy>,
    pub(crate) parent: Option<GroupId>,
}

impl RouteGroup {
    /// The full prefix, including any parent group prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn strategy(&self) -> Option<Strategy> {
        self.strategy
    }

    pub fn parent(&self) -> Option<GroupId> {
        self.parent
    }
}

impl ConstraintHolder for RouteGroup {
    fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    fn constraints_mut(&mut self) -> &mut Constraints {
        &mut self.constraints
    }
}

impl MiddlewareHolder for RouteGroup {
    fn middleware_stack(&self) -> &[MiddlewareRef] {
        &self.middleware
    }

    fn middleware_stack_mut(&mut self) -> &mut Vec<MiddlewareRef> {
        &mut self.middleware
    }
}

/// The route a request was matched to, together with its variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentRoute {
    pub id: RouteId,
    pub method: Method,
    pub name: Option<String>,
    pub path: String,
    pub vars: Params,
}
