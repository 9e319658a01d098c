//! Registered routes and groups, plus the builders used to declare them.

use std::sync::Arc;

use log::debug;

use crate::http::Method;
use crate::routing::container::{resolve_middleware_alias, Container};
use crate::routing::error::{CompilationError, Error};
use crate::routing::handler::{Handler, Strategy};
use crate::routing::middleware::Middleware;
use crate::routing::route::{
    ConstraintHolder, Constraints, GroupId, MiddlewareHolder, RouteDefinition, RouteGroup, RouteId,
};

/// Every route and group registered with a router.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    base_prefix: String,
    routes: Vec<RouteDefinition>,
    groups: Vec<RouteGroup>,
}

impl RouteTable {
    /// Create an empty table whose paths all start with `base_prefix`.
    pub fn new(base_prefix: &str) -> Self {
        Self {
            base_prefix: normalize_prefix(base_prefix),
            ..Self::default()
        }
    }

    pub fn base_prefix(&self) -> &str {
        &self.base_prefix
    }

    /// Register a route, inside `group` if given.
    pub(crate) fn insert_route(
        &mut self,
        method: Method,
        path: &str,
        handler: Handler,
        group: Option<GroupId>,
    ) -> (RouteId, &mut RouteDefinition) {
        let prefix = group
            .and_then(|id| self.group(id))
            .map_or(self.base_prefix.as_str(), RouteGroup::prefix);
        // Mapping `/` under a prefix yields the bare prefix.
        let full_path = match prefix {
            "" if path.trim_start_matches('/').is_empty() => "/".to_string(),
            prefix if path.trim_start_matches('/').is_empty() => prefix.to_string(),
            prefix => join_path(prefix, path),
        };

        debug!("Registering route {method} {full_path}");

        let mut route = RouteDefinition::new(method, full_path, handler);
        route.group = group;
        self.routes.push(route);

        let index = self.routes.len() - 1;
        (RouteId(index), &mut self.routes[index])
    }

    /// Register a group under `parent` (or at the root) and return its handle.
    pub fn add_group(&mut self, prefix: &str, parent: Option<GroupId>) -> GroupId {
        let parent_prefix = parent
            .and_then(|id| self.group(id))
            .map_or(self.base_prefix.as_str(), RouteGroup::prefix);
        let prefix = join_path(parent_prefix, prefix).trim_end_matches('/').to_string();

        debug!("Registering route group {prefix}");

        self.groups.push(RouteGroup {
            prefix,
            parent,
            ..RouteGroup::default()
        });
        GroupId(self.groups.len() - 1)
    }

    pub fn route(&self, id: RouteId) -> Option<&RouteDefinition> {
        self.routes.get(id.0)
    }

    pub fn group(&self, id: GroupId) -> Option<&RouteGroup> {
        self.groups.get(id.0)
    }

    pub fn group_mut(&mut self, id: GroupId) -> Option<&mut RouteGroup> {
        self.groups.get_mut(id.0)
    }

    /// Routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = (RouteId, &RouteDefinition)> {
        self.routes.iter().enumerate().map(|(i, route)| (RouteId(i), route))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn find_by_name(&self, name: &str) -> Option<RouteId> {
        self.routes()
            .find(|(_, route)| route.name() == Some(name))
            .map(|(id, _)| id)
    }

    /// The groups enclosing a route, outermost first.
    pub fn group_chain(&self, id: RouteId) -> Vec<&RouteGroup> {
        let mut chain = Vec::new();
        let mut next = self.route(id).and_then(RouteDefinition::parent_group);
        while let Some(group) = next.and_then(|id| self.group(id)) {
            chain.push(group);
            next = group.parent();
        }
        chain.reverse();
        chain
    }

    /// The route's own constraints, with unset fields taken from its groups
    /// (innermost group first).
    pub fn effective_constraints(&self, id: RouteId) -> Constraints {
        let Some(route) = self.route(id) else {
            return Constraints::default();
        };
        self.group_chain(id)
            .iter()
            .rev()
            .fold(route.constraints().clone(), |constraints, group| {
                constraints.or(group.constraints())
            })
    }

    /// The route's strategy, else the one of its innermost group declaring one.
    pub fn effective_strategy(&self, id: RouteId) -> Option<Strategy> {
        let route = self.route(id)?;
        route
            .strategy()
            .or_else(|| self.group_chain(id).iter().rev().find_map(|group| group.strategy()))
    }

    /// Reject route names registered more than once.
    pub fn check_names(&self) -> Result<(), CompilationError> {
        for (i, route) in self.routes.iter().enumerate() {
            if let Some(name) = route.name() {
                if self.routes[..i].iter().any(|other| other.name() == Some(name)) {
                    return Err(CompilationError::DuplicateRouteName(name.to_string()));
                }
            }
        }
        Ok(())
    }
}

/// Normalize a prefix to `/segment...` without a trailing slash, or empty.
pub(crate) fn normalize_prefix(prefix: &str) -> String {
    match prefix.trim_matches('/') {
        "" => String::new(),
        trimmed => format!("/{trimmed}"),
    }
}

fn join_path(prefix: &str, path: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Configures a freshly registered route.
pub struct RouteBuilder<'a> {
    route: &'a mut RouteDefinition,
    id: RouteId,
    container: Option<&'a dyn Container>,
}

impl<'a> RouteBuilder<'a> {
    pub(crate) fn new(route: &'a mut RouteDefinition, id: RouteId, container: Option<&'a dyn Container>) -> Self {
        Self { route, id, container }
    }

    pub fn id(&self) -> RouteId {
        self.id
    }

    pub fn name(self, name: impl Into<String>) -> Self {
        self.route.name = Some(name.into());
        self
    }

    pub fn host(self, host: impl Into<String>) -> Self {
        self.route.set_host(host);
        self
    }

    pub fn scheme(self, scheme: impl Into<String>) -> Self {
        self.route.set_scheme(scheme);
        self
    }

    pub fn port(self, port: u16) -> Self {
        self.route.set_port(port);
        self
    }

    pub fn middleware(self, middleware: impl Middleware + 'static) -> Self {
        self.middleware_arc(Arc::new(middleware))
    }

    pub fn middleware_arc(self, middleware: Arc<dyn Middleware>) -> Self {
        self.route.add_middleware(middleware);
        self
    }

    /// Attach middleware by container alias.
    ///
    /// Fails when no container is configured or the alias is unknown to it.
    pub fn middle(self, alias: &str) -> Result<Self, Error> {
        resolve_middleware_alias(self.container, alias)?;
        self.route.add_lazy_middleware(alias);
        Ok(self)
    }

    pub fn strategy(self, strategy: Strategy) -> Self {
        self.route.strategy = Some(strategy);
        self
    }
}

/// Registers routes and sub-groups inside a group and sets its defaults.
pub struct GroupBuilder<'a> {
    table: &'a mut RouteTable,
    id: GroupId,
    container: Option<&'a dyn Container>,
}

impl<'a> GroupBuilder<'a> {
    pub(crate) fn new(table: &'a mut RouteTable, id: GroupId, container: Option<&'a dyn Container>) -> Self {
        Self { table, id, container }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    /// The full prefix of the group.
    pub fn prefix(&self) -> &str {
        self.table.group(self.id).map_or("", RouteGroup::prefix)
    }

    pub fn map(&mut self, method: Method, path: &str, handler: Handler) -> RouteBuilder<'_> {
        let (id, route) = self.table.insert_route(method, path, handler, Some(self.id));
        RouteBuilder::new(route, id, self.container)
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

    /// Register a nested group; its prefix is appended to this one.
    pub fn group<F>(&mut self, prefix: &str, build: F) -> GroupId
    where
        F: FnOnce(&mut GroupBuilder<'_>),
    {
        let id = self.table.add_group(prefix, Some(self.id));
        build(&mut GroupBuilder::new(self.table, id, self.container));
        id
    }

    pub fn host(&mut self, host: impl Into<String>) -> &mut Self {
        if let Some(group) = self.table.group_mut(self.id) {
            group.set_host(host);
        }
        self
    }

    pub fn scheme(&mut self, scheme: impl Into<String>) -> &mut Self {
        if let Some(group) = self.table.group_mut(self.id) {
            group.set_scheme(scheme);
        }
        self
    }

    pub fn port(&mut self, port: u16) -> &mut Self {
        if let Some(group) = self.table.group_mut(self.id) {
            group.set_port(port);
        }
        self
    }

    pub fn middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        if let Some(group) = self.table.group_mut(self.id) {
            group.add_middleware(Arc::new(middleware));
        }
        self
    }

    pub fn middle(&mut self, alias: &str) -> Result<&mut Self, Error> {
        resolve_middleware_alias(self.container, alias)?;
        if let Some(group) = self.table.group_mut(self.id) {
            group.add_lazy_middleware(alias);
        }
        Ok(self)
    }

    pub fn strategy(&mut self, strategy: Strategy) -> &mut Self {
        if let Some(group) = self.table.group_mut(self.id) {
            group.strategy = Some(strategy);
        }
        self
    }
}
