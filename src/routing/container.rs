//! Injection source consulted for handler arguments and middleware aliases.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::routing::error::Error;
use crate::routing::middleware::Middleware;

/// Namespace tried for a middleware alias the container does not know as-is.
pub const MIDDLEWARE_ALIAS_PREFIX: &str = "routing.middleware.";

/// A name → value lookup service.
pub trait Container: Send + Sync {
    fn has(&self, id: &str) -> bool;

    /// A value to inject into a handler parameter.
    fn get(&self, id: &str) -> Option<Value>;

    /// A middleware instance registered under `id`.
    fn middleware(&self, _id: &str) -> Option<Arc<dyn Middleware>> {
        None
    }
}

/// Map an alias to the id the container manages: the alias itself, or
/// `routing.middleware.<alias>`.
pub fn resolve_middleware_alias(container: Option<&dyn Container>, alias: &str) -> Result<String, Error> {
    let container = container.ok_or(Error::ContainerRequired)?;

    if container.has(alias) {
        return Ok(alias.to_string());
    }

    let namespaced = format!("{MIDDLEWARE_ALIAS_PREFIX}{alias}");
    if container.has(&namespaced) {
        Ok(namespaced)
    } else {
        Err(Error::UnknownMiddleware(namespaced))
    }
}

/// In-memory [`Container`].
#[derive(Default, Clone)]
pub struct ServiceContainer {
    values: HashMap<String, Value>,
    middleware: HashMap<String, Arc<dyn Middleware>>,
}

impl ServiceContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, id: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(id.into(), value.into());
        self
    }

    pub fn with_middleware(mut self, id: impl Into<String>, middleware: impl Middleware + 'static) -> Self {
        self.middleware.insert(id.into(), Arc::new(middleware));
        self
    }
}

impl Container for ServiceContainer {
    fn has(&self, id: &str) -> bool {
        self.values.contains_key(id) || self.middleware.contains_key(id)
    }

    fn get(&self, id: &str) -> Option<Value> {
        self.values.get(id).cloned()
    }

    fn middleware(&self, id: &str) -> Option<Arc<dyn Middleware>> {
        self.middleware.get(id).cloned()
    }
}
