//! The compiled matching structure and the three-way match outcome.
//!
//! Routes are grouped per method. Inside a method, static paths are looked up
//! in a hash map first; dynamic variants are matched through a single
//! `RegexSet` whose hits are tried in registration order.

use std::collections::HashMap;

use log::{debug, info, trace, warn};
use regex::RegexSet;

use crate::http::Method;
use crate::routing::context::RequestContext;
use crate::routing::error::CompilationError;
use crate::routing::params::Params;
use crate::routing::pattern::{CompiledPattern, PatternCompiler};
use crate::routing::route::{Constraints, RouteId};
use crate::routing::table::RouteTable;

/// A successful match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub route: RouteId,
    /// Variables captured from the path, in template order.
    pub vars: Params,
}

/// Outcome of matching a method and path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    Found(RouteMatch),
    NotFound,
    /// The path exists under these other methods, sorted.
    MethodNotAllowed(Vec<Method>),
}

impl MatchResult {
    pub fn is_found(&self) -> bool {
        matches!(self, MatchResult::Found(_))
    }

    /// Value for the `Allow` header of a 405 response.
    pub fn allow_header(&self) -> Option<String> {
        match self {
            MatchResult::MethodNotAllowed(methods) => Some(
                methods
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Entry {
    route: RouteId,
    pattern: CompiledPattern,
    constraints: Constraints,
}

/// The compiled routes of one method.
#[derive(Debug)]
struct MethodRoutes {
    entries: Vec<Entry>,
    statics: HashMap<String, Vec<usize>>,
    dynamic: Vec<usize>,
    set: RegexSet,
}

impl MethodRoutes {
    fn build(method: Method, entries: Vec<Entry>) -> Result<Self, CompilationError> {
        for (i, entry) in entries.iter().enumerate() {
            let duplicate = entries[..i].iter().any(|other| {
                other.pattern.pattern == entry.pattern.pattern && other.constraints == entry.constraints
            });
            if duplicate {
                return Err(CompilationError::DuplicateRoute {
                    method,
                    pattern: entry
                        .pattern
                        .static_path
                        .clone()
                        .unwrap_or_else(|| entry.pattern.pattern.clone()),
                });
            }
        }

        let mut statics: HashMap<String, Vec<usize>> = HashMap::new();
        let mut dynamic = Vec::new();
        for (i, entry) in entries.iter().enumerate() {
            match &entry.pattern.static_path {
                Some(path) => statics.entry(path.clone()).or_default().push(i),
                None => dynamic.push(i),
            }
        }

        let set = RegexSet::new(dynamic.iter().map(|&i| entries[i].pattern.pattern.as_str())).map_err(|source| {
            CompilationError::InvalidRegex {
                template: format!("{method} routes"),
                source,
            }
        })?;

        Ok(Self {
            entries,
            statics,
            dynamic,
            set,
        })
    }

    /// Structural matches for `path`: static entries first, then dynamic
    /// ones in registration order.
    fn candidates<'a>(&'a self, path: &str) -> impl Iterator<Item = &'a Entry> + 'a {
        let statics = self.statics.get(path).into_iter().flatten().copied();
        let dynamic: Vec<usize> = self.set.matches(path).into_iter().map(|i| self.dynamic[i]).collect();
        statics.chain(dynamic).map(move |i| &self.entries[i])
    }

    fn has_match(&self, path: &str) -> bool {
        self.statics.contains_key(path) || self.set.is_match(path)
    }
}

/// Matches requests against the compiled route table.
///
/// Built once from a [`RouteTable`]; read-only afterwards.
#[derive(Debug)]
pub struct Dispatcher {
    methods: HashMap<Method, MethodRoutes>,
    head_fallback_to_get: bool,
}

impl Dispatcher {
    /// Compile every route of `table`.
    pub fn compile(
        table: &RouteTable,
        compiler: &PatternCompiler,
        head_fallback_to_get: bool,
    ) -> Result<Self, CompilationError> {
        table.check_names()?;

        let mut grouped: HashMap<Method, Vec<Entry>> = HashMap::new();
        for (id, route) in table.routes() {
            route.handler().validate()?;
            let constraints = table.effective_constraints(id);
            for pattern in compiler.compile(route.path())? {
                trace!("Compiled {} {} as {}", route.method(), route.path(), pattern.pattern);
                grouped.entry(route.method()).or_default().push(Entry {
                    route: id,
                    pattern,
                    constraints: constraints.clone(),
                });
            }
        }

        let methods = grouped
            .into_iter()
            .map(|(method, entries)| Ok((method, MethodRoutes::build(method, entries)?)))
            .collect::<Result<HashMap<_, _>, CompilationError>>()?;

        info!("Compiled {} routes for {} methods", table.len(), methods.len());

        Ok(Self {
            methods,
            head_fallback_to_get,
        })
    }

    /// Match a method and path, evaluating route constraints against `context`.
    pub fn dispatch(&self, method: Method, path: &str, context: &RequestContext) -> MatchResult {
        let mut structural = false;

        for lookup in self.lookup_methods(method) {
            let Some(routes) = self.methods.get(&lookup) else {
                continue;
            };
            for entry in routes.candidates(path) {
                let Some(captures) = entry.pattern.captures(path) else {
                    continue;
                };
                structural = true;
                if entry.constraints.matches(context) {
                    debug!("Matched {method} {path} to route #{}", entry.route.0);
                    return MatchResult::Found(RouteMatch {
                        route: entry.route,
                        vars: captures.into_iter().collect(),
                    });
                }
            }
            if structural {
                break;
            }
        }

        if structural {
            warn!(
                "{method} {path} matched structurally, but no route constraint accepts {}://{}:{}",
                context.scheme, context.host, context.port
            );
            return MatchResult::NotFound;
        }

        let mut allowed: Vec<Method> = self
            .methods
            .iter()
            .filter(|(other, routes)| **other != method && routes.has_match(path))
            .map(|(other, _)| *other)
            .collect();

        if allowed.is_empty() {
            debug!("No route for {method} {path}");
            return MatchResult::NotFound;
        }

        allowed.sort_by_key(|method| method.as_str());
        debug!("{method} not allowed for {path}");
        MatchResult::MethodNotAllowed(allowed)
    }

    fn lookup_methods(&self, method: Method) -> Vec<Method> {
        if method == Method::HEAD && self.head_fallback_to_get {
            vec![Method::HEAD, Method::GET]
        } else {
            vec![method]
        }
    }
}
