//! Router configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::routing::{normalize_prefix, PatternCompiler, RequestContext, Strategy};

/// Router configuration, usually loaded from JSON.
///
/// ```ignore
/// {
///     "base_prefix": "/app",
///     "strategy": "json",
///     "url_patterns": { "year": "[0-9]{4}" },
///     "head_fallback_to_get": true,
///     "default_context": { "scheme": "https", "host": "example.com", "port": 443 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Prepended to every mapped path.
    pub base_prefix: Option<String>,
    /// Response strategy of routes and groups that do not set one.
    pub strategy: Strategy,
    /// Placeholder shortcuts added to, or replacing, the built-in ones.
    pub url_patterns: BTreeMap<String, String>,
    /// Serve `HEAD` requests with `GET` routes when no `HEAD` route matches.
    pub head_fallback_to_get: bool,
    /// Context used for absolute URLs until a request has been seen.
    pub default_context: RequestContext,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            base_prefix: None,
            strategy: Strategy::default(),
            url_patterns: BTreeMap::new(),
            head_fallback_to_get: true,
            default_context: RequestContext::default(),
        }
    }
}

impl RouterConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The base prefix as `/segment...`, or empty.
    pub fn normalized_base_prefix(&self) -> String {
        self.base_prefix.as_deref().map(normalize_prefix).unwrap_or_default()
    }

    /// A compiler with the built-in shortcuts plus `url_patterns`.
    pub fn pattern_compiler(&self) -> PatternCompiler {
        self.url_patterns
            .iter()
            .fold(PatternCompiler::new(), |compiler, (name, fragment)| {
                compiler.with_shortcut(name.as_str(), fragment.as_str())
            })
    }
}
