//! Reverse routing: building URLs from path templates.

use url::form_urlencoded;

use crate::routing::context::{default_port, RequestContext};
use crate::routing::error::UrlGenerationError;
use crate::routing::pattern::{PatternCompiler, Segment, Variant};
use crate::routing::route::Constraints;

/// Values for the placeholders of a template.
///
/// Named values bind by placeholder name; positional values fill the
/// placeholders no named value covers, in template order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlArgs {
    named: Vec<(String, String)>,
    positional: Vec<String>,
}

impl UrlArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a named value.
    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        let name = name.into();
        let value = value.to_string();
        match self.named.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.named.push((name, value)),
        }
        self
    }

    /// Append a positional value.
    pub fn push(mut self, value: impl ToString) -> Self {
        self.positional.push(value.to_string());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.named
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.positional.is_empty()
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for UrlArgs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter().fold(UrlArgs::new(), |args, (key, value)| args.with(key, value))
    }
}

/// How to render a generated URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlOptions {
    pub absolute: bool,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub scheme: Option<String>,
}

impl UrlOptions {
    /// Options for an absolute URL resolved from the route and request context.
    pub fn absolute() -> Self {
        Self {
            absolute: true,
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }
}

/// Builds URLs with the same shortcut table the dispatcher compiles with.
pub struct UrlGenerator<'a> {
    compiler: &'a PatternCompiler,
    context: &'a RequestContext,
    constraints: Constraints,
}

impl<'a> UrlGenerator<'a> {
    pub fn new(compiler: &'a PatternCompiler, context: &'a RequestContext) -> Self {
        Self {
            compiler,
            context,
            constraints: Constraints::default(),
        }
    }

    /// Use the constraints of the route being generated for absolute URLs.
    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Generate a URL for `template`.
    ///
    /// Variants are tried longest first; the first one whose placeholders all
    /// bind and validate wins. Named values no placeholder consumed end up in
    /// the query string.
    pub fn generate(&self, template: &str, args: &UrlArgs, options: &UrlOptions) -> Result<String, UrlGenerationError> {
        let variants = self.compiler.parse(template)?;

        let mut last_error = None;
        for variant in variants.iter().rev() {
            match self.bind(template, variant, args) {
                Ok((path, consumed)) => {
                    let mut url = if options.absolute {
                        format!("{}{path}", self.origin(options))
                    } else {
                        path
                    };

                    let leftover: Vec<&(String, String)> =
                        args.named.iter().filter(|(key, _)| !consumed.contains(key)).collect();
                    if !leftover.is_empty() {
                        let query = form_urlencoded::Serializer::new(String::new())
                            .extend_pairs(leftover.iter().map(|(key, value)| (key, value)))
                            .finish();
                        url.push('?');
                        url.push_str(&query);
                    }

                    return Ok(url);
                }
                Err(error) => last_error = Some(error),
            }
        }

        Err(last_error.unwrap_or_else(|| UrlGenerationError::InsufficientArguments(template.to_string())))
    }

    /// Render one variant; returns the path and the named values it used.
    fn bind(&self, template: &str, variant: &Variant, args: &UrlArgs) -> Result<(String, Vec<String>), UrlGenerationError> {
        let mut path = String::new();
        let mut consumed = Vec::new();
        let mut positional = args.positional.iter();

        for segment in &variant.segments {
            match segment {
                Segment::Static(text) => path.push_str(text),
                Segment::Placeholder { name, regex } => {
                    let value = match args.get(name) {
                        Some(value) => {
                            consumed.push(name.clone());
                            value
                        }
                        None => positional
                            .next()
                            .map(String::as_str)
                            .ok_or_else(|| UrlGenerationError::InsufficientArguments(name.clone()))?,
                    };

                    // `?` and `#` would end the path before the value does.
                    if value.contains(['?', '#']) || !self.compiler.validator(template, regex)?.is_match(value) {
                        return Err(UrlGenerationError::ValidationFailed {
                            placeholder: name.clone(),
                            value: value.to_string(),
                        });
                    }
                    path.push_str(value);
                }
            }
        }

        Ok((path, consumed))
    }

    /// `scheme://host[:port]`, the port left out when it is the scheme's default.
    fn origin(&self, options: &UrlOptions) -> String {
        let scheme = options
            .scheme
            .clone()
            .or_else(|| self.constraints.scheme.clone())
            .unwrap_or_else(|| self.context.scheme.clone());
        let host = options
            .host
            .clone()
            .or_else(|| self.constraints.host.clone())
            .unwrap_or_else(|| self.context.host.clone());
        let port = options.port.or(self.constraints.port).unwrap_or_else(|| {
            if scheme.eq_ignore_ascii_case(&self.context.scheme) {
                self.context.port
            } else {
                default_port(&scheme).unwrap_or(self.context.port)
            }
        });

        let origin = RequestContext::new(scheme, host, port);
        if origin.is_default_port() {
            format!("{}://{}", origin.scheme, origin.host)
        } else {
            format!("{}://{}:{}", origin.scheme, origin.host, origin.port)
        }
    }
}
