//! Binding matched path variables and injected values to handler parameters.
//!
//! Each declared parameter goes through the resolvers in priority order:
//! the injection container first (when one is configured), then the route
//! variables. The first resolver producing a value wins. Parameters nobody
//! binds fall back to their declared default when the handler is invoked.

use serde_json::{Number, Value};

use crate::routing::container::Container;
use crate::routing::error::Error;
use crate::routing::params::Params;

/// Declared type of a handler parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// No declared type; the raw value is passed through.
    Any,
    String,
    Bool,
    Int,
    Float,
    Array,
    /// A service looked up in the container by this id.
    Service(String),
}

/// One declared handler parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub ty: ParamType,
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Where a bound value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingSource {
    PathVariable,
    Injected,
    Default,
    Unresolved,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentBinding {
    pub name: String,
    pub value: Option<Value>,
    pub source: BindingSource,
}

/// A source of values for handler parameters.
pub trait Resolver {
    fn resolve(&self, param: &ParamSpec) -> Option<Value>;

    fn source(&self) -> BindingSource;
}

/// Looks parameters up in the injection container, by declared service id
/// first and then by parameter name.
pub struct ContainerResolver<'a> {
    container: &'a dyn Container,
}

impl<'a> ContainerResolver<'a> {
    pub fn new(container: &'a dyn Container) -> Self {
        Self { container }
    }
}

impl Resolver for ContainerResolver<'_> {
    fn resolve(&self, param: &ParamSpec) -> Option<Value> {
        if let ParamType::Service(id) = &param.ty {
            if self.container.has(id) {
                if let Some(value) = self.container.get(id) {
                    return Some(value);
                }
            }
        }

        if self.container.has(&param.name) {
            return self.container.get(&param.name);
        }

        None
    }

    fn source(&self) -> BindingSource {
        BindingSource::Injected
    }
}

/// Looks parameters up among the matched route variables by name.
pub struct RouteVarResolver<'a> {
    vars: &'a Params,
}

impl<'a> RouteVarResolver<'a> {
    pub fn new(vars: &'a Params) -> Self {
        Self { vars }
    }
}

impl Resolver for RouteVarResolver<'_> {
    fn resolve(&self, param: &ParamSpec) -> Option<Value> {
        let raw = self.vars.get(&param.name)?;
        coerce(&Value::String(raw.to_string()), &param.ty)
    }

    fn source(&self) -> BindingSource {
        BindingSource::PathVariable
    }
}

/// Runs the resolvers in priority order for every declared parameter.
pub struct ArgumentResolver<'a> {
    resolvers: Vec<Box<dyn Resolver + 'a>>,
}

impl<'a> ArgumentResolver<'a> {
    pub fn new(vars: &'a Params, container: Option<&'a dyn Container>) -> Self {
        let mut resolvers: Vec<Box<dyn Resolver + 'a>> = Vec::new();
        if let Some(container) = container {
            resolvers.push(Box::new(ContainerResolver::new(container)));
        }
        resolvers.push(Box::new(RouteVarResolver::new(vars)));
        Self { resolvers }
    }

    pub fn resolve(&self, params: &[ParamSpec]) -> Vec<ArgumentBinding> {
        params
            .iter()
            .map(|param| {
                self.resolvers
                    .iter()
                    .find_map(|resolver| {
                        resolver.resolve(param).map(|value| ArgumentBinding {
                            name: param.name.clone(),
                            value: Some(value),
                            source: resolver.source(),
                        })
                    })
                    .unwrap_or_else(|| ArgumentBinding {
                        name: param.name.clone(),
                        value: None,
                        source: BindingSource::Unresolved,
                    })
            })
            .collect()
    }
}

/// Coerce a raw value to a declared parameter type.
///
/// `None` means the value does not bind; it is not an error.
pub fn coerce(value: &Value, ty: &ParamType) -> Option<Value> {
    match ty {
        ParamType::Any => Some(value.clone()),
        ParamType::Array => value.is_array().then(|| value.clone()),
        ParamType::String => value.is_string().then(|| value.clone()),
        ParamType::Bool => match value {
            Value::Bool(_) => Some(value.clone()),
            _ => coerce_bool(&scalar_text(value)?).map(Value::Bool),
        },
        ParamType::Float => match value {
            Value::Number(n) if n.is_f64() => Some(value.clone()),
            _ => coerce_float(&scalar_text(value)?),
        },
        ParamType::Int => coerce_int(&scalar_text(value)?).map(Value::from),
        ParamType::Service(_) => None,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn coerce_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

fn coerce_float(text: &str) -> Option<Value> {
    if !is_numeric(text) {
        return None;
    }
    let float: f64 = text.trim().parse().ok()?;
    if float.to_string() == text || text.contains('.') {
        Number::from_f64(float).map(Value::Number)
    } else {
        None
    }
}

fn coerce_int(text: &str) -> Option<i64> {
    if !is_numeric(text) {
        return None;
    }
    let text = text.trim();
    text.parse::<i64>().ok().or_else(|| {
        let float: f64 = text.parse().ok()?;
        (float.is_finite() && float >= i64::MIN as f64 && float <= i64::MAX as f64).then(|| float.trunc() as i64)
    })
}

/// Whether `text` is a decimal number: optional surrounding whitespace and
/// sign, digits with an optional fraction, and an optional exponent.
pub fn is_numeric(text: &str) -> bool {
    let text = text.trim_start_matches([' ', '\t', '\n', '\r', '\x0b', '\x0c']);
    let text = text.trim_end_matches([' ', '\t', '\n', '\r', '\x0b', '\x0c']);
    let bytes = text.as_bytes();
    let mut i = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;

    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        digits += i - frac_start;
    }

    if digits == 0 {
        return false;
    }

    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }

    i == bytes.len()
}

/// The arguments a handler is invoked with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    bindings: Vec<ArgumentBinding>,
}

impl Arguments {
    /// Apply declared defaults to unresolved bindings.
    ///
    /// Fails with [`Error::MissingArgument`] for the first parameter that is
    /// unresolved and has no default.
    pub fn bind(bindings: Vec<ArgumentBinding>, params: &[ParamSpec]) -> Result<Self, Error> {
        let bindings = bindings
            .into_iter()
            .map(|binding| {
                if binding.source != BindingSource::Unresolved {
                    return Ok(binding);
                }
                let default = params
                    .iter()
                    .find(|param| param.name == binding.name)
                    .and_then(|param| param.default.clone())
                    .ok_or_else(|| Error::MissingArgument(binding.name.clone()))?;
                Ok(ArgumentBinding {
                    name: binding.name,
                    value: Some(default),
                    source: BindingSource::Default,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(Self { bindings })
    }

    pub fn bindings(&self) -> &[ArgumentBinding] {
        &self.bindings
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings
            .iter()
            .find(|binding| binding.name == name)
            .and_then(|binding| binding.value.as_ref())
    }

    pub fn source(&self, name: &str) -> Option<BindingSource> {
        self.bindings
            .iter()
            .find(|binding| binding.name == name)
            .map(|binding| binding.source)
    }

    /// Values in declaration order.
    pub fn positional(&self) -> impl Iterator<Item = &Value> {
        self.bindings.iter().filter_map(|binding| binding.value.as_ref())
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }
}
