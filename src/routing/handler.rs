//! Route handlers and the strategies turning their return values into responses.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::{HttpRequest, HttpResponse, StatusCode};
use crate::routing::arguments::{Arguments, ParamSpec, ParamType};
use crate::routing::error::{CompilationError, Error};

/// Type alias for a boxed future that returns a Result<Reply, Error>.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Reply, Error>> + Send>>;

/// Type alias for a handler function that takes its bound arguments and the request.
pub type HandlerFn = Arc<dyn Fn(Arguments, HttpRequest) -> HandlerFuture + Send + Sync>;

/// What a handler returns; the route's [`Strategy`] turns it into a response.
#[derive(Debug, Clone)]
pub enum Reply {
    Response(HttpResponse),
    Text(String),
    Json(Value),
    Empty,
}

impl From<HttpResponse> for Reply {
    fn from(response: HttpResponse) -> Self {
        Reply::Response(response)
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Text(text.to_string())
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Json(value)
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::Empty
    }
}

/// A handler function plus its declared parameter list.
#[derive(Clone)]
pub struct Handler {
    func: HandlerFn,
    params: Vec<ParamSpec>,
}

impl Handler {
    pub fn new<F, Fut, R>(handler: F) -> Self
    where
        F: Fn(Arguments, HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Error>> + Send + 'static,
        R: Into<Reply> + 'static,
    {
        let func: HandlerFn = Arc::new(move |args: Arguments, req: HttpRequest| -> HandlerFuture {
            let fut = handler(args, req);
            Box::pin(async move { fut.await.map(Into::into) })
        });

        Self {
            func,
            params: Vec::new(),
        }
    }

    /// Declare a parameter that must be bound.
    pub fn param(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.params.push(ParamSpec::new(name, ty));
        self
    }

    /// Declare a parameter with a default used when nothing binds it.
    pub fn param_or(mut self, name: impl Into<String>, ty: ParamType, default: impl Into<Value>) -> Self {
        self.params.push(ParamSpec::new(name, ty).with_default(default));
        self
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn call(&self, args: Arguments, request: HttpRequest) -> HandlerFuture {
        (self.func)(args, request)
    }

    /// Check the declared signature; run once when routes are compiled.
    pub(crate) fn validate(&self) -> Result<(), CompilationError> {
        for (i, param) in self.params.iter().enumerate() {
            if self.params[..i].iter().any(|other| other.name == param.name) {
                return Err(CompilationError::DuplicateParameter(param.name.clone()));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("params", &self.params).finish_non_exhaustive()
    }
}

/// Policy converting a handler's [`Reply`] into a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Text becomes an HTML body; other non-response values an empty 200.
    #[default]
    Application,
    /// Text and JSON values are serialized as a JSON body; nothing is a 404.
    Json,
}

impl Strategy {
    pub fn respond(&self, reply: Reply) -> Result<HttpResponse, Error> {
        match (self, reply) {
            (_, Reply::Response(response)) => Ok(response),
            (Strategy::Application, Reply::Text(text)) => Ok(HttpResponse::new(StatusCode::Ok)
                .with_content_type("text/html; charset=UTF-8")
                .with_body_string(text)),
            (Strategy::Application, _) => Ok(HttpResponse::new(StatusCode::Ok)),
            (Strategy::Json, Reply::Text(text)) => Ok(HttpResponse::new(StatusCode::Ok).with_json(&text)?),
            (Strategy::Json, Reply::Json(value)) => Ok(HttpResponse::new(StatusCode::Ok).with_json(&value)?),
            (Strategy::Json, Reply::Empty) => Ok(HttpResponse::new(StatusCode::NotFound)),
        }
    }
}
