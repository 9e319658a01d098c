//! Error types for route compilation, URL generation and request handling.

use thiserror::Error;

use crate::http::{Error as HttpError, Method, StatusCode};

/// A path template or route table that cannot be compiled.
///
/// These are registration-time errors; they abort startup rather than being
/// recovered from at request time.
#[derive(Debug, Error)]
pub enum CompilationError {
    #[error("Unbalanced placeholder braces in route template: {0}")]
    UnbalancedBraces(String),

    #[error("Number of opening '[' and closing ']' does not match in route template: {0}")]
    UnbalancedOptional(String),

    #[error("Empty optional part in route template: {0}")]
    EmptyOptional(String),

    #[error("Optional segments can only occur at the end of a route: {0}")]
    OptionalNotAtEnd(String),

    #[error("Unknown placeholder shortcut '{shortcut}' in route template: {template}")]
    UnknownShortcut { template: String, shortcut: String },

    #[error("Invalid placeholder name '{name}' in route template: {template}")]
    InvalidPlaceholderName { template: String, name: String },

    #[error("Cannot use the same placeholder '{name}' twice in route template: {template}")]
    DuplicatePlaceholder { template: String, name: String },

    #[error("Invalid regex in route template {template}: {source}")]
    InvalidRegex {
        template: String,
        #[source]
        source: regex::Error,
    },

    #[error("Cannot register two routes matching '{pattern}' for method '{method}'")]
    DuplicateRoute { method: Method, pattern: String },

    #[error("Route name '{0}' is registered more than once")]
    DuplicateRouteName(String),

    #[error("Handler parameter '{0}' is declared more than once")]
    DuplicateParameter(String),

    #[error("Routes are already compiled; invalidate the router before compiling again")]
    AlreadyCompiled,
}

/// Why a URL could not be generated.
#[derive(Debug, Error)]
pub enum UrlGenerationError {
    #[error("Invalid Route Url: Insufficient number of arguments provided for '{0}'")]
    InsufficientArguments(String),

    #[error("Invalid Route Url: argument '{value}' for '{placeholder}' does not match its pattern")]
    ValidationFailed { placeholder: String, value: String },

    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    #[error("Invalid Route Url: {0}")]
    InvalidTemplate(#[from] CompilationError),
}

/// Errors that can occur while routing and handling a request.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Route compilation failed: {0}")]
    Compilation(#[from] CompilationError),

    #[error(transparent)]
    UrlGeneration(#[from] UrlGenerationError),

    /// A handler parameter could not be bound and declares no default.
    #[error("Missing argument for handler parameter '{0}'")]
    MissingArgument(String),

    #[error("Middleware aliased declaration requires an injection container")]
    ContainerRequired,

    #[error("Middleware alias [{0}] is not being managed by the container")]
    UnknownMiddleware(String),

    /// An HTTP error raised by a handler, turned into a response by the router.
    #[error("{message}")]
    Http { status: StatusCode, message: String },

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] HttpError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl Error {
    /// An HTTP error with the status code's reason phrase as message.
    pub fn http(status: StatusCode) -> Self {
        Error::Http {
            status,
            message: status.reason_phrase().to_string(),
        }
    }

    /// An HTTP error with a custom message.
    pub fn http_with_message(status: StatusCode, message: impl Into<String>) -> Self {
        Error::Http {
            status,
            message: message.into(),
        }
    }
}
