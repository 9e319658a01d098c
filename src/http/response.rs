//! Responses produced by handlers, fallbacks and middleware.

use std::collections::HashMap;
use serde::Serialize;

use crate::http::error::Error;

macro_rules! status_codes {
    ($($variant:ident = $code:literal => $phrase:literal,)+) => {
        /// The status codes a route can answer with.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum StatusCode {
            $($variant = $code,)+
        }

        impl StatusCode {
            /// The standard reason phrase, e.g. `Not Found`.
            pub fn reason_phrase(&self) -> &'static str {
                match self {
                    $(StatusCode::$variant => $phrase,)+
                }
            }
        }
    };
}

status_codes! {
    Ok = 200 => "OK",
    Created = 201 => "Created",
    Accepted = 202 => "Accepted",
    NoContent = 204 => "No Content",
    MovedPermanently = 301 => "Moved Permanently",
    Found = 302 => "Found",
    SeeOther = 303 => "See Other",
    TemporaryRedirect = 307 => "Temporary Redirect",
    PermanentRedirect = 308 => "Permanent Redirect",
    BadRequest = 400 => "Bad Request",
    Unauthorized = 401 => "Unauthorized",
    Forbidden = 403 => "Forbidden",
    NotFound = 404 => "Not Found",
    MethodNotAllowed = 405 => "Method Not Allowed",
    NotAcceptable = 406 => "Not Acceptable",
    Conflict = 409 => "Conflict",
    Gone = 410 => "Gone",
    UnsupportedMediaType = 415 => "Unsupported Media Type",
    ImATeapot = 418 => "I'm a teapot",
    UnprocessableEntity = 422 => "Unprocessable Entity",
    TooManyRequests = 429 => "Too Many Requests",
    InternalServerError = 500 => "Internal Server Error",
    NotImplemented = 501 => "Not Implemented",
    ServiceUnavailable = 503 => "Service Unavailable",
}

impl StatusCode {
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// 3xx
    pub fn is_redirection(&self) -> bool {
        (300..400).contains(&self.as_u16())
    }
}

/// A response on its way back to the transport.
///
/// Header names keep the case they were set with; lookups and replacement
/// ignore it.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// An empty response carrying only the `Server` header.
    pub fn new(status: StatusCode) -> Self {
        let headers = HashMap::from([("Server".to_string(), env!("CARGO_PKG_NAME").to_string())]);
        Self {
            status,
            headers,
            body: Vec::new(),
        }
    }

    /// A redirect to `location` with the given 3xx status.
    pub fn redirect(location: impl Into<String>, status: StatusCode) -> Self {
        Self::new(status).with_header("Location", location)
    }

    pub fn with_body_string(self, body: impl Into<String>) -> Self {
        self.set_body(body.into().into_bytes())
    }

    pub fn with_body_bytes(self, body: impl Into<Vec<u8>>) -> Self {
        self.set_body(body.into())
    }

    /// Set a header, replacing any existing one of the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
        self
    }

    pub fn with_content_type(self, content_type: impl Into<String>) -> Self {
        self.with_header("Content-Type", content_type)
    }

    /// Serialize `value` as the body, with an `application/json` content type.
    pub fn with_json<T: Serialize>(self, value: &T) -> Result<Self, Error> {
        let body = serde_json::to_vec(value)?;
        Ok(self.with_content_type("application/json").set_body(body))
    }

    pub fn get_header(&self, name: &str) -> Option<&String> {
        self.headers
            .iter()
            .find_map(|(key, value)| key.eq_ignore_ascii_case(name).then_some(value))
    }

    /// The body decoded as UTF-8, lossily.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Serialize as an HTTP/1.1 message: status line, headers, blank line, body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status.as_u16(), self.status.reason_phrase());
        for (name, value) in &self.headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");

        let mut message = head.into_bytes();
        message.extend_from_slice(&self.body);
        message
    }

    fn set_body(mut self, body: Vec<u8>) -> Self {
        let length = body.len().to_string();
        self.body = body;
        self.with_header("Content-Length", length)
    }
}
