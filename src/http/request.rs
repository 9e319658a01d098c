//! The request as seen by the router.

use std::collections::HashMap;
use serde::de::DeserializeOwned;
use url::form_urlencoded;

use crate::http::error::Error;
use crate::http::method::Method;
use crate::routing::CurrentRoute;

/// An incoming request.
///
/// `path` is kept exactly as received, query string included. Routes are
/// matched against [`path_without_query`](HttpRequest::path_without_query);
/// the decoded query lives in `query_params`.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub query_params: HashMap<String, String>,
    /// Set by the router once the request has been matched.
    pub current_route: Option<CurrentRoute>,
}

impl HttpRequest {
    /// Build a request with an empty body. The query string of `path`, if
    /// any, is decoded into `query_params`.
    pub fn new(method: Method, path: impl Into<String>, headers: HashMap<String, String>) -> Self {
        let path = path.into();
        let query_params = match path.split_once('?') {
            Some((_, query)) => form_urlencoded::parse(query.as_bytes()).into_owned().collect(),
            None => HashMap::new(),
        };

        Self {
            method,
            path,
            headers,
            body: Vec::new(),
            query_params,
            current_route: None,
        }
    }

    /// A `GET` request without headers.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path, HashMap::new())
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn path_without_query(&self) -> &str {
        self.path.split_once('?').map_or(self.path.as_str(), |(path, _)| path)
    }

    /// Look a header up by name, ignoring case.
    pub fn get_header(&self, name: &str) -> Option<&String> {
        self.headers
            .iter()
            .find_map(|(key, value)| key.eq_ignore_ascii_case(name).then_some(value))
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// Deserialize the body. Fails with [`Error::MissingHeader`] unless the
    /// request declares a JSON content type.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        if !self.is_json() {
            return Err(Error::MissingHeader("Content-Type: application/json".to_string()));
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn is_json(&self) -> bool {
        self.get_header("Content-Type")
            .is_some_and(|content_type| content_type.starts_with("application/json"))
    }

    pub fn get_query_param(&self, name: &str) -> Option<&String> {
        self.query_params.get(name)
    }

    /// The route this request was matched to.
    pub fn current_route(&self) -> Option<&CurrentRoute> {
        self.current_route.as_ref()
    }

    /// A path variable of the matched route.
    pub fn route_var(&self, name: &str) -> Option<&str> {
        self.current_route.as_ref().and_then(|route| route.vars.get(name))
    }
}
