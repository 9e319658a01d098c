//! The scheme/host/port a request was received on.

use serde::{Deserialize, Serialize};

use crate::http::HttpRequest;

/// Where the current request was addressed to.
///
/// Route constraints are evaluated against it, and absolute URLs fall back
/// to it when neither the caller nor the route says otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestContext {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host: "localhost".to_string(),
            port: 80,
        }
    }
}

impl RequestContext {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            port,
        }
    }

    /// Derive the context from the `Host` and `X-Forwarded-Proto` headers.
    ///
    /// Missing pieces are taken from `fallback`; a missing port defaults to
    /// the well-known port of the scheme.
    pub fn from_request(request: &HttpRequest, fallback: &RequestContext) -> Self {
        let scheme = request
            .get_header("X-Forwarded-Proto")
            .map(|proto| proto.trim().to_ascii_lowercase())
            .unwrap_or_else(|| fallback.scheme.clone());

        let Some(host_header) = request.get_header("Host") else {
            return Self {
                port: default_port(&scheme).unwrap_or(fallback.port),
                scheme,
                host: fallback.host.clone(),
            };
        };

        let (host, port) = match host_header.trim().rsplit_once(':') {
            Some((host, port)) => match port.parse::<u16>() {
                Ok(port) => (host.to_string(), Some(port)),
                Err(_) => (host_header.trim().to_string(), None),
            },
            _ => (host_header.trim().to_string(), None),
        };

        Self {
            port: port.or_else(|| default_port(&scheme)).unwrap_or(fallback.port),
            scheme,
            host: host.to_ascii_lowercase(),
        }
    }

    /// Whether the port is the default one for the scheme and can be left out of URLs.
    pub fn is_default_port(&self) -> bool {
        default_port(&self.scheme) == Some(self.port)
    }
}

pub(crate) fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}
