//! Middleware restricting a route to XMLHttpRequest callers.

use async_trait::async_trait;
use log::debug;
use serde_json::json;

use crate::http::{HttpRequest, HttpResponse, StatusCode};
use crate::routing::error::Error;
use crate::routing::middleware::{Middleware, Next};

/// Header set by browsers' XHR clients.
pub const XHR_HEADER: &str = "X-Requested-With";

/// Lets through requests carrying `X-Requested-With: XMLHttpRequest`; every
/// other request gets a JSON 500 response.
#[derive(Debug, Clone, Copy, Default)]
pub struct XhrMiddleware;

#[async_trait]
impl Middleware for XhrMiddleware {
    async fn process(&self, request: HttpRequest, next: Next<'_>) -> Result<HttpResponse, Error> {
        if request.get_header(XHR_HEADER).is_some_and(|value| value == "XMLHttpRequest") {
            return next.run(request).await;
        }

        debug!("Rejecting non-XHR request to {}", request.path);
        let body = json!({
            "status_code": 500,
            "reason_phrase": "Only XMLHttpRequest (XHR) are allowed",
        });
        Ok(HttpResponse::new(StatusCode::InternalServerError).with_json(&body)?)
    }

    fn name(&self) -> &str {
        "xhr"
    }
}
