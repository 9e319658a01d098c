//! HTTP request and response abstractions.
//!
//! The router only needs a narrow view of HTTP: a request exposing its method,
//! path and headers, and a response it can decorate. Transport concerns live
//! outside this crate.

mod error;
mod method;
mod request;
mod response;

// Re-export public items
pub use error::Error;
pub use method::Method;
pub use request::HttpRequest;
pub use response::{HttpResponse, StatusCode};
