//! Standard response headers.
//!
//! Adds CORS allowances, the server name and a JSON content type to every
//! response. Headers the handler set itself are left alone.

use axum::http::header::{self, HeaderName, HeaderValue};

use crate::http::handler::Middleware;

pub const SERVER_NAME_HEADER: HeaderName = HeaderName::from_static("x-server-name");

const SERVER_NAME: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

fn defaults() -> [(HeaderName, HeaderValue); 6] {
    [
        (
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        ),
        (
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Origin, X-Requested-With, Content-Type, Accept, Authorization"),
        ),
        (
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST,GET,OPTIONS,PUT,DELETE"),
        ),
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
        (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
        (SERVER_NAME_HEADER, HeaderValue::from_static(SERVER_NAME)),
    ]
}

pub fn standard_headers() -> Middleware {
    Middleware::from_fn(|req, next| async move {
        let mut response = next.call(req).await;
        let headers = response.headers_mut();
        for (name, value) in defaults() {
            headers.entry(name).or_insert(value);
        }
        response
    })
}
