//! Request timeout enforcement.
//!
//! The wrapped handler runs on its own task. When the deadline passes the
//! caller gets a 503 immediately, while the handler task is left to run to
//! completion in the background; its eventual response is discarded.

use std::time::Duration;

use crate::http::handler::Middleware;
use crate::http::response;

pub fn timeout(limit: Duration) -> Middleware {
    Middleware::from_fn(move |req, next| async move {
        let path = req.uri().path().to_string();
        let task = tokio::spawn(next.call(req));
        match tokio::time::timeout(limit, task).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::error!(path = %path, error = %e, "Handler task failed");
                response::internal_error()
            }
            Err(_) => {
                tracing::warn!(path = %path, timeout = ?limit, "Handler timed out");
                response::timed_out()
            }
        }
    })
}
