//! Access logging.
//!
//! One `access` line per response with method, path, status, duration and
//! the caller named by the bearer token (verified with the primary secret).

use std::sync::Arc;
use std::time::Instant;

use crate::http::handler::{Handler, Middleware};
use crate::security::auth::{bearer_token, verify_token};

pub fn access_log(secret: impl Into<Arc<str>>) -> Middleware {
    let secret: Arc<str> = secret.into();
    Middleware::from_fn(move |req, next| {
        let start = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let user = bearer_token(req.headers())
            .and_then(|token| verify_token(&[&*secret], token))
            .map(|u| u.username)
            .unwrap_or_else(|| "-".to_string());

        async move {
            let response = next.call(req).await;
            tracing::info!(
                target: "access",
                %method,
                path = %path,
                status = response.status().as_u16(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                user = %user,
                "request served"
            );
            response
        }
    })
}

/// Wrap a single handler in access logging.
pub fn wrap_access_log(secret: impl Into<Arc<str>>, handler: Handler) -> Handler {
    access_log(secret).wrap(handler)
}
