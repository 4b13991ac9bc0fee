//! Panic recovery.
//!
//! Converts a panicking handler into a 500 so that one failing request never
//! takes down the connection task or affects concurrent requests.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;

use crate::http::handler::Middleware;
use crate::http::response;

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

pub fn panic_recover() -> Middleware {
    Middleware::from_fn(|req, next| async move {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        // The handler may panic while building its future or while polling it.
        let result = match std::panic::catch_unwind(AssertUnwindSafe(|| next.call(req))) {
            Ok(fut) => AssertUnwindSafe(fut).catch_unwind().await,
            Err(payload) => Err(payload),
        };

        result.unwrap_or_else(|payload| {
            tracing::error!(
                %method,
                path = %path,
                panic = panic_message(payload.as_ref()),
                "Recovered from handler panic"
            );
            response::internal_error()
        })
    })
}
