//! Handler and middleware primitives.
//!
//! A [`Handler`] turns a request into a response. A [`Middleware`] wraps one
//! handler into another with the same signature, so chains compose by plain
//! function application.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;

/// Future returned by every handler.
pub type HandlerFuture = BoxFuture<'static, Response>;

/// A cheaply clonable, type-erased request handler.
#[derive(Clone)]
pub struct Handler(Arc<dyn Fn(Request<Body>) -> HandlerFuture + Send + Sync>);

impl Handler {
    /// Wrap an async function or closure.
    pub fn new<F, Fut, R>(f: F) -> Self
    where
        F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        Self(Arc::new(move |req: Request<Body>| -> HandlerFuture {
            let fut = f(req);
            Box::pin(async move { fut.await.into_response() })
        }))
    }

    /// A handler that always answers with a fresh copy of `make()`.
    pub fn fixed(make: fn() -> Response) -> Self {
        Self::new(move |_req| async move { make() })
    }

    pub fn call(&self, req: Request<Body>) -> HandlerFuture {
        (self.0)(req)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler")
    }
}

/// A handler-to-handler transformation.
#[derive(Clone)]
pub struct Middleware(Arc<dyn Fn(Handler) -> Handler + Send + Sync>);

impl Middleware {
    pub fn new<F>(wrap: F) -> Self
    where
        F: Fn(Handler) -> Handler + Send + Sync + 'static,
    {
        Self(Arc::new(wrap))
    }

    /// Build a middleware from per-request logic that receives the request
    /// and the next handler in the chain.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Request<Body>, Handler) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let f = Arc::new(f);
        Self::new(move |next: Handler| {
            let f = Arc::clone(&f);
            Handler(Arc::new(move |req: Request<Body>| -> HandlerFuture {
                Box::pin(f(req, next.clone()))
            }))
        })
    }

    pub fn wrap(&self, handler: Handler) -> Handler {
        (self.0)(handler)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Middleware")
    }
}

/// Wrap `handler` so that `middlewares[0]` is the outermost layer.
pub fn apply(handler: Handler, middlewares: &[Middleware]) -> Handler {
    // Applied in reverse so the first listed runs first.
    middlewares
        .iter()
        .rev()
        .fold(handler, |inner, middleware| middleware.wrap(inner))
}
