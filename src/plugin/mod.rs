//! Request plugins.
//!
//! Plugins see every request before routing and may answer it themselves.
//! They run in configured order; the first to return a response ends
//! dispatch for that request.
//!
//! # Design Decisions
//! - Plugins get the request head only; the body stays with the request
//! - Plugins are compiled in and enabled by name from config
//! - An unknown name is a startup error

use std::fmt;
use std::sync::Arc;

use axum::http::{request::Parts, Method};
use axum::response::Response;
use futures_util::future::BoxFuture;

use crate::http::request::RequestContext;
use crate::http::response;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PluginError {
    #[error("unknown plugin {0:?}")]
    Unknown(String),
}

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Return `Some` to answer the request and skip routing.
    fn on_request<'a>(
        &'a self,
        parts: &'a Parts,
        ctx: &'a RequestContext,
    ) -> BoxFuture<'a, Option<Response>>;
}

/// The enabled plugins, in invocation order.
#[derive(Clone, Default)]
pub struct Plugins(Vec<Arc<dyn Plugin>>);

impl Plugins {
    pub fn new(plugins: Vec<Arc<dyn Plugin>>) -> Self {
        Self(plugins)
    }

    /// Look up built-in plugins by name.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, PluginError> {
        names
            .iter()
            .map(|name| builtin(name.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|p| p.name())
    }

    pub async fn on_request(&self, parts: &Parts, ctx: &RequestContext) -> Option<Response> {
        for plugin in &self.0 {
            if let Some(response) = plugin.on_request(parts, ctx).await {
                tracing::debug!(
                    plugin = plugin.name(),
                    request_id = ctx.request_id,
                    "Request handled by plugin"
                );
                return Some(response);
            }
        }
        None
    }
}

impl fmt::Debug for Plugins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

fn builtin(name: &str) -> Result<Arc<dyn Plugin>, PluginError> {
    match name {
        HelloWorld::NAME => Ok(Arc::new(HelloWorld)),
        other => Err(PluginError::Unknown(other.to_string())),
    }
}

/// Answers `GET /_hello_world` with a greeting.
#[derive(Debug, Clone, Copy, Default)]
pub struct HelloWorld;

impl HelloWorld {
    pub const NAME: &'static str = "hello_world";
    pub const PATH: &'static str = "/_hello_world";
}

impl Plugin for HelloWorld {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn on_request<'a>(
        &'a self,
        parts: &'a Parts,
        ctx: &'a RequestContext,
    ) -> BoxFuture<'a, Option<Response>> {
        Box::pin(async move {
            if parts.method != Method::GET || parts.uri.path() != Self::PATH {
                return None;
            }
            Some(response::ok(serde_json::json!({
                "message": "Hello, World!",
                "request_id": ctx.request_id,
            })))
        })
    }
}
