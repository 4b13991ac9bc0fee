//! Built-in system endpoints.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde::Serialize;

use crate::http::request::RequestContext;
use crate::http::response;
use crate::security::CurrentUser;

#[derive(Serialize)]
pub struct Pong {
    pub ping: &'static str,
}

#[derive(Serialize)]
pub struct SystemInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub request_id: u64,
    pub user: Option<String>,
    pub request_timeout_secs: u64,
    pub legacy_backend: Option<String>,
}

#[derive(Serialize)]
pub struct Echo {
    pub message: String,
}

#[derive(Serialize)]
pub struct About {
    pub name: &'static str,
    pub version: &'static str,
    pub api_major: u32,
}

#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
}

/// Context is attached by the dispatcher for every routed request.
fn context(req: &Request<Body>) -> Result<&RequestContext, Response> {
    RequestContext::of(req).ok_or_else(|| {
        tracing::error!(path = %req.uri().path(), "Request reached handler without context");
        response::internal_error()
    })
}

pub async fn ping(_req: Request<Body>) -> Response {
    response::ok(Pong { ping: "pong" })
}

pub async fn system_info(req: Request<Body>) -> Response {
    let ctx = match context(&req) {
        Ok(ctx) => ctx,
        Err(res) => return res,
    };
    response::ok(SystemInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        request_id: ctx.request_id,
        user: req.extensions().get::<CurrentUser>().map(|u| u.username.clone()),
        request_timeout_secs: ctx.config.request_timeout().as_secs(),
        legacy_backend: ctx.config.legacy.url.clone(),
    })
}

pub async fn echo(req: Request<Body>) -> Response {
    let ctx = match context(&req) {
        Ok(ctx) => ctx,
        Err(res) => return res,
    };
    match ctx.param("message") {
        Some(message) => response::ok(Echo {
            message: message.to_string(),
        }),
        None => response::error(StatusCode::BAD_REQUEST, "missing message"),
    }
}

pub async fn about(_req: Request<Body>) -> Response {
    response::ok(About {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        api_major: 2,
    })
}

pub async fn healthz(_req: Request<Body>) -> Response {
    response::ok(Health { status: "ok" })
}
