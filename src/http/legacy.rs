//! Forwarding to the legacy backend.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the configured legacy base URL
//! - Forward method, path, query, headers and body unchanged
//! - Stream the upstream response back
//!
//! # Design Decisions
//! - Bypassed routes use this handler as is; it logs its own access lines
//! - Upstream connection failures map to 502, a stalled upstream to 504
//! - `Host` is dropped so the client derives it from the backend URI

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode, Uri};
use axum::response::Response;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use url::Url;

use crate::http::handler::Handler;
use crate::http::middleware::wrap_access_log;
use crate::http::response;

/// Client for the legacy system.
#[derive(Clone)]
pub struct LegacyProxy {
    client: Client<HttpConnector, Body>,
    base: Arc<Url>,
    timeout: Duration,
}

impl LegacyProxy {
    pub fn new(base: Url, timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            base: Arc::new(base),
            timeout,
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// The forwarding handler, wrapped in access logging.
    pub fn handler(&self, secret: impl Into<Arc<str>>) -> Handler {
        let proxy = self.clone();
        wrap_access_log(
            secret,
            Handler::new(move |req| {
                let proxy = proxy.clone();
                async move { proxy.forward(req).await }
            }),
        )
    }

    fn upstream_uri(&self, req: &Request<Body>) -> Result<Uri, axum::http::uri::InvalidUri> {
        let path_and_query = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        format!("{}{}", self.base.as_str().trim_end_matches('/'), path_and_query).parse()
    }

    pub async fn forward(&self, req: Request<Body>) -> Response {
        let uri = match self.upstream_uri(&req) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(error = %e, path = %req.uri().path(), "Cannot build legacy URI");
                return response::error(StatusCode::BAD_GATEWAY, "Upstream request failed");
            }
        };

        let (mut parts, body) = req.into_parts();
        parts.headers.remove(header::HOST);
        parts.uri = uri;
        let upstream = Request::from_parts(parts, body);
        let target = upstream.uri().to_string();

        match tokio::time::timeout(self.timeout, self.client.request(upstream)).await {
            Ok(Ok(res)) => into_response(res),
            Ok(Err(e)) => {
                tracing::error!(target_uri = %target, error = %e, "Legacy upstream error");
                response::error(StatusCode::BAD_GATEWAY, "Upstream request failed")
            }
            Err(_) => {
                tracing::warn!(target_uri = %target, timeout = ?self.timeout, "Legacy upstream timed out");
                response::error(StatusCode::GATEWAY_TIMEOUT, "Upstream request timed out")
            }
        }
    }
}

fn into_response(res: hyper::Response<hyper::body::Incoming>) -> Response {
    let (parts, body) = res.into_parts();
    Response::from_parts(parts, Body::new(body))
}
