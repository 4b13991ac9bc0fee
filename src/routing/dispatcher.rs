//! Per-request dispatch.
//!
//! # Data Flow
//! ```text
//! Request
//!     → allocate request id, attach RequestContext
//!     → plugins (may answer and stop)
//!     → routes for method (none → catch-all)
//!     → first matching path wins, params bound into the context
//!     → no match: unknown API version → 501, else catch-all
//! ```
//!
//! # Design Decisions
//! - The dispatcher is immutable; a config reload builds a new one and
//!   swaps it in, so in-flight requests finish on the table they started on
//! - The request id allocator outlives dispatchers, keeping ids unique
//!   across reloads
//! - Path matching runs against the percent-decoded path without its
//!   leading `/`, so `%2F` separates segments; bytes that do not decode to
//!   UTF-8 become U+FFFD
//! - Catch-all and bypass handlers still see the request URI as received

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use futures_util::future::BoxFuture;
use percent_encoding::percent_decode_str;
use tower::Service;

use crate::config::AppConfig;
use crate::http::handler::Handler;
use crate::http::middleware::wrap_access_log;
use crate::http::request::{RequestContext, RequestIdAllocator, StorageHandle};
use crate::http::response;
use crate::observability::metrics;
use crate::plugin::Plugins;
use crate::routing::table::RouteTable;
use crate::routing::version::{ApiVersion, VersionSet};

/// How a request was resolved. Used as a metrics label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Plugin,
    Route,
    UnknownVersion,
    CatchAll,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Plugin => "plugin",
            Outcome::Route => "route",
            Outcome::UnknownVersion => "unknown_version",
            Outcome::CatchAll => "catch_all",
        }
    }
}

/// Whether `path` (no leading `/`) addresses the versioned API with a
/// version this server does not serve.
///
/// A missing or non-numeric version segment counts as unknown. Paths whose
/// first segment is not exactly `api` (ignoring case) are not API paths.
pub fn is_unknown_api_version(path: &str, versions: &VersionSet) -> bool {
    let mut segments = path.split('/');
    if !segments
        .next()
        .is_some_and(|first| first.eq_ignore_ascii_case("api"))
    {
        return false;
    }
    match segments.next().map(str::parse::<ApiVersion>) {
        Some(Ok(version)) => !versions.contains(version),
        Some(Err(_)) | None => true,
    }
}

/// The decoded request path, without its leading `/`.
fn request_path(raw: &str) -> String {
    let decoded = percent_decode_str(raw).decode_utf8_lossy();
    decoded.strip_prefix('/').unwrap_or(&decoded).to_string()
}

/// Logs the end of a request, including when the handler unwinds.
struct Handled {
    request_id: u64,
    method: Method,
    path: String,
    start: Instant,
    status: Option<u16>,
}

impl Drop for Handled {
    fn drop(&mut self) {
        tracing::info!(
            request_id = self.request_id,
            method = %self.method,
            path = %self.path,
            status = self.status,
            elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0,
            "handled"
        );
    }
}

/// Routes requests through one immutable route table.
pub struct Dispatcher {
    table: RouteTable,
    versions: VersionSet,
    catchall: Handler,
    not_implemented: Handler,
    plugins: Plugins,
    storage: Option<StorageHandle>,
    config: Arc<AppConfig>,
    request_ids: Arc<RequestIdAllocator>,
}

impl Dispatcher {
    /// A dispatcher whose catch-all answers 404 and which runs no plugins.
    /// `primary_secret` keys the access log user lookup of the fallback
    /// handlers.
    pub fn new(
        table: RouteTable,
        versions: VersionSet,
        primary_secret: Arc<str>,
        config: Arc<AppConfig>,
        request_ids: Arc<RequestIdAllocator>,
    ) -> Self {
        Self {
            table,
            versions,
            catchall: wrap_access_log(
                Arc::clone(&primary_secret),
                Handler::fixed(response::not_found),
            ),
            not_implemented: wrap_access_log(
                primary_secret,
                Handler::fixed(response::unknown_version),
            ),
            plugins: Plugins::default(),
            storage: None,
            config,
            request_ids,
        }
    }

    /// Receives every request no route claims. It gets the original request.
    pub fn with_catchall(mut self, catchall: Handler) -> Self {
        self.catchall = catchall;
        self
    }

    pub fn with_plugins(mut self, plugins: Plugins) -> Self {
        self.plugins = plugins;
        self
    }

    pub fn with_storage(mut self, storage: Option<StorageHandle>) -> Self {
        self.storage = storage;
        self
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn versions(&self) -> &VersionSet {
        &self.versions
    }

    pub fn config(&self) -> &Arc<AppConfig> {
        &self.config
    }

    pub async fn dispatch(&self, req: Request<Body>) -> Response {
        let request_id = self.request_ids.next_id();
        let start = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        tracing::info!(
            request_id,
            method = %method,
            path = %path,
            query = req.uri().query().unwrap_or_default(),
            "handling"
        );
        let mut handled = Handled {
            request_id,
            method: method.clone(),
            path,
            start,
            status: None,
        };

        let ctx = RequestContext::new(request_id, self.storage.clone(), Arc::clone(&self.config));
        let (outcome, response) = self.resolve(req, ctx).await;

        let status = response.status().as_u16();
        handled.status = Some(status);
        metrics::record_request(method.as_str(), status, outcome.as_str(), start);
        response
    }

    async fn resolve(&self, req: Request<Body>, mut ctx: RequestContext) -> (Outcome, Response) {
        let (parts, body) = req.into_parts();
        if let Some(response) = self.plugins.on_request(&parts, &ctx).await {
            return (Outcome::Plugin, response);
        }
        let mut req = Request::from_parts(parts, body);

        let Some(routes) = self.table.routes_for(req.method()) else {
            req.extensions_mut().insert(ctx);
            return (Outcome::CatchAll, self.catchall.call(req).await);
        };

        let requested = request_path(req.uri().path());

        for route in routes {
            if let Some(params) = route.captures(&requested) {
                ctx.path_params = params;
                req.extensions_mut().insert(ctx);
                return (Outcome::Route, route.handler().call(req).await);
            }
        }

        req.extensions_mut().insert(ctx);
        if is_unknown_api_version(&requested, &self.versions) {
            (Outcome::UnknownVersion, self.not_implemented.call(req).await)
        } else {
            (Outcome::CatchAll, self.catchall.call(req).await)
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("paths", &self.table.len())
            .field("versions", &self.versions)
            .field("plugins", &self.plugins)
            .finish_non_exhaustive()
    }
}

/// Tower service over the live dispatcher. Cloning shares the swap slot.
#[derive(Clone, Debug)]
pub struct DispatchService {
    current: Arc<ArcSwap<Dispatcher>>,
}

impl DispatchService {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(dispatcher)),
        }
    }

    /// Replace the dispatcher for all subsequent requests.
    pub fn swap(&self, dispatcher: Dispatcher) {
        self.current.store(Arc::new(dispatcher));
    }

    pub fn current(&self) -> Arc<Dispatcher> {
        self.current.load_full()
    }
}

impl Service<Request<Body>> for DispatchService {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let dispatcher = self.current.load_full();
        Box::pin(async move { Ok(dispatcher.dispatch(req).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::middleware::MiddlewareDefaults;
    use crate::plugin::{HelloWorld, Plugin};
    use crate::routing::route::{Route, RouteSet};
    use crate::routing::table::BuildOptions;
    use crate::security::SignedTokenAuth;
    use axum::http::request::Parts;
    use axum::http::StatusCode;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    fn versions(list: &[f64]) -> VersionSet {
        list.iter().copied().map(ApiVersion::new).collect()
    }

    fn dispatcher(routes: Vec<Route>) -> Dispatcher {
        let config = Arc::new(AppConfig {
            secrets: vec!["secret".into()],
            ..AppConfig::default()
        });
        let options = BuildOptions {
            legacy_route_ids: HashSet::new(),
            disabled_route_ids: HashSet::new(),
            legacy_handler: None,
            middleware: MiddlewareDefaults {
                primary_secret: Arc::from("secret"),
                request_timeout: Duration::from_secs(5),
                authenticator: Arc::new(SignedTokenAuth::new(config.secrets.clone())),
            },
        };
        let set = RouteSet {
            routes,
            raw_routes: Vec::new(),
        };
        let (table, versions) = RouteTable::build(&set, &options).unwrap();
        Dispatcher::new(
            table,
            versions,
            Arc::from("secret"),
            config,
            Arc::new(RequestIdAllocator::new()),
        )
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_string(res: Response) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn echo_param() -> Route {
        Route::new(
            1.1,
            Method::GET,
            "widget/{id}/part/{partId}$",
            Handler::new(|req: Request<Body>| async move {
                let ctx = RequestContext::of(&req).cloned().unwrap();
                format!(
                    "{}:{}:{}",
                    ctx.request_id,
                    ctx.param("id").unwrap_or("-"),
                    ctx.param("partId").unwrap_or("-")
                )
            }),
            1,
        )
    }

    #[test]
    fn test_unknown_version_classification() {
        let known = versions(&[1.1, 2.0]);
        assert!(is_unknown_api_version("api/9.9/foo", &known));
        assert!(is_unknown_api_version("api", &known));
        assert!(is_unknown_api_version("API/foo", &known));
        assert!(is_unknown_api_version("api/", &known));
        assert!(!is_unknown_api_version("api/1.1/foo", &known));
        assert!(!is_unknown_api_version("api/2.0/foo", &known));
        assert!(!is_unknown_api_version("api/2/foo", &known));
        assert!(!is_unknown_api_version("apifoo", &known));
        assert!(!is_unknown_api_version("healthz", &known));
    }

    #[tokio::test]
    async fn test_params_and_request_id_reach_handler() {
        let d = dispatcher(vec![echo_param()]);
        let res = d.dispatch(get("/api/1.1/widget/42/part/7")).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_string(res).await, "1:42:7");

        let res = d.dispatch(get("/api/1.1/widget/9/part/3")).await;
        assert_eq!(body_string(res).await, "2:9:3");
    }

    #[tokio::test]
    async fn test_unknown_version_gets_501() {
        let d = dispatcher(vec![echo_param()]);
        let res = d.dispatch(get("/api/9.9/foo")).await;
        assert_eq!(res.status(), StatusCode::NOT_IMPLEMENTED);
        assert!(body_string(res).await.contains("not implemented"));
    }

    #[tokio::test]
    async fn test_non_api_miss_falls_to_catchall() {
        let d = dispatcher(vec![echo_param()]);
        assert_eq!(d.dispatch(get("/apifoo")).await.status(), StatusCode::NOT_FOUND);
        // Known version, unknown path.
        assert_eq!(
            d.dispatch(get("/api/1.1/nothing")).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_method_without_routes_goes_to_catchall() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let d = dispatcher(vec![echo_param()]).with_catchall(Handler::new(move |req: Request<Body>| {
            counter.fetch_add(1, Ordering::SeqCst);
            let has_ctx = RequestContext::of(&req).is_some();
            let path = req.uri().path().to_string();
            async move { format!("{has_ctx} {path}") }
        }));

        let req = Request::builder()
            .method(Method::DELETE)
            .uri("/api/9.9/foo")
            .body(Body::empty())
            .unwrap();
        let res = d.dispatch(req).await;
        assert_eq!(body_string(res).await, "true /api/9.9/foo");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    struct Counting(Arc<AtomicUsize>);

    impl Plugin for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn on_request<'a>(
            &'a self,
            _parts: &'a Parts,
            ctx: &'a RequestContext,
        ) -> BoxFuture<'a, Option<Response>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            assert!(ctx.path_params.is_empty());
            Box::pin(async { None })
        }
    }

    #[tokio::test]
    async fn test_plugin_short_circuits_routing() {
        let seen = Arc::new(AtomicUsize::new(0));
        let catchall_hits = Arc::new(AtomicUsize::new(0));
        let hits = catchall_hits.clone();
        let d = dispatcher(vec![echo_param()])
            .with_plugins(Plugins::new(vec![
                Arc::new(Counting(seen.clone())),
                Arc::new(HelloWorld),
            ]))
            .with_catchall(Handler::new(move |_req| {
                hits.fetch_add(1, Ordering::SeqCst);
                async { "catchall" }
            }));

        let res = d.dispatch(get("/_hello_world")).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_string(res).await.contains("Hello, World!"));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(catchall_hits.load(Ordering::SeqCst), 0);
    }

    fn echo_message() -> Route {
        Route::new(
            1.2,
            Method::GET,
            "echo/{message}$",
            Handler::new(|req: Request<Body>| async move {
                let ctx = RequestContext::of(&req).cloned().unwrap();
                ctx.param("message").unwrap_or("-").to_string()
            }),
            3,
        )
    }

    #[test]
    fn test_request_path_is_decoded() {
        assert_eq!(request_path("/api/1.2/echo/hello%20world"), "api/1.2/echo/hello world");
        assert_eq!(request_path("/api/1.2/echo/a%2Fb"), "api/1.2/echo/a/b");
        assert_eq!(request_path("/api/%31.2/echo"), "api/1.2/echo");
        assert_eq!(request_path("/caf%C3%A9"), "café");
        assert_eq!(request_path("/bad%FF"), "bad\u{FFFD}");
        // A stray `%` is kept as is.
        assert_eq!(request_path("/100%"), "100%");
    }

    #[tokio::test]
    async fn test_params_are_decoded() {
        let d = dispatcher(vec![echo_message()]);
        let res = d.dispatch(get("/api/1.2/echo/hello%20world")).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_string(res).await, "hello world");
    }

    #[tokio::test]
    async fn test_encoded_slash_splits_segments() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let d = dispatcher(vec![echo_message()]).with_catchall(Handler::new(move |req: Request<Body>| {
            counter.fetch_add(1, Ordering::SeqCst);
            let path = req.uri().path().to_string();
            async move { (StatusCode::NOT_FOUND, path) }
        }));

        // Decodes to `echo/a/b`, which the template rejects. 1.2 is served,
        // so the miss is a 404 rather than a 501.
        let res = d.dispatch(get("/api/1.2/echo/a%2Fb")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(res).await, "/api/1.2/echo/a%2Fb");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // The version segment is decoded before classification too.
        let res = d.dispatch(get("/api/%31.2/echo/x")).await;
        assert_eq!(body_string(res).await, "x");
        let res = d.dispatch(get("/api/9%2E9/echo/x")).await;
        assert_eq!(res.status(), StatusCode::NOT_IMPLEMENTED);
    }

    /// Answers every request for one path.
    struct Claim(&'static str);

    impl Plugin for Claim {
        fn name(&self) -> &str {
            "claim"
        }

        fn on_request<'a>(
            &'a self,
            parts: &'a Parts,
            _ctx: &'a RequestContext,
        ) -> BoxFuture<'a, Option<Response>> {
            Box::pin(async move {
                (parts.uri.path() == self.0).then(|| response::ok("claimed"))
            })
        }
    }

    #[tokio::test]
    async fn test_plugin_claims_routed_path() {
        let route_hits = Arc::new(AtomicUsize::new(0));
        let catchall_hits = Arc::new(AtomicUsize::new(0));
        let (routed, caught) = (route_hits.clone(), catchall_hits.clone());
        let route = Route::new(
            1.1,
            Method::GET,
            "widget/{id}/part/{partId}$",
            Handler::new(move |_req| {
                routed.fetch_add(1, Ordering::SeqCst);
                async { "route" }
            }),
            1,
        );
        let d = dispatcher(vec![route])
            .with_plugins(Plugins::new(vec![Arc::new(Claim("/api/1.1/widget/1/part/2"))]))
            .with_catchall(Handler::new(move |_req| {
                caught.fetch_add(1, Ordering::SeqCst);
                async { "catchall" }
            }));

        let res = d.dispatch(get("/api/1.1/widget/1/part/2")).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_string(res).await.contains("claimed"));
        assert_eq!(route_hits.load(Ordering::SeqCst), 0);
        assert_eq!(catchall_hits.load(Ordering::SeqCst), 0);

        // Paths the plugin passes on still reach the route.
        let res = d.dispatch(get("/api/1.1/widget/1/part/3")).await;
        assert_eq!(body_string(res).await, "route");
        assert_eq!(route_hits.load(Ordering::SeqCst), 1);
        assert_eq!(catchall_hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_service_uses_swapped_dispatcher() {
        // No GET routes at all: everything goes to the catch-all.
        let service = DispatchService::new(dispatcher(Vec::new()));
        let res = service.clone().oneshot(get("/api/1.1/widget/1/part/2")).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        service.swap(dispatcher(vec![echo_param()]));
        let res = service.clone().oneshot(get("/api/1.1/widget/1/part/2")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(service.current().table().len(), 1);
    }
}
