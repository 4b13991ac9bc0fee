//! Route table construction.
//!
//! # Data Flow
//! ```text
//! RouteSet (declaration order)
//!     → collect declared versions
//!     → expand each route across later minors of its major
//!     → classify by id: legacy bypass / disabled / own handler
//!     → wrap in middleware chain
//!     → compile path, append to per-method list
//! ```
//!
//! # Design Decisions
//! - Registration order is kept per method; dispatch takes the first match
//! - Bypass wins over disabled when an id is in both lists
//! - A bypassed route gets the legacy handler unwrapped; the proxy logs its
//!   own access lines
//! - The whole table is rebuilt on config reload and never mutated

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::http::Method;

use crate::http::handler::{apply, Handler};
use crate::http::middleware::{wrap_access_log, MiddlewareDefaults};
use crate::http::response;
use crate::routing::error::RouteError;
use crate::routing::matcher::CompiledRoute;
use crate::routing::route::{RouteId, RouteSet};
use crate::routing::version::VersionSet;

/// Inputs besides the declarations themselves.
#[derive(Clone)]
pub struct BuildOptions {
    pub legacy_route_ids: HashSet<RouteId>,
    pub disabled_route_ids: HashSet<RouteId>,
    pub legacy_handler: Option<Handler>,
    pub middleware: MiddlewareDefaults,
}

/// Compiled routes per method, in registration order.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<Method, Vec<CompiledRoute>>,
}

impl RouteTable {
    /// Build the table and the set of versions it serves.
    pub fn build(set: &RouteSet, options: &BuildOptions) -> Result<(Self, VersionSet), RouteError> {
        let versions: VersionSet = set.routes.iter().map(|r| r.version).collect();
        let mut table = Self::default();
        let mut bypassed = 0usize;
        let mut disabled = 0usize;

        for route in &set.routes {
            for version in versions.same_major_from(route.version) {
                let path = format!(
                    "^api/{}/{}",
                    regex::escape(&version.to_string()),
                    route.path
                );

                let handler = if options.legacy_route_ids.contains(&route.id) {
                    bypassed += 1;
                    options
                        .legacy_handler
                        .clone()
                        .ok_or(RouteError::NoLegacyHandler(route.id))?
                } else if options.disabled_route_ids.contains(&route.id) {
                    disabled += 1;
                    wrap_access_log(
                        Arc::clone(&options.middleware.primary_secret),
                        Handler::fixed(response::disabled_route),
                    )
                } else {
                    let chain = options.middleware.route_chain(
                        route.middlewares.as_deref(),
                        route.authenticated,
                        route.required_priv_level,
                    );
                    apply(route.handler.clone(), &chain)
                };

                tracing::debug!(
                    route_id = route.id,
                    method = %route.method,
                    path = %path,
                    "Mounted route"
                );
                table.push(route.method.clone(), CompiledRoute::new(&path, handler)?);
            }
        }

        for raw in &set.raw_routes {
            let chain = options.middleware.route_chain(
                raw.middlewares.as_deref(),
                raw.authenticated,
                raw.required_priv_level,
            );
            let handler = apply(raw.handler.clone(), &chain);
            tracing::debug!(method = %raw.method, path = %raw.path, "Mounted raw route");
            table.push(raw.method.clone(), CompiledRoute::new(&raw.path, handler)?);
        }

        tracing::info!(
            paths = table.len(),
            versions = versions.len(),
            bypassed,
            disabled,
            "Route table built"
        );

        Ok((table, versions))
    }

    fn push(&mut self, method: Method, route: CompiledRoute) {
        self.routes.entry(method).or_default().push(route);
    }

    /// Routes registered for `method`, or `None` if there are none.
    pub fn routes_for(&self, method: &Method) -> Option<&[CompiledRoute]> {
        self.routes.get(method).map(Vec::as_slice)
    }

    /// Total number of compiled paths across all methods.
    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::route::{RawRoute, Route};
    use crate::routing::version::ApiVersion;
    use crate::security::{
        sign_token, SignedTokenAuth, PRIV_LEVEL_OPERATIONS, PRIV_LEVEL_READ_ONLY,
    };
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use std::time::Duration;

    fn options() -> BuildOptions {
        BuildOptions {
            legacy_route_ids: HashSet::new(),
            disabled_route_ids: HashSet::new(),
            legacy_handler: None,
            middleware: MiddlewareDefaults {
                primary_secret: Arc::from("secret"),
                request_timeout: Duration::from_secs(5),
                authenticator: Arc::new(SignedTokenAuth::new(vec!["secret".into()])),
            },
        }
    }

    fn text(body: &'static str) -> Handler {
        Handler::new(move |_req| async move { body })
    }

    fn patterns(table: &RouteTable, method: &Method) -> Vec<String> {
        table
            .routes_for(method)
            .unwrap_or_default()
            .iter()
            .map(|r| r.pattern().as_str().to_string())
            .collect()
    }

    /// Body of the first route matching `path`.
    async fn first_match(table: &RouteTable, path: &str) -> Option<(StatusCode, String)> {
        call_first(table, path, Request::new(Body::empty())).await
    }

    async fn call_first(
        table: &RouteTable,
        path: &str,
        req: Request<Body>,
    ) -> Option<(StatusCode, String)> {
        let route = table
            .routes_for(&Method::GET)?
            .iter()
            .find(|r| r.captures(path).is_some())?;
        let res = route.handler().call(req).await;
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        Some((status, String::from_utf8(bytes.to_vec()).unwrap()))
    }

    fn set(routes: Vec<Route>) -> RouteSet {
        RouteSet {
            routes,
            raw_routes: Vec::new(),
        }
    }

    #[test]
    fn test_version_propagation_stays_within_major() {
        let routes = set(vec![
            Route::new(1.2, Method::GET, "things$", text("things"), 1),
            Route::new(1.3, Method::GET, "other$", text("other"), 2),
            Route::new(2.0, Method::GET, "about$", text("about"), 3),
        ]);
        let (table, versions) = RouteTable::build(&routes, &options()).unwrap();

        assert_eq!(
            versions.iter().collect::<Vec<_>>(),
            vec![ApiVersion::new(1.2), ApiVersion::new(1.3), ApiVersion::new(2.0)]
        );
        assert_eq!(
            patterns(&table, &Method::GET),
            vec![
                "^api/1\\.2/things$",
                "^api/1\\.3/things$",
                "^api/1\\.3/other$",
                "^api/2/about$",
            ]
        );
        assert_eq!(table.len(), 4);
    }

    #[tokio::test]
    async fn test_first_registered_wins() {
        let a = Route::new(1.1, Method::GET, "thing/{id}$", text("generic"), 1);
        let b = Route::new(1.1, Method::GET, "thing/special$", text("special"), 2);

        let (table, _) = RouteTable::build(&set(vec![a.clone(), b.clone()]), &options()).unwrap();
        let (_, body) = first_match(&table, "api/1.1/thing/special").await.unwrap();
        assert_eq!(body, "generic");

        let (table, _) = RouteTable::build(&set(vec![b, a]), &options()).unwrap();
        let (_, body) = first_match(&table, "api/1.1/thing/special").await.unwrap();
        assert_eq!(body, "special");
    }

    #[tokio::test]
    async fn test_bypass_takes_precedence_over_disabled() {
        let mut opts = options();
        opts.legacy_route_ids.insert(7);
        opts.disabled_route_ids.insert(7);
        opts.disabled_route_ids.insert(8);
        opts.legacy_handler = Some(text("legacy"));

        let routes = set(vec![
            Route::new(1.1, Method::GET, "bypassed$", text("own"), 7),
            Route::new(1.1, Method::GET, "disabled$", text("own"), 8),
            Route::new(1.1, Method::GET, "normal$", text("own"), 9),
        ]);
        let (table, _) = RouteTable::build(&routes, &opts).unwrap();

        let (status, body) = first_match(&table, "api/1.1/bypassed").await.unwrap();
        assert_eq!((status, body.as_str()), (StatusCode::OK, "legacy"));

        let (status, body) = first_match(&table, "api/1.1/disabled").await.unwrap();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains(response::DISABLED_ROUTE_TEXT));

        let (_, body) = first_match(&table, "api/1.1/normal").await.unwrap();
        assert_eq!(body, "own");
    }

    #[test]
    fn test_bypass_without_legacy_handler_fails() {
        let mut opts = options();
        opts.legacy_route_ids.insert(4);
        let routes = set(vec![Route::new(1.1, Method::GET, "x$", text("x"), 4)]);
        let err = RouteTable::build(&routes, &opts).unwrap_err();
        assert!(matches!(err, RouteError::NoLegacyHandler(4)));
    }

    #[test]
    fn test_raw_routes_mounted_verbatim() {
        let routes = RouteSet {
            routes: vec![Route::new(1.1, Method::GET, "ping$", text("pong"), 1)],
            raw_routes: vec![RawRoute::new(Method::POST, "^hooks/{name}$", text("hook"))],
        };
        let (table, versions) = RouteTable::build(&routes, &options()).unwrap();
        assert_eq!(patterns(&table, &Method::POST), vec!["^hooks/([^/]+)$"]);
        assert_eq!(versions.len(), 1);
        assert!(table.routes_for(&Method::DELETE).is_none());
    }

    #[test]
    fn test_malformed_template_fails_build() {
        let routes = set(vec![Route::new(1.1, Method::GET, "widget/{id$", text("w"), 1)]);
        assert!(matches!(
            RouteTable::build(&routes, &options()),
            Err(RouteError::UnclosedParam { .. })
        ));
    }

    #[tokio::test]
    async fn test_authenticated_routes_check_privilege() {
        let routes = set(vec![
            Route::new(1.1, Method::GET, "secure$", text("secure"), 1).authenticated(0),
            Route::new(1.1, Method::GET, "ops$", text("ops"), 2)
                .authenticated(PRIV_LEVEL_OPERATIONS)
                .with_middlewares(Vec::new()),
        ]);
        let (table, _) = RouteTable::build(&routes, &options()).unwrap();
        let reader = sign_token("secret", "reader", PRIV_LEVEL_READ_ONLY);
        let operator = sign_token("secret", "operator", PRIV_LEVEL_OPERATIONS);

        for (path, token, status) in [
            ("api/1.1/secure", None, StatusCode::UNAUTHORIZED),
            ("api/1.1/secure", Some(&reader), StatusCode::OK),
            ("api/1.1/ops", None, StatusCode::UNAUTHORIZED),
            ("api/1.1/ops", Some(&reader), StatusCode::FORBIDDEN),
            ("api/1.1/ops", Some(&operator), StatusCode::OK),
        ] {
            let mut req = Request::builder();
            if let Some(token) = token {
                req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let (got, _) = call_first(&table, path, req.body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(got, status, "{path} {token:?}");
        }
    }

    #[tokio::test]
    async fn test_version_is_matched_literally() {
        let routes = set(vec![Route::new(1.2, Method::GET, "things$", text("t"), 1)]);
        let (table, _) = RouteTable::build(&routes, &options()).unwrap();
        assert!(first_match(&table, "api/1.2/things").await.is_some());
        assert!(first_match(&table, "api/1x2/things").await.is_none());
    }
}
