//! Route declarations.
//!
//! Routes are declared once at startup, usually as a single list in
//! registration order. Order matters: the first matching route wins.

use std::fmt;

use axum::http::Method;

use crate::http::handler::{Handler, Middleware};
use crate::routing::version::ApiVersion;
use crate::security::PrivLevel;

/// Identifier joining a route to the configured legacy/disabled id lists.
///
/// Stays the same across versions of the same logical endpoint.
pub type RouteId = u64;

/// A versioned endpoint, mounted under `api/<version>/`.
#[derive(Debug, Clone)]
pub struct Route {
    pub version: ApiVersion,
    pub method: Method,
    /// Template relative to the version prefix, e.g. `servers/{id}$`.
    pub path: String,
    pub handler: Handler,
    pub required_priv_level: PrivLevel,
    pub authenticated: bool,
    /// Replaces the default middleware chain when set.
    pub middlewares: Option<Vec<Middleware>>,
    pub id: RouteId,
    /// Whether forwarding this route to the legacy backend is safe.
    /// Informational; the configured id list decides.
    pub can_bypass_to_legacy: bool,
}

impl Route {
    /// An unauthenticated route using the default middleware chain.
    pub fn new(
        version: f64,
        method: Method,
        path: impl Into<String>,
        handler: Handler,
        id: RouteId,
    ) -> Self {
        Self {
            version: ApiVersion::new(version),
            method,
            path: path.into(),
            handler,
            required_priv_level: 0,
            authenticated: false,
            middlewares: None,
            id,
            can_bypass_to_legacy: false,
        }
    }

    /// Require a valid token carrying at least `priv_level`.
    pub fn authenticated(mut self, priv_level: PrivLevel) -> Self {
        self.authenticated = true;
        self.required_priv_level = priv_level;
        self
    }

    pub fn with_middlewares(mut self, middlewares: Vec<Middleware>) -> Self {
        self.middlewares = Some(middlewares);
        self
    }

    pub fn bypassable(mut self) -> Self {
        self.can_bypass_to_legacy = true;
        self
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id={} method={} version={:.1} path={} can_bypass_to_legacy={}",
            self.id,
            self.method,
            self.version.value(),
            self.path,
            self.can_bypass_to_legacy
        )
    }
}

/// An endpoint served at its literal path, outside the versioned API.
#[derive(Debug, Clone)]
pub struct RawRoute {
    pub method: Method,
    /// Pattern matched against the request path without its leading `/`.
    pub path: String,
    pub handler: Handler,
    pub required_priv_level: PrivLevel,
    pub authenticated: bool,
    pub middlewares: Option<Vec<Middleware>>,
}

impl RawRoute {
    pub fn new(method: Method, path: impl Into<String>, handler: Handler) -> Self {
        Self {
            method,
            path: path.into(),
            handler,
            required_priv_level: 0,
            authenticated: false,
            middlewares: None,
        }
    }

    pub fn authenticated(mut self, priv_level: PrivLevel) -> Self {
        self.authenticated = true;
        self.required_priv_level = priv_level;
        self
    }

    pub fn with_middlewares(mut self, middlewares: Vec<Middleware>) -> Self {
        self.middlewares = Some(middlewares);
        self
    }
}

/// The full set of declarations a dispatcher is built from.
#[derive(Debug, Clone, Default)]
pub struct RouteSet {
    pub routes: Vec<Route>,
    pub raw_routes: Vec<RawRoute>,
}
