//! Built-in API surface.
//!
//! Route ids are stable across versions and are what `routing.legacy_routes`
//! and `routing.disabled_routes` refer to.

pub mod system;

use axum::http::Method;

use crate::http::handler::Handler;
use crate::routing::{RawRoute, Route, RouteId, RouteSet};
use crate::security::PRIV_LEVEL_READ_ONLY;

pub const PING_ROUTE_ID: RouteId = 1;
pub const SYSTEM_INFO_ROUTE_ID: RouteId = 2;
pub const ECHO_ROUTE_ID: RouteId = 3;
pub const ABOUT_ROUTE_ID: RouteId = 4;

/// Every built-in route, in registration order.
pub fn declarations() -> RouteSet {
    RouteSet {
        routes: vec![
            Route::new(1.1, Method::GET, "ping$", Handler::new(system::ping), PING_ROUTE_ID)
                .bypassable(),
            Route::new(
                1.1,
                Method::GET,
                "system/info$",
                Handler::new(system::system_info),
                SYSTEM_INFO_ROUTE_ID,
            )
            .authenticated(PRIV_LEVEL_READ_ONLY),
            Route::new(
                1.2,
                Method::GET,
                "echo/{message}$",
                Handler::new(system::echo),
                ECHO_ROUTE_ID,
            ),
            Route::new(2.0, Method::GET, "about$", Handler::new(system::about), ABOUT_ROUTE_ID)
                .bypassable(),
        ],
        raw_routes: vec![RawRoute::new(
            Method::GET,
            "^healthz$",
            Handler::new(system::healthz),
        )],
    }
}
