//! Middleware applied around route handlers.
//!
//! # Default chain (execution order)
//! ```text
//! access_log → timeout → standard_headers → panic_recover → [auth] → handler
//! ```
//!
//! # Design Decisions
//! - A route's own middleware list replaces the default chain entirely
//! - The auth wrapper is appended after either chain when the route is
//!   authenticated, so it runs closest to the handler
//! - Privilege level 0 still requires a valid token if the route is
//!   authenticated

pub mod access_log;
pub mod headers;
pub mod recover;
pub mod timeout;

use std::sync::Arc;
use std::time::Duration;

pub use access_log::{access_log, wrap_access_log};
pub use headers::standard_headers;
pub use recover::panic_recover;
pub use timeout::timeout;

use crate::http::handler::Middleware;
use crate::security::{Authenticator, PrivLevel};

/// Process-wide inputs for composing middleware chains.
#[derive(Clone)]
pub struct MiddlewareDefaults {
    pub primary_secret: Arc<str>,
    pub request_timeout: Duration,
    pub authenticator: Arc<dyn Authenticator>,
}

impl MiddlewareDefaults {
    pub fn default_chain(&self) -> Vec<Middleware> {
        vec![
            access_log(Arc::clone(&self.primary_secret)),
            timeout(self.request_timeout),
            standard_headers(),
            panic_recover(),
        ]
    }

    /// The chain for one route.
    pub fn route_chain(
        &self,
        overrides: Option<&[Middleware]>,
        authenticated: bool,
        required_priv_level: PrivLevel,
    ) -> Vec<Middleware> {
        let mut chain = match overrides {
            Some(list) => list.to_vec(),
            None => self.default_chain(),
        };
        if authenticated {
            chain.push(self.authenticator.wrapper(required_priv_level));
        }
        chain
    }
}
