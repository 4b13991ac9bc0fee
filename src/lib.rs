//! Versioned HTTP API router.
//!
//! Routes are declared once per logical endpoint and version, expanded
//! across later minor versions, wrapped in middleware and matched first to
//! last. Individual routes can be disabled or handed to a legacy backend by
//! id through configuration, and configuration reloads swap the whole route
//! table atomically.

pub mod api;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod plugin;
pub mod routing;
pub mod security;

pub use config::AppConfig;
pub use http::{ApiServer, ServerError};
pub use lifecycle::Shutdown;
pub use routing::{RawRoute, Route, RouteSet};
