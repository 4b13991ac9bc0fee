//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup and on every config reload):
//!     RouteSet (route.rs, declaration order)
//!     → table.rs (expand versions, classify bypass/disabled, wrap middleware)
//!     → matcher.rs (compile path templates)
//!     → Dispatcher (immutable, swapped atomically)
//!
//! Incoming Request:
//!     → dispatcher.rs (plugins, first match, unknown-version check)
//!     → matched handler or catch-all
//! ```
//!
//! # Design Decisions
//! - Routes compiled up front, immutable at runtime
//! - First match wins, in registration order
//! - Malformed templates fail construction, never a request

pub mod dispatcher;
pub mod error;
pub mod matcher;
pub mod route;
pub mod table;
pub mod version;

pub use dispatcher::{is_unknown_api_version, DispatchService, Dispatcher, Outcome};
pub use error::RouteError;
pub use matcher::{CompiledRoute, PathPattern};
pub use route::{RawRoute, Route, RouteId, RouteSet};
pub use table::{BuildOptions, RouteTable};
pub use version::{ApiVersion, VersionSet};
