//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router, trace + body limit layers)
//!     → [routing::Dispatcher picks a handler]
//!     → middleware/ (access log, timeout, headers, panic recovery, auth)
//!     → handler.rs (route handler) or legacy.rs (legacy backend)
//!     → response.rs (envelope)
//!     → Send to client
//! ```

pub mod handler;
pub mod legacy;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use handler::{Handler, Middleware};
pub use request::{RequestContext, RequestIdAllocator, StorageHandle};
pub use server::{ApiServer, ServerError};
