//! Request-scoped data.
//!
//! # Responsibilities
//! - Allocate request ids (shared atomic counter)
//! - Carry the request context: id, storage handle, configuration, path params
//!
//! # Design Decisions
//! - The allocator is the only mutable state shared across requests
//! - The context is a typed struct stored as a request extension, not a
//!   key/value bag

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;

use crate::config::AppConfig;

/// Issues increasing request identifiers, starting at 1.
///
/// Safe to call from any number of tasks at once. Ids are unique until the
/// counter wraps after `u64::MAX` allocations.
#[derive(Debug, Default)]
pub struct RequestIdAllocator {
    last: AtomicU64,
}

impl RequestIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> u64 {
        self.last.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }
}

/// Opaque handle to the persistent storage layer.
///
/// The router never looks inside; handlers recover the concrete type with
/// [`StorageHandle::downcast_ref`].
#[derive(Clone)]
pub struct StorageHandle(Arc<dyn Any + Send + Sync>);

impl StorageHandle {
    pub fn new<T: Any + Send + Sync>(storage: T) -> Self {
        Self(Arc::new(storage))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for StorageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StorageHandle")
    }
}

/// Everything a handler may need about the request being served.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: u64,
    pub storage: Option<StorageHandle>,
    pub config: Arc<AppConfig>,
    pub path_params: HashMap<String, String>,
}

impl RequestContext {
    pub fn new(request_id: u64, storage: Option<StorageHandle>, config: Arc<AppConfig>) -> Self {
        Self {
            request_id,
            storage,
            config,
            path_params: HashMap::new(),
        }
    }

    /// The context the dispatcher attached to `req`.
    pub fn of(req: &Request<Body>) -> Option<&RequestContext> {
        req.extensions().get::<RequestContext>()
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }
}
