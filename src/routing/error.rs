//! Route table construction errors.
//!
//! All of these are startup failures: the server refuses to serve with a
//! table it could not build.

use crate::routing::RouteId;

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("malformed route {template:?}: '{{' at byte {position} is never closed")]
    UnclosedParam { template: String, position: usize },

    #[error("route {template:?} does not compile: {source}")]
    InvalidPattern {
        template: String,
        #[source]
        source: regex::Error,
    },

    #[error("route id {0} is marked for the legacy backend but no legacy handler is configured")]
    NoLegacyHandler(RouteId),
}
