//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher, middleware, route table, reload loop:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
