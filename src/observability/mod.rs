//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Reactor, connections, worker tasks produce:
//!     → logging.rs (structured log events, request ids)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout via tracing-subscriber
//!     → Prometheus scrape (binary only)
//! ```

pub mod logging;
pub mod metrics;
