//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request pipeline:
//!     → http::middleware::RequestLog (one event per request, request ID span)
//!     → logging.rs (subscriber, filtering, formatting)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;
