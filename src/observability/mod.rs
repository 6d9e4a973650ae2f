//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle phases, hooks, tests, host server produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (phase counters, hook timings, test outcomes)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every lifecycle event (server name, phase, counts)
//! - Metric updates are no-ops until a recorder is installed
//! - Diagnostics never affect lifecycle success or failure

pub mod logging;
pub mod metrics;
