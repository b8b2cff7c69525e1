//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every remote call and flow step produces:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty for terminals, JSON for log shipping)
//!     → whatever `metrics` recorder the embedding process installs
//! ```
//!
//! # Design Decisions
//! - Structured fields, never interpolated secrets
//! - One span per flow run, keyed by a UUID `run_id`

pub mod logging;
pub mod metrics;
