//! Pacing for polling loops.
//!
//! Remote calls are never retried; backoff only spaces out receipt polls.

pub mod backoff;

pub use backoff::calculate_backoff;
