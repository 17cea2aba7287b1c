//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Failed registration attempt:
//!     → backoff.rs (exponential delay + jitter, capped)
//!     → registrar sleeps, then retries
//! ```
//!
//! # Design Decisions
//! - Jittered backoff prevents many instances hammering a recovering catalog
//! - Retry delays never exceed the renewal interval of the target

pub mod backoff;

pub use backoff::{calculate_backoff, BackoffPolicy};
