//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Build descriptor → Announce → Spawn registrars
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM/SIGHUP/SIGQUIT → single shutdown trigger
//!
//! Shutdown (shutdown.rs):
//!     Trigger → stop HTTP server → stop registrars + revoke announcement
//!     → bounded wait → Exit(0)
//!
//! Handles (handle.rs):
//!     one-shot stop + acknowledgment per background unit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config, descriptor and listener first, then registration
//! - Shutdown has a deadline: exit after the grace period regardless

pub mod handle;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use handle::{stop_channel, StopHandle};
pub use shutdown::{Shutdown, ShutdownCoordinator, ShutdownReport, Withdrawal};
pub use signals::TerminationSignals;
