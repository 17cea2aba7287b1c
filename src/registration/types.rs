//! Registration states and error definitions.

use std::fmt;

use thiserror::Error;

use crate::discovery::ResolveError;

/// Errors from a single registration, renewal or deregistration attempt.
///
/// Never fatal: the registrar logs them and keeps its schedule.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Catalog could not be reached or the request failed in transit.
    #[error("Catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Catalog answered with an unexpected status.
    #[error("Catalog returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Request did not complete in time.
    #[error("Catalog request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Catalog endpoint could not be discovered.
    #[error("Catalog endpoint unavailable: {0}")]
    Resolve(#[from] ResolveError),

    /// Endpoint is not a usable URL.
    #[error("Invalid catalog endpoint '{0}'")]
    InvalidEndpoint(String),
}

/// Result type for catalog operations.
pub type RegistrationResult<T> = Result<T, RegistrationError>;

/// Keepalive registrar state.
///
/// ```text
/// Unregistered → Registered → Renewing → Registered ...
///       │             │           │
///       └─────────────┴───────────┴──→ Stopping → Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Unregistered,
    Registered,
    Renewing,
    Stopping,
    Stopped,
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RegistrationState::Unregistered => "unregistered",
            RegistrationState::Registered => "registered",
            RegistrationState::Renewing => "renewing",
            RegistrationState::Stopping => "stopping",
            RegistrationState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Outcome of the single deregistration attempt made on stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deregistration {
    /// Catalog confirmed removal.
    Removed,
    /// Attempt failed; the entry lapses on its own once the TTL expires.
    Failed(String),
}
