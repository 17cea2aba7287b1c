//! Self-registration in remote service catalogs.
//!
//! # Data Flow
//! ```text
//! CatalogConfig
//!     → descriptor.rs (RegistrationDescriptor, built once)
//!     → per target: descriptor.with_ttl(target.ttl)
//!     → registrar.rs (one keepalive task per target)
//!         → client.rs (HTTP register / renew / deregister)
//!     → RegistrationHandle returned to the shutdown coordinator
//! ```
//!
//! # Design Decisions
//! - Registration failures are never fatal; they are logged and retried
//! - Targets share no state; each registrar owns its client and descriptor
//! - The remote TTL is the only authority on liveness

pub mod client;
pub mod descriptor;
pub mod registrar;
pub mod types;

pub use client::{CatalogClient, CatalogEndpoint, RemoteCatalog};
pub use descriptor::RegistrationDescriptor;
pub use registrar::{renewal_interval, KeepaliveRegistrar, RegistrationHandle};
pub use types::{Deregistration, RegistrationError, RegistrationState};
