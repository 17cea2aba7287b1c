//! Device catalog with self-registration.
//!
//! Serves the catalog API over HTTP, announces itself via DNS-SD and keeps a
//! renewable registration alive in every configured remote service catalog,
//! withdrawing all of them on shutdown.

pub mod config;
pub mod discovery;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod registration;
pub mod resilience;

pub use config::CatalogConfig;
pub use http::HttpServer;
pub use lifecycle::{Shutdown, ShutdownCoordinator};
pub use registration::{KeepaliveRegistrar, RegistrationDescriptor};
