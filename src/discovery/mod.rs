//! Local-network discovery (DNS-SD over multicast DNS).
//!
//! # Data Flow
//! ```text
//! Announce (announcer.rs):
//!     CatalogConfig → ServiceInfo(uri=<api location>) → mDNS responder
//!     → AnnouncementHandle (revoke: unregister + shut responder down)
//!
//! Browse (browse.rs):
//!     service catalog type → first resolved instance → catalog URL
//! ```
//!
//! # Design Decisions
//! - Announcement failures are non-fatal; the catalog simply stays undiscoverable
//! - Browsing uses a short-lived responder per lookup, bounded by a timeout

pub mod announcer;
pub mod browse;

use thiserror::Error;

pub use announcer::{AnnouncementHandle, DiscoveryAnnouncer, Revocation};
pub use browse::CatalogResolver;

/// DNS-SD type this device catalog announces itself under.
pub const DNSSD_SERVICE_TYPE: &str = "_patchwork-dc._tcp.local.";

/// DNS-SD type of the remote service catalogs.
pub const SERVICE_CATALOG_TYPE: &str = "_patchwork-sc._tcp.local.";

/// Failure to publish the DNS-SD announcement.
#[derive(Debug, Error)]
pub enum AnnouncementError {
    #[error("mDNS error: {0}")]
    Mdns(#[from] mdns_sd::Error),
}

/// Failure to find a catalog endpoint through DNS-SD.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("mDNS error: {0}")]
    Mdns(#[from] mdns_sd::Error),

    #[error("No '{service_type}' instance found within {wait:?}")]
    NotFound {
        service_type: String,
        wait: std::time::Duration,
    },

    #[error("Browse task failed: {0}")]
    Task(String),
}
