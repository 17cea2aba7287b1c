//! Startup orchestration for the registration core.
//!
//! # Responsibilities
//! - Start the DNS-SD announcement when enabled
//! - Spawn one keepalive registrar per configured service catalog
//! - Hand every resulting handle to the shutdown coordinator
//!
//! # Design Decisions
//! - The descriptor is built (and validated) before any registrar starts
//! - Announcement failures degrade to "not discoverable", never abort startup

use std::time::Duration;

use crate::config::{CatalogConfig, ServiceCatalogConfig};
use crate::discovery::{AnnouncementHandle, CatalogResolver, DiscoveryAnnouncer};
use crate::lifecycle::shutdown::ShutdownCoordinator;
use crate::registration::{
    CatalogEndpoint, KeepaliveRegistrar, RegistrationDescriptor, RegistrationHandle, RemoteCatalog,
};
use crate::resilience::BackoffPolicy;

/// Publish the DNS-SD announcement if enabled.
pub fn start_announcer(config: &CatalogConfig) -> Option<AnnouncementHandle> {
    if !config.dnssd_enabled {
        return None;
    }
    match DiscoveryAnnouncer::from_config(config).start() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to register DNS-SD service");
            None
        }
    }
}

/// Spawn one keepalive registrar per configured service catalog.
pub fn start_registrars(
    config: &CatalogConfig,
    descriptor: &RegistrationDescriptor,
) -> Vec<RegistrationHandle> {
    if config.service_catalog.is_empty() {
        return Vec::new();
    }
    tracing::info!(
        targets = config.service_catalog.len(),
        "Will now register in the configured service catalogs"
    );

    let backoff = BackoffPolicy::from(&config.registration);
    let request_timeout = Duration::from_secs(config.registration.request_timeout_secs);
    let discovery_timeout = Duration::from_secs(config.registration.discovery_timeout_secs);

    config
        .service_catalog
        .iter()
        .map(|target| {
            let client = RemoteCatalog::new(endpoint_for(target, discovery_timeout), request_timeout);
            KeepaliveRegistrar::new(
                target.label(),
                client,
                descriptor.with_ttl(target.ttl()),
                backoff,
            )
            .spawn()
        })
        .collect()
}

fn endpoint_for(target: &ServiceCatalogConfig, discovery_timeout: Duration) -> CatalogEndpoint {
    if target.discover {
        CatalogEndpoint::Discovered(CatalogResolver::new(discovery_timeout))
    } else {
        CatalogEndpoint::Static(target.endpoint.clone())
    }
}

/// Start announcer and registrars and collect their handles in a coordinator.
pub fn start_registration(
    config: &CatalogConfig,
    descriptor: &RegistrationDescriptor,
    coordinator: &mut ShutdownCoordinator,
) {
    if let Some(handle) = start_announcer(config) {
        coordinator.set_announcement(handle);
    }
    for handle in start_registrars(config, descriptor) {
        coordinator.add_registration(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::shutdown::Shutdown;

    #[tokio::test]
    async fn test_no_targets_no_handles() {
        let config = CatalogConfig::default();
        let descriptor = RegistrationDescriptor::from_config(&config).unwrap();
        let mut coordinator = ShutdownCoordinator::new(Duration::from_secs(1), Shutdown::new());

        start_registration(&config, &descriptor, &mut coordinator);
        assert_eq!(coordinator.registration_count(), 0);
    }

    #[tokio::test]
    async fn test_one_handle_per_target() {
        let mut config = CatalogConfig::default();
        for port in [1, 2, 3] {
            config.service_catalog.push(ServiceCatalogConfig {
                // Nothing listens here; registrars just keep retrying.
                endpoint: format!("http://127.0.0.1:{}/sc", port),
                discover: false,
                ttl: 30,
            });
        }
        let descriptor = RegistrationDescriptor::from_config(&config).unwrap();

        let handles = start_registrars(&config, &descriptor);
        assert_eq!(handles.len(), 3);
        assert_eq!(handles[0].name(), "http://127.0.0.1:1/sc");
        for handle in handles {
            handle.stop();
        }
    }

    #[test]
    fn test_endpoint_for_discovered_target() {
        let target = ServiceCatalogConfig {
            endpoint: String::new(),
            discover: true,
            ttl: 30,
        };
        assert!(matches!(
            endpoint_for(&target, Duration::from_secs(1)),
            CatalogEndpoint::Discovered(_)
        ));
    }
}
