//! DNS-SD announcement of the catalog API.

use std::net::IpAddr;
use std::time::Duration;

use mdns_sd::{ServiceDaemon, ServiceInfo, UnregisterStatus};

use crate::config::CatalogConfig;
use crate::discovery::{AnnouncementError, DNSSD_SERVICE_TYPE};
use crate::lifecycle::handle::{stop_channel, StopHandle};

/// How long revocation waits for the responder to send its goodbye packets.
const UNREGISTER_WAIT: Duration = Duration::from_secs(1);

/// Outcome of revoking the announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revocation {
    Revoked,
    Failed(String),
}

/// Handle to the live announcement. Stopping it revokes the announcement.
pub type AnnouncementHandle = StopHandle<Revocation>;

/// Publishes this service once on the local network.
#[derive(Debug, Clone)]
pub struct DiscoveryAnnouncer {
    instance: String,
    host_name: String,
    port: u16,
    addrs: Vec<IpAddr>,
    txt: Vec<(String, String)>,
}

impl DiscoveryAnnouncer {
    pub fn from_config(config: &CatalogConfig) -> Self {
        // Wildcard binds advertise every interface address.
        let addrs = config
            .bind_addr
            .parse::<IpAddr>()
            .ok()
            .filter(|ip| !ip.is_unspecified())
            .into_iter()
            .collect();

        Self {
            instance: config.description.clone(),
            host_name: local_host_name(),
            port: config.bind_port,
            addrs,
            txt: vec![("uri".to_string(), config.api_location.clone())],
        }
    }

    /// TXT records published with the announcement.
    pub fn txt(&self) -> &[(String, String)] {
        &self.txt
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    /// Publish the announcement and return the handle that revokes it.
    pub fn start(self) -> Result<AnnouncementHandle, AnnouncementError> {
        let daemon = ServiceDaemon::new()?;
        let properties: Vec<(&str, &str)> = self
            .txt
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        let info = ServiceInfo::new(
            DNSSD_SERVICE_TYPE,
            &self.instance,
            &self.host_name,
            self.addrs.as_slice(),
            self.port,
            properties.as_slice(),
        )?
        .enable_addr_auto();
        let fullname = info.get_fullname().to_string();

        if let Err(e) = daemon.register(info) {
            let _ = daemon.shutdown();
            return Err(e.into());
        }

        tracing::info!(
            service_type = DNSSD_SERVICE_TYPE,
            instance = %self.instance,
            port = self.port,
            "Registered service via DNS-SD"
        );

        let (handle, signal, completion) = stop_channel("dnssd");
        tokio::spawn(async move {
            signal.await;
            completion.complete(revoke(daemon, fullname).await);
        });
        Ok(handle)
    }
}

async fn revoke(daemon: ServiceDaemon, fullname: String) -> Revocation {
    let result = tokio::task::spawn_blocking(move || {
        let outcome = match daemon.unregister(&fullname) {
            Ok(rx) => match rx.recv_timeout(UNREGISTER_WAIT) {
                Ok(UnregisterStatus::OK) => Revocation::Revoked,
                Ok(_) => Revocation::Failed("service was not registered".to_string()),
                Err(e) => Revocation::Failed(e.to_string()),
            },
            Err(e) => Revocation::Failed(e.to_string()),
        };
        let _ = daemon.shutdown();
        outcome
    })
    .await;

    let outcome = result.unwrap_or_else(|e| Revocation::Failed(e.to_string()));
    match &outcome {
        Revocation::Revoked => tracing::info!("DNS-SD announcement revoked"),
        Revocation::Failed(reason) => {
            tracing::warn!(reason = %reason, "Failed to revoke DNS-SD announcement")
        }
    }
    outcome
}

/// Host name used when the machine name cannot be read.
const FALLBACK_HOST: &str = "device-catalog";

fn local_host_name() -> String {
    let name = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read host name, using fallback");
            FALLBACK_HOST.to_string()
        });
    mdns_host_name(&name)
}

/// Qualify a machine name for the `.local.` mDNS domain.
fn mdns_host_name(name: &str) -> String {
    let name = name.trim_end_matches('.');
    let name = if name.is_empty() { FALLBACK_HOST } else { name };
    if name.ends_with(".local") {
        format!("{}.", name)
    } else {
        format!("{}.local.", name)
    }
}
