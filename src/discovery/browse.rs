//! Resolving remote service catalogs through DNS-SD.

use std::collections::HashSet;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use mdns_sd::{ServiceDaemon, ServiceEvent};

use crate::discovery::{ResolveError, SERVICE_CATALOG_TYPE};

/// Looks up a catalog endpoint each time it is asked.
#[derive(Debug, Clone)]
pub struct CatalogResolver {
    service_type: String,
    wait: Duration,
}

impl CatalogResolver {
    pub fn new(wait: Duration) -> Self {
        Self {
            service_type: SERVICE_CATALOG_TYPE.to_string(),
            wait,
        }
    }

    /// Browse for the first catalog instance and return its API URL.
    pub async fn resolve(&self) -> Result<String, ResolveError> {
        let service_type = self.service_type.clone();
        let wait = self.wait;
        tokio::task::spawn_blocking(move || browse_once(&service_type, wait))
            .await
            .map_err(|e| ResolveError::Task(e.to_string()))?
    }
}

fn browse_once(service_type: &str, wait: Duration) -> Result<String, ResolveError> {
    let daemon = ServiceDaemon::new()?;
    let result = first_resolved(&daemon, service_type, wait);
    let _ = daemon.shutdown();
    result
}

fn first_resolved(daemon: &ServiceDaemon, service_type: &str, wait: Duration) -> Result<String, ResolveError> {
    let events = daemon.browse(service_type)?;
    let deadline = Instant::now() + wait;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match events.recv_timeout(remaining) {
            Ok(ServiceEvent::ServiceResolved(info)) => {
                let url = catalog_url(
                    info.get_property_val_str("uri"),
                    info.get_addresses(),
                    info.get_port(),
                );
                match url {
                    Some(url) => return Ok(url),
                    None => tracing::debug!(
                        instance = %info.get_fullname(),
                        "Resolved catalog has no usable address"
                    ),
                }
            }
            Ok(_) => continue,
            Err(_) => break,
        }
    }

    Err(ResolveError::NotFound {
        service_type: service_type.to_string(),
        wait,
    })
}

/// Build the catalog URL from an instance's TXT `uri`, addresses and port.
///
/// An absolute `uri` wins; otherwise it is treated as the API path on the
/// instance's address. IPv4 addresses are preferred.
pub fn catalog_url(uri: Option<&str>, addrs: &HashSet<IpAddr>, port: u16) -> Option<String> {
    let uri = uri.unwrap_or("");
    if uri.starts_with("http://") || uri.starts_with("https://") {
        return Some(uri.to_string());
    }

    let mut candidates: Vec<&IpAddr> = addrs.iter().collect();
    candidates.sort_by_key(|ip| (ip.is_ipv6(), **ip));
    let host = match candidates.first()? {
        IpAddr::V4(ip) => ip.to_string(),
        IpAddr::V6(ip) => format!("[{}]", ip),
    };

    let path = if uri.is_empty() || uri.starts_with('/') {
        uri.to_string()
    } else {
        format!("/{}", uri)
    };
    Some(format!("http://{}:{}{}", host, port, path))
}
