//! Registration descriptor built from static configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use url::Url;

use crate::config::{CatalogConfig, ConfigError};
use crate::discovery::DNSSD_SERVICE_TYPE;

/// Name this service registers under.
pub const SERVICE_NAME: &str = "DeviceCatalog";

/// Version of the catalog API advertised in metadata.
pub const API_VERSION: &str = "0.2.1";

/// Self-describing record sent to remote service catalogs.
///
/// Built once at startup. Each target receives its own copy through
/// [`RegistrationDescriptor::with_ttl`]; nothing else is ever changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationDescriptor {
    id: String,
    name: String,
    description: String,
    uri: String,
    meta: BTreeMap<String, String>,
    ttl: Duration,
}

impl RegistrationDescriptor {
    /// Derive the descriptor from validated configuration.
    pub fn from_config(config: &CatalogConfig) -> Result<Self, ConfigError> {
        if config.public_endpoint.is_empty() {
            return Err(ConfigError::Registration("public_endpoint is required".into()));
        }
        let endpoint = Url::parse(&config.public_endpoint).map_err(|e| {
            ConfigError::Registration(format!(
                "invalid public_endpoint '{}': {}",
                config.public_endpoint, e
            ))
        })?;
        let host = endpoint.host_str().ok_or_else(|| {
            ConfigError::Registration(format!(
                "public_endpoint '{}' has no host",
                config.public_endpoint
            ))
        })?;
        let authority = match endpoint.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let mut meta = config.registration.meta.clone();
        meta.insert("apiVersion".into(), API_VERSION.into());
        meta.insert("serviceType".into(), DNSSD_SERVICE_TYPE.into());

        let uri = format!(
            "{}{}",
            config.public_endpoint.trim_end_matches('/'),
            config.api_location
        );

        Ok(Self {
            id: format!("{}/{}", authority, SERVICE_NAME),
            name: SERVICE_NAME.to_string(),
            description: config.description.clone(),
            uri,
            meta,
            ttl: Duration::ZERO,
        })
    }

    /// Per-target copy with its own TTL.
    pub fn with_ttl(&self, ttl: Duration) -> Self {
        Self {
            ttl,
            ..self.clone()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Network location of the catalog API.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn meta(&self) -> &BTreeMap<String, String> {
        &self.meta
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// JSON body understood by remote service catalogs.
    pub fn to_wire(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "type": "Service",
            "name": self.name,
            "description": self.description,
            "meta": self.meta,
            "protocols": [{
                "type": "REST",
                "endpoint": { "url": self.uri },
                "methods": ["GET", "POST"],
                "content-types": ["application/ld+json"],
            }],
            "representation": { "application/ld+json": {} },
            "ttl": self.ttl.as_secs(),
        })
    }
}
