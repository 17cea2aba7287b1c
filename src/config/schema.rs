//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the catalog
//! service. All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Storage backend the catalog API is mounted on.
pub const STORAGE_MEMORY: &str = "memory";

/// Root configuration for the device catalog.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Human-readable description, used for DNS-SD and registrations.
    pub description: String,

    /// Externally reachable base URL (e.g., "http://gateway.local:8081").
    pub public_endpoint: String,

    /// Address to bind the HTTP listener to.
    pub bind_addr: String,

    /// Port to bind the HTTP listener to.
    pub bind_port: u16,

    /// Base path of the catalog API.
    pub api_location: String,

    /// Directory served under the static location.
    pub static_dir: String,

    /// Announce the service via DNS-SD.
    pub dnssd_enabled: bool,

    /// Storage backend settings.
    pub storage: StorageConfig,

    /// Remote service catalogs to register with.
    pub service_catalog: Vec<ServiceCatalogConfig>,

    /// Keepalive registration tuning.
    pub registration: RegistrationConfig,

    /// Shutdown settings.
    pub shutdown: ShutdownConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            description: "Device Catalog".to_string(),
            public_endpoint: "http://localhost:8081".to_string(),
            bind_addr: "0.0.0.0".to_string(),
            bind_port: 8081,
            api_location: "/dc".to_string(),
            static_dir: "./static".to_string(),
            dnssd_enabled: false,
            storage: StorageConfig::default(),
            service_catalog: Vec::new(),
            registration: RegistrationConfig::default(),
            shutdown: ShutdownConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl CatalogConfig {
    /// Listener address in `host:port` form.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.bind_port)
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend type. Only "memory" is supported.
    #[serde(rename = "type")]
    pub kind: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: STORAGE_MEMORY.to_string(),
        }
    }
}

/// A remote service catalog to keep a registration alive in.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ServiceCatalogConfig {
    /// Catalog API endpoint (e.g., "http://sc.local:8082/sc").
    /// Ignored when `discover` is set.
    #[serde(default)]
    pub endpoint: String,

    /// Resolve the catalog endpoint through DNS-SD before each attempt.
    #[serde(default)]
    pub discover: bool,

    /// Registration time-to-live in seconds. Zero disables renewal.
    #[serde(default = "default_ttl")]
    pub ttl: u64,
}

impl ServiceCatalogConfig {
    /// TTL as a duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl)
    }

    /// Label used in logs and metrics.
    pub fn label(&self) -> String {
        if self.discover {
            "dnssd".to_string()
        } else {
            self.endpoint.clone()
        }
    }
}

fn default_ttl() -> u64 {
    120
}

/// Keepalive registration tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Timeout for a single catalog request in seconds.
    pub request_timeout_secs: u64,

    /// How long to browse DNS-SD for a catalog endpoint in seconds.
    pub discovery_timeout_secs: u64,

    /// Extra metadata attached to the registration.
    pub meta: BTreeMap<String, String>,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            request_timeout_secs: 5,
            discovery_timeout_secs: 5,
            meta: BTreeMap::new(),
        }
    }
}

/// Shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Time allowed for deregistration and announcement revocation.
    pub grace_secs: u64,
}

impl ShutdownConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { grace_secs: 3 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
