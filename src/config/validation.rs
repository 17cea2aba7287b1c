//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and formats.
//! All errors are collected, not just the first.

use std::fmt;

use url::Url;

use crate::config::schema::{CatalogConfig, STORAGE_MEMORY};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &CatalogConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.storage.kind != STORAGE_MEMORY {
        errors.push(ValidationError::new(
            "storage.type",
            format!("unsupported storage type '{}'", config.storage.kind),
        ));
    }

    if !config.api_location.starts_with('/') {
        errors.push(ValidationError::new("api_location", "must start with '/'"));
    } else if config.api_location.trim_end_matches('/').is_empty() {
        errors.push(ValidationError::new("api_location", "must name a path below '/'"));
    }

    if config.bind_port == 0 {
        errors.push(ValidationError::new("bind_port", "must be non-zero"));
    }

    if let Err(message) = check_http_url(&config.public_endpoint) {
        errors.push(ValidationError::new("public_endpoint", message));
    }

    let mut discovered = 0;
    for (i, target) in config.service_catalog.iter().enumerate() {
        if target.discover {
            discovered += 1;
            // Discovery resolves to a single catalog.
            if discovered > 1 {
                errors.push(ValidationError::new(
                    format!("service_catalog[{}].discover", i),
                    "only one service catalog may be discovered via DNS-SD",
                ));
            }
            continue;
        }
        if let Err(message) = check_http_url(&target.endpoint) {
            errors.push(ValidationError::new(
                format!("service_catalog[{}].endpoint", i),
                message,
            ));
        }
    }

    if config.registration.base_delay_ms == 0 {
        errors.push(ValidationError::new("registration.base_delay_ms", "must be non-zero"));
    }
    if config.registration.max_delay_ms < config.registration.base_delay_ms {
        errors.push(ValidationError::new(
            "registration.max_delay_ms",
            "must not be smaller than base_delay_ms",
        ));
    }
    if config.registration.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "registration.request_timeout_secs",
            "must be non-zero",
        ));
    }

    if config.registration.discovery_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "registration.discovery_timeout_secs",
            "must be non-zero",
        ));
    }

    if config.shutdown.grace_secs == 0 {
        errors.push(ValidationError::new("shutdown.grace_secs", "must be non-zero"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_http_url(raw: &str) -> Result<(), String> {
    if raw.is_empty() {
        return Err("is required".to_string());
    }
    let url = Url::parse(raw).map_err(|e| format!("invalid URL '{}': {}", raw, e))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme '{}'", other)),
    }
    if url.host_str().is_none() {
        return Err(format!("URL '{}' has no host", raw));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ServiceCatalogConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&CatalogConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = CatalogConfig::default();
        config.storage.kind = "sqlite".into();
        config.api_location = "dc".into();
        config.public_endpoint = String::new();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["storage.type", "api_location", "public_endpoint"]);
    }

    #[test]
    fn test_discovered_targets_skip_endpoint_check() {
        let mut config = CatalogConfig::default();
        config.service_catalog.push(ServiceCatalogConfig {
            endpoint: String::new(),
            discover: true,
            ttl: 30,
        });
        config.service_catalog.push(ServiceCatalogConfig {
            endpoint: "ftp://sc.local/sc".into(),
            discover: false,
            ttl: 30,
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "service_catalog[1].endpoint");
        assert!(errors[0].message.contains("ftp"));
    }

    #[test]
    fn test_second_discovered_target_rejected() {
        let mut config = CatalogConfig::default();
        for _ in 0..2 {
            config.service_catalog.push(ServiceCatalogConfig {
                endpoint: String::new(),
                discover: true,
                ttl: 30,
            });
        }

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "service_catalog[1].discover");
    }

    #[test]
    fn test_zero_discovery_timeout_rejected() {
        let mut config = CatalogConfig::default();
        config.registration.discovery_timeout_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "registration.discovery_timeout_secs");
    }
}
