//! Remote service catalog client.
//!
//! # Responsibilities
//! - Register, renew and deregister a descriptor over HTTP
//! - Resolve the catalog endpoint through DNS-SD when configured to
//! - Bound every request with a timeout

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tokio::time::timeout;
use url::Url;

use crate::discovery::browse::CatalogResolver;
use crate::registration::descriptor::RegistrationDescriptor;
use crate::registration::types::{RegistrationError, RegistrationResult};

/// The registration operations a service catalog offers.
///
/// Renewal is an idempotent upsert keyed by the descriptor id.
#[async_trait]
pub trait CatalogClient: Send + Sync + 'static {
    async fn register(&self, descriptor: &RegistrationDescriptor) -> RegistrationResult<()>;

    async fn renew(&self, descriptor: &RegistrationDescriptor) -> RegistrationResult<()>;

    async fn deregister(&self, service_id: &str) -> RegistrationResult<()>;
}

/// Where the catalog lives.
#[derive(Clone)]
pub enum CatalogEndpoint {
    /// Fixed, configured URL.
    Static(String),
    /// Looked up through DNS-SD before every request.
    Discovered(CatalogResolver),
}

/// HTTP client for a remote service catalog.
#[derive(Clone)]
pub struct RemoteCatalog {
    client: Client,
    endpoint: CatalogEndpoint,
    request_timeout: Duration,
}

impl RemoteCatalog {
    pub fn new(endpoint: CatalogEndpoint, request_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            request_timeout,
        }
    }

    async fn base_url(&self) -> RegistrationResult<Url> {
        let raw = match &self.endpoint {
            CatalogEndpoint::Static(url) => url.clone(),
            CatalogEndpoint::Discovered(resolver) => {
                let url = resolver.resolve().await?;
                tracing::debug!(endpoint = %url, "Resolved catalog endpoint via DNS-SD");
                url
            }
        };
        // Trailing slash so that `join` appends instead of replacing the last segment.
        let normalized = format!("{}/", raw.trim_end_matches('/'));
        Url::parse(&normalized).map_err(|_| RegistrationError::InvalidEndpoint(raw))
    }

    fn entry_url(base: &Url, service_id: &str) -> RegistrationResult<Url> {
        // "./" keeps ids like "host:port/Name" from parsing as a scheme.
        base.join(&format!("./{}", service_id))
            .map_err(|_| RegistrationError::InvalidEndpoint(format!("{}{}", base, service_id)))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> RegistrationResult<Response> {
        match timeout(self.request_timeout, request.send()).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(RegistrationError::Timeout(self.request_timeout)),
        }
    }

    async fn post(&self, base: &Url, descriptor: &RegistrationDescriptor) -> RegistrationResult<Response> {
        self.send(self.client.post(base.clone()).json(&descriptor.to_wire()))
            .await
    }

    async fn put(&self, base: &Url, descriptor: &RegistrationDescriptor) -> RegistrationResult<Response> {
        let url = Self::entry_url(base, descriptor.id())?;
        self.send(self.client.put(url).json(&descriptor.to_wire())).await
    }
}

async fn expect_success(response: Response) -> RegistrationResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(RegistrationError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl CatalogClient for RemoteCatalog {
    async fn register(&self, descriptor: &RegistrationDescriptor) -> RegistrationResult<()> {
        let base = self.base_url().await?;
        let response = self.post(&base, descriptor).await?;
        if response.status() == StatusCode::CONFLICT {
            // Entry survived a previous run; take it over.
            return expect_success(self.put(&base, descriptor).await?).await;
        }
        expect_success(response).await
    }

    async fn renew(&self, descriptor: &RegistrationDescriptor) -> RegistrationResult<()> {
        let base = self.base_url().await?;
        let response = self.put(&base, descriptor).await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::info!(id = %descriptor.id(), "Registration lapsed in catalog, re-registering");
            return expect_success(self.post(&base, descriptor).await?).await;
        }
        expect_success(response).await
    }

    async fn deregister(&self, service_id: &str) -> RegistrationResult<()> {
        let base = self.base_url().await?;
        let url = Self::entry_url(&base, service_id)?;
        let response = self.send(self.client.delete(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        expect_success(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_base_url_normalizes_trailing_slash() {
        let catalog = RemoteCatalog::new(
            CatalogEndpoint::Static("http://sc.local:8082/sc".into()),
            Duration::from_secs(1),
        );
        let base = catalog.base_url().await.unwrap();
        assert_eq!(base.as_str(), "http://sc.local:8082/sc/");

        let entry = RemoteCatalog::entry_url(&base, "gw.local:8081/DeviceCatalog").unwrap();
        assert_eq!(entry.as_str(), "http://sc.local:8082/sc/gw.local:8081/DeviceCatalog");
    }

    #[tokio::test]
    async fn test_invalid_endpoint() {
        let catalog = RemoteCatalog::new(
            CatalogEndpoint::Static("not a url".into()),
            Duration::from_secs(1),
        );
        assert!(matches!(
            catalog.deregister("x").await,
            Err(RegistrationError::InvalidEndpoint(_))
        ));
    }
}
