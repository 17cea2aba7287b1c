//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with static files and catalog API routes
//! - Wire up middleware (tracing, timeout, request ID, metrics)
//! - Serve until the shutdown broadcast fires

use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::schema::STORAGE_MEMORY;
use crate::config::CatalogConfig;
use crate::http::request::UuidRequestId;
use crate::observability::metrics;
use crate::registration::descriptor::{API_VERSION, SERVICE_NAME};

/// Path prefix for static files.
pub const STATIC_LOCATION: &str = "/static";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Router setup failures. Fatal at startup.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not create catalog API. Unsupported storage type: {0}")]
    UnsupportedStorage(String),
}

/// State shared by the catalog API handlers.
#[derive(Clone)]
struct ApiState {
    description: String,
    api_location: String,
}

/// HTTP server for the device catalog.
pub struct HttpServer {
    router: Router,
    config: CatalogConfig,
}

impl HttpServer {
    /// Build the server. Fails for storage types the API cannot be mounted on.
    pub fn new(config: CatalogConfig) -> Result<Self, ServerError> {
        if config.storage.kind != STORAGE_MEMORY {
            return Err(ServerError::UnsupportedStorage(config.storage.kind.clone()));
        }
        let router = Self::build_router(&config);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &CatalogConfig) -> Router {
        let state = ApiState {
            description: config.description.clone(),
            api_location: config.api_location.clone(),
        };
        let api = config.api_location.trim_end_matches('/');
        let entry = format!("{}/{{dgwid}}/{{regid}}", api);

        Router::new()
            .nest_service(STATIC_LOCATION, ServeDir::new(&config.static_dir))
            .route(api, get(list))
            .route(&format!("{}/", api), post(not_implemented))
            .route(
                &format!("{}/{{type}}/{{path}}/{{op}}/{{value}}", api),
                get(not_implemented),
            )
            .route(
                &entry,
                get(not_implemented).put(not_implemented).delete(not_implemented),
            )
            .route(&format!("{}/{{resname}}", entry), get(not_implemented))
            .with_state(state)
            .layer(middleware::from_fn(track_requests))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(REQUEST_TIMEOUT)),
            )
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            api = %self.config.api_location,
            "Starting standalone Device Catalog"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[derive(Serialize)]
struct CatalogIndex {
    name: &'static str,
    description: String,
    #[serde(rename = "apiVersion")]
    api_version: &'static str,
    url: String,
}

async fn list(State(state): State<ApiState>) -> Json<CatalogIndex> {
    Json(CatalogIndex {
        name: SERVICE_NAME,
        description: state.description,
        api_version: API_VERSION,
        url: state.api_location,
    })
}

async fn not_implemented() -> impl IntoResponse {
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(serde_json::json!({
            "code": StatusCode::NOT_IMPLEMENTED.as_u16(),
            "message": "Catalog storage is not available in this build",
        })),
    )
}

async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let method = request.method().to_string();
    let response = next.run(request).await;
    metrics::record_request(&method, response.status().as_u16());
    response
}
