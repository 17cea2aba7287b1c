//! HTTP plumbing: routes, static files, request IDs, shutdown.

use std::time::Duration;

use device_catalog::config::CatalogConfig;
use device_catalog::http::{HttpServer, X_REQUEST_ID};
use device_catalog::lifecycle::Shutdown;
use tokio::net::TcpListener;

async fn start_server(config: CatalogConfig, shutdown: &Shutdown) -> (String, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).unwrap();
    let rx = shutdown.subscribe();
    let task = tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });
    (format!("http://{}", addr), task)
}

#[tokio::test]
async fn test_catalog_index_and_routes() {
    let mut config = CatalogConfig::default();
    config.description = "Test DC".into();
    let shutdown = Shutdown::new();
    let (base, _task) = start_server(config, &shutdown).await;
    let client = reqwest::Client::builder().no_proxy().build().unwrap();

    let res = client.get(format!("{}/dc", base)).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key(X_REQUEST_ID));
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["description"], "Test DC");
    assert_eq!(body["url"], "/dc");

    let res = client
        .post(format!("{}/dc/", base))
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 501);

    let res = client.delete(format!("{}/dc/gw1/reg1", base)).send().await.unwrap();
    assert_eq!(res.status(), 501);

    let res = client.get(format!("{}/nowhere", base)).send().await.unwrap();
    assert_eq!(res.status(), 404);

    shutdown.trigger();
}

#[tokio::test]
async fn test_static_files_served() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ctx.jsonld"), "{\"@context\":{}}").unwrap();

    let mut config = CatalogConfig::default();
    config.static_dir = dir.path().to_string_lossy().into_owned();
    let shutdown = Shutdown::new();
    let (base, _task) = start_server(config, &shutdown).await;

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let res = client
        .get(format!("{}/static/ctx.jsonld", base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "{\"@context\":{}}");

    shutdown.trigger();
}

#[tokio::test]
async fn test_server_stops_on_shutdown_broadcast() {
    let shutdown = Shutdown::new();
    let (_base, task) = start_server(CatalogConfig::default(), &shutdown).await;

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("server should stop after shutdown is triggered")
        .unwrap();
}
