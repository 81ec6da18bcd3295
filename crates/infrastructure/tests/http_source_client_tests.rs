use std::collections::HashMap;
use std::net::SocketAddr;

use axum::{
    extract::Query,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use inventory_core::{FetcherConfig, InventoryError, SourceClient, WorkItem};
use inventory_infrastructure::HttpSourceClient;
use serde_json::{json, Value};

async fn hosts_handler(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    if headers.get("token").and_then(|v| v.to_str().ok()) != Some("secret") {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(json!({
        "limit": params.get("limit"),
        "skip": params.get("skip"),
        "resources": [{"id": "1"}]
    })))
}

async fn spawn_stub() -> SocketAddr {
    let app = Router::new()
        .route("/hosts", post(hosts_handler))
        .route("/broken", post(|| async { StatusCode::SERVICE_UNAVAILABLE }))
        .route("/text", post(|| async { "not json" }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client(token: Option<&str>) -> HttpSourceClient {
    let config = FetcherConfig {
        auth_token: token.map(str::to_string),
        request_timeout_seconds: 5,
        ..FetcherConfig::default()
    };
    HttpSourceClient::new(&config, 2).unwrap()
}

fn item(addr: SocketAddr, path: &str, page_offset: u32) -> WorkItem {
    WorkItem {
        source_type: "qualys".to_string(),
        endpoint: format!("http://{addr}{path}"),
        page_offset,
    }
}

#[tokio::test]
async fn test_fetch_page_sends_paging_and_auth() {
    let addr = spawn_stub().await;
    let body = client(Some("secret"))
        .fetch_page(&item(addr, "/hosts", 3))
        .await
        .unwrap();

    assert_eq!(body["limit"], "2");
    assert_eq!(body["skip"], "3");
    assert_eq!(body["resources"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_non_success_status_is_reported() {
    let addr = spawn_stub().await;

    let err = client(None)
        .fetch_page(&item(addr, "/hosts", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::UpstreamStatus { status: 401, .. }));
    assert!(!err.is_transient());

    let err = client(Some("secret"))
        .fetch_page(&item(addr, "/broken", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::UpstreamStatus { status: 503, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_invalid_json_is_permanent() {
    let addr = spawn_stub().await;
    let err = client(Some("secret"))
        .fetch_page(&item(addr, "/text", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::Serialization(_)));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transient() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(Some("secret"))
        .fetch_page(&item(addr, "/hosts", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::Network(_)));
    assert!(err.is_transient());
}
