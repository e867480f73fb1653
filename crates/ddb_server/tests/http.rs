//! End-to-end tests of the HTTP binding.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use ddb_core::{DocumentStore, StoreConfig};
use ddb_server::{HttpServer, ServerConfig};
use std::sync::Arc;
use tempfile::tempdir;
use tower::ServiceExt;

fn router_for(store: DocumentStore, config: ServerConfig) -> Router {
    HttpServer::with_store(config, Arc::new(store)).router()
}

fn post(path: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn insert_find_delete_scenario() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");
    let store = DocumentStore::open(&path).unwrap();
    let router = router_for(store, ServerConfig::default());

    let (status, body) = send(&router, post("/documents/insertOne", r#"{"a":1}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"_id":"000000000000000000000001"}"#);

    let (_, body) = send(&router, post("/documents/insertOne", r#"{ "a" : 2 }"#)).await;
    assert_eq!(body, r#"{"_id":"000000000000000000000002"}"#);

    let (status, body) = send(
        &router,
        post("/documents/deleteOne", r#"{"_id":"000000000000000000000001"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":200,"message":"Document deleted"}"#);

    let (status, body) = send(
        &router,
        post("/documents/findOne", r#"{"_id":"000000000000000000000001"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"status":404,"message":"No document found"}"#);

    let (status, body) = send(
        &router,
        post("/documents/findOne", r#"{"_id":"000000000000000000000002"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"_id":"000000000000000000000002","a":2}"#);

    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "[\n{\"s\":1,\"d\":{\"_id\":\"000000000000000000000002\",\"a\":2}}\n]"
    );
}

#[tokio::test]
async fn get_is_not_found() {
    let router = router_for(DocumentStore::open_in_memory().unwrap(), ServerConfig::default());
    let request = Request::builder()
        .method("GET")
        .uri("/documents/findOne")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"status":404}"#);
}

#[tokio::test]
async fn unsupported_media_type() {
    let router = router_for(DocumentStore::open_in_memory().unwrap(), ServerConfig::default());
    let request = Request::builder()
        .method("POST")
        .uri("/documents/insertOne")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("{}"))
        .unwrap();

    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(
        body,
        r#"{"status":415,"message":"Only accepts content type application/json, not text/plain"}"#
    );
}

#[tokio::test]
async fn malformed_and_non_object_bodies() {
    let router = router_for(DocumentStore::open_in_memory().unwrap(), ServerConfig::default());

    let (status, body) = send(&router, post("/documents/insertOne", r#"{"a":"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"status":400,"message":"Malformed JSON"}"#);

    let (status, body) = send(&router, post("/documents/insertOne", "[1,2]")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        r#"{"status":400,"message":"Malformed JSON. Top level element must be object"}"#
    );
}

#[tokio::test]
async fn unknown_path() {
    let router = router_for(DocumentStore::open_in_memory().unwrap(), ServerConfig::default());
    let (status, body) = send(&router, post("/documents/replaceOne", "{}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        r#"{"status":404,"message":"Non-existing path: /documents/replaceOne"}"#
    );
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let config = ServerConfig::default().with_max_body_size(16);
    let router = router_for(DocumentStore::open_in_memory().unwrap(), config);

    let (status, body) = send(
        &router,
        post("/documents/insertOne", r#"{"text":"longer than sixteen bytes"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        r#"{"status":400,"message":"Request body exceeds the maximum size of 16 bytes"}"#
    );
}

#[tokio::test]
async fn invalid_utf8_body_is_malformed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");
    let router = router_for(DocumentStore::open(&path).unwrap(), ServerConfig::default());

    let request = Request::builder()
        .method("POST")
        .uri("/documents/insertOne")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(b"{\"a\":\"\xc3\x28\"}".to_vec()))
        .unwrap();
    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"status":400,"message":"Malformed JSON"}"#);
    assert_eq!(std::fs::read(&path).unwrap(), b"[\n]");
}

#[tokio::test]
async fn restart_sees_file_edited_on_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");
    let router = router_for(DocumentStore::open(&path).unwrap(), ServerConfig::default());
    send(&router, post("/documents/insertOne", "{}")).await;

    std::fs::write(
        &path,
        "[\n{\"s\":1,\"d\":{\"_id\":\"000000000000000000000001\"}},\n{\"s\":0,\"d\":{\"_id\":\"000000000000000000000063\"}}\n]",
    )
    .unwrap();
    let (status, _) = send(&router, post("/test/restart", "{}")).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&router, post("/documents/insertOne", "{}")).await;
    assert_eq!(body, r#"{"_id":"000000000000000000000064"}"#);
}

#[tokio::test]
async fn reset_restart_and_compact() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");
    let store = DocumentStore::open_with_config(StoreConfig::new().path(&path)).unwrap();
    let router = router_for(store, ServerConfig::default());

    for _ in 0..3 {
        send(&router, post("/documents/insertOne", r#"{"pad":"xxxxxxxxxxxx"}"#)).await;
    }
    send(
        &router,
        post("/documents/deleteOne", r#"{"_id":"000000000000000000000003"}"#),
    )
    .await;

    let (status, body) = send(&router, post("/maintenance/compact", "{}")).await;
    assert_eq!(status, StatusCode::OK);
    let stats: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        stats["bytes_after"].as_u64().unwrap(),
        std::fs::metadata(&path).unwrap().len()
    );

    let (_, body) = send(&router, post("/test/restart", "{}")).await;
    assert_eq!(body, r#"{"message":"Database restarted"}"#);

    let (_, body) = send(&router, post("/test/reset", "{}")).await;
    assert_eq!(body, r#"{"message":"Database reset"}"#);
    assert_eq!(std::fs::read(&path).unwrap(), b"[\n]");

    let (_, body) = send(&router, post("/documents/insertOne", "{}")).await;
    assert_eq!(body, r#"{"_id":"000000000000000000000001"}"#);
}
