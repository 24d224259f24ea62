//! Integration tests for the form uploader
//!
//! These tests drive the HTTP router end to end:
//! - Multipart binding and the form workflow against the local backend
//! - Serving stored blobs and static files
//! - CORS preflight
//! - Storage failures surfacing as server errors

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use form_uploader::app;
use form_uploader::config::{AppConfig, BackendConfig};
use form_uploader::crypto::hash_password;
use form_uploader::error::AppError;
use form_uploader::models::SavedForm;
use form_uploader::routes;
use form_uploader::storage::BlobStore;
use http_body_util::BodyExt;
use std::path::Path;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "form-uploader-test-boundary";
const BASE_URL: &str = "http://localhost:8080/blobs";

const ADA_FIELDS: &[(&str, &str)] = &[
    ("firstName", "Ada"),
    ("lastName", "Lovelace"),
    ("email", "ada@example.com"),
    ("gender", "female"),
    ("password", "engine42"),
];

/// Build a multipart/form-data body
fn multipart_body(fields: &[(&str, &str)], avatar: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }

    if let Some((filename, data)) = avatar {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"avatar\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                BOUNDARY, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn form_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/form")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn local_config(root: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.backend = BackendConfig::Local {
        root: root.to_path_buf(),
        public_base_url: Some(BASE_URL.to_string()),
    };
    config
}

/// Helper to create a router over a local blob directory
async fn create_test_app() -> (Router, BlobStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("blobs");
    let config = local_config(&root);

    let state = app::setup(&config).await.unwrap();
    let router = routes::router(state, &config.server).unwrap();

    (router, BlobStore::new(root, BASE_URL), temp_dir)
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn key_of(url: &str) -> &str {
    url.rsplit('/').next().unwrap()
}

#[tokio::test]
async fn test_submit_form() {
    let (router, store, _temp) = create_test_app().await;

    let body = multipart_body(ADA_FIELDS, Some(("portrait.png", b"\x89PNG\r\n")));
    let response = router.oneshot(form_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));

    let url = body_string(response).await;
    assert!(url.starts_with("http://localhost:8080/blobs/forms/"));
    assert!(url.ends_with(".json"));

    let json = store.read("forms", key_of(&url)).await.unwrap();
    let record: SavedForm = serde_json::from_slice(&json).unwrap();

    assert_eq!(record.first_name, "Ada");
    assert_eq!(record.last_name, "Lovelace");
    assert_eq!(record.email, "ada@example.com");
    assert_eq!(record.gender, "female");
    assert_eq!(record.password, hash_password("engine42"));
    assert!(record.avatar_url.ends_with(".png"));

    let image = store.read("images", key_of(&record.avatar_url)).await.unwrap();
    assert_eq!(image, b"\x89PNG\r\n");
}

#[tokio::test]
async fn test_record_json_field_names() {
    let (router, store, _temp) = create_test_app().await;

    let body = multipart_body(ADA_FIELDS, Some(("portrait.png", b"png")));
    let response = router.oneshot(form_request(body)).await.unwrap();
    let url = body_string(response).await;

    let json = store.read("forms", key_of(&url)).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
    let object = value.as_object().unwrap();

    let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(
        keys,
        vec!["AvatarUrl", "Email", "FirstName", "Gender", "LastName", "Password"]
    );
    assert_eq!(object["Password"].as_str().unwrap().len(), 64);
}

#[tokio::test]
async fn test_missing_field_is_rejected() {
    let (router, store, _temp) = create_test_app().await;

    let fields: Vec<(&str, &str)> = ADA_FIELDS
        .iter()
        .copied()
        .filter(|(name, _)| *name != "email")
        .collect();
    let body = multipart_body(&fields, Some(("portrait.png", b"png")));
    let response = router.oneshot(form_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.contains("email"));

    // Nothing reached storage
    assert!(!store.root().join("images").exists());
    assert!(!store.root().join("forms").exists());
}

#[tokio::test]
async fn test_missing_avatar_is_rejected() {
    let (router, _store, _temp) = create_test_app().await;

    let body = multipart_body(ADA_FIELDS, None);
    let response = router.oneshot(form_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_avatar_must_be_a_file() {
    let (router, _store, _temp) = create_test_app().await;

    let mut fields = ADA_FIELDS.to_vec();
    fields.push(("avatar", "not a file"));
    let body = multipart_body(&fields, None);
    let response = router.oneshot(form_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_non_multipart_body_is_rejected() {
    let (router, _store, _temp) = create_test_app().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/form")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"firstName":"Ada"}"#))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_unknown_fields_are_ignored() {
    let (router, _store, _temp) = create_test_app().await;

    let mut fields = ADA_FIELDS.to_vec();
    fields.push(("newsletter", "yes"));
    let body = multipart_body(&fields, Some(("portrait.png", b"png")));
    let response = router.oneshot(form_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_identical_submissions_are_stored_separately() {
    let (router, store, _temp) = create_test_app().await;

    let mut urls = Vec::new();
    for _ in 0..2 {
        let body = multipart_body(ADA_FIELDS, Some(("portrait.png", b"png")));
        let response = router.clone().oneshot(form_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        urls.push(body_string(response).await);
    }

    assert_ne!(urls[0], urls[1]);
    for url in &urls {
        assert!(store.exists("forms", key_of(url)).await.unwrap());
    }
}

#[tokio::test]
async fn test_stored_avatar_is_served() {
    let (router, store, _temp) = create_test_app().await;

    let body = multipart_body(ADA_FIELDS, Some(("portrait.png", b"avatar-bytes")));
    let response = router.clone().oneshot(form_request(body)).await.unwrap();
    let url = body_string(response).await;

    let json = store.read("forms", key_of(&url)).await.unwrap();
    let record: SavedForm = serde_json::from_slice(&json).unwrap();
    let path = record.avatar_url.trim_start_matches("http://localhost:8080");

    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "avatar-bytes");
}

#[tokio::test]
async fn test_static_files_fallback() {
    let temp_dir = TempDir::new().unwrap();
    let site = temp_dir.path().join("wwwroot");
    std::fs::create_dir_all(&site).unwrap();
    std::fs::write(site.join("index.html"), "<h1>Form</h1>").unwrap();

    let mut config = local_config(&temp_dir.path().join("blobs"));
    config.server.static_dir = Some(site);

    let state = app::setup(&config).await.unwrap();
    let router = routes::router(state, &config.server).unwrap();

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "<h1>Form</h1>");
}

#[tokio::test]
async fn test_cors_preflight() {
    let (router, _store, _temp) = create_test_app().await;

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/form")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn test_invalid_cors_origin_fails_router_build() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = local_config(&temp_dir.path().join("blobs"));
    config.server.cors_origins = vec!["http://bad\norigin".to_string()];

    let state = app::setup(&config).await.unwrap();
    assert!(routes::router(state, &config.server).is_err());
}

#[tokio::test]
async fn test_wildcard_cors_origin_fails_router_build() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = local_config(&temp_dir.path().join("blobs"));
    config.server.cors_origins = vec!["http://localhost:5173".to_string(), "*".to_string()];

    let state = app::setup(&config).await.unwrap();
    let result = routes::router(state, &config.server);

    match result {
        Err(AppError::Config(message)) => assert!(message.contains("wildcard")),
        Err(other) => panic!("expected config error, got {:?}", other),
        Ok(_) => panic!("expected config error, got a router"),
    }
}

#[tokio::test]
async fn test_unreachable_storage_is_server_error() {
    // Reserve a port, then close it so connections are refused
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut config = AppConfig::default();
    config.storage.backend = BackendConfig::Azure {
        connection_string: format!(
            "BlobEndpoint=http://127.0.0.1:{}/forms;AccountName=forms;AccountKey=a2V5",
            port
        ),
    };

    let state = app::setup(&config).await.unwrap();
    let router = routes::router(state, &config.server).unwrap();

    let body = multipart_body(ADA_FIELDS, Some(("portrait.png", b"png")));
    let response = router.oneshot(form_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_string(response).await;
    assert_eq!(body, "Internal server error");
    assert!(!body.contains("127.0.0.1"));
}
