// Integration tests for x-api-key gatekeeping

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use tuneshelf::api::API_KEY_HEADER;
use tuneshelf::app::build_router;
use tuneshelf::config::{AppConfig, ServerConfig};
use tuneshelf::credentials::TokenCipher;
use tuneshelf::db;

const API_KEY: &str = "test-api-key";

fn create_test_app(api_key: Option<&str>) -> Router {
    let config = AppConfig {
        server: ServerConfig {
            api_key: api_key.map(|k| k.to_string()),
            ..ServerConfig::default()
        },
        ..AppConfig::default()
    };
    let conn = db::open(":memory:").unwrap();
    db::lock(&conn)
        .unwrap()
        .execute("INSERT INTO users (id, name, age) VALUES (1, 'Ada', 36)", [])
        .unwrap();
    let cipher = TokenCipher::from_key_bytes(&[0u8; 32]).unwrap();
    build_router(&config, conn, cipher).unwrap()
}

fn request(uri: &str, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(key) = key {
        builder = builder.header(API_KEY_HEADER, key);
    }
    builder.body(Body::empty()).unwrap()
}

async fn status_and_body(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_missing_key_rejected() {
    let app = create_test_app(Some(API_KEY));

    for uri in [
        "/users",
        "/users/1",
        "/spotify/search/artist?user_id=1&q=x",
        "/spotify/me/following/artists?user_id=1",
    ] {
        let (status, body) = status_and_body(&app, request(uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "uri: {}", uri);
        assert_eq!(body["error"], "Invalid or missing API Key credentials");
    }
}

#[tokio::test]
async fn test_wrong_key_rejected() {
    let app = create_test_app(Some(API_KEY));

    let (status, _) = status_and_body(&app, request("/users", Some("wrong"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_correct_key_accepted() {
    let app = create_test_app(Some(API_KEY));

    let (status, body) = status_and_body(&app, request("/users", Some(API_KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "Ada");
}

#[tokio::test]
async fn test_oauth_routes_exempt() {
    let app = create_test_app(Some(API_KEY));

    let response = app
        .clone()
        .oneshot(request("/spotify/auth/1/login", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let (status, body) =
        status_and_body(&app, request("/users/auth/callback?error=access_denied", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Spotify Error: access_denied");
}

#[tokio::test]
async fn test_no_key_configured_allows_all() {
    let app = create_test_app(None);

    let (status, _) = status_and_body(&app, request("/users", None)).await;
    assert_eq!(status, StatusCode::OK);
}
