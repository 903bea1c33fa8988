//! API integration tests for kick-api routes.
//!
//! Uses Axum's `tower::ServiceExt` to send requests directly to the app
//! without binding a TCP socket.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use kick_api::app::build_app;
use kick_api::state::{AdminCredentials, AppState};
use kick_core::{
    ChannelConfig, ChannelLoader, LoadError, NotificationDispatcher, Tracker, TrackerConfig,
    TrackerSettings, UpdateScheduler,
};

/// Serves fixed bodies; unknown channels fail with HTTP 404.
struct StaticLoader {
    bodies: HashMap<String, String>,
}

#[async_trait]
impl ChannelLoader for StaticLoader {
    async fn load(&self, identifier: &str) -> Result<String, LoadError> {
        self.bodies
            .get(identifier)
            .cloned()
            .ok_or_else(|| LoadError::Http {
                url: format!("https://kick.com/api/v2/channels/{identifier}"),
                status: 404,
                message: "Not Found".into(),
                is_last_retry: true,
            })
    }
}

fn state_with(channels: Vec<ChannelConfig>) -> AppState {
    let mut bodies = HashMap::new();
    bodies.insert(
        "alice".to_string(),
        json!({
            "user": {"username": "Alice", "profile_pic": "https://img.example/alice.png"},
            "livestream": {"is_live": true, "session_title": "Hello", "viewer_count": 42}
        })
        .to_string(),
    );
    bodies.insert(
        "bob".to_string(),
        json!({"user": {"username": "bob"}, "livestream": null}).to_string(),
    );

    let tracker = Tracker::new(
        TrackerSettings::new(channels),
        TrackerConfig::default(),
        Arc::new(StaticLoader { bodies }),
        NotificationDispatcher::default(),
    );
    let scheduler = Arc::new(UpdateScheduler::new(Arc::new(tracker)));
    AppState::new(scheduler).with_admin(AdminCredentials::new("admin", "secret"))
}

fn default_state() -> AppState {
    state_with(vec![
        ChannelConfig::new("alice"),
        ChannelConfig::new("bob").with_display_name("Bobby"),
        ChannelConfig::new("ghost"),
    ])
}

fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")))
}

async fn body_json(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn admin_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", basic("admin", "secret"))
        .header("content-type", "application/json");
    if let Some(b) = body {
        builder.body(Body::from(serde_json::to_vec(&b).unwrap())).unwrap()
    } else {
        builder.body(Body::empty()).unwrap()
    }
}

fn temp_settings_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("kick-api-{}-{}.json", std::process::id(), name))
}

#[tokio::test]
async fn health_returns_ok() {
    let app = build_app(default_state());
    let resp = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn metrics_returns_openmetrics() {
    let state = default_state();
    state.tracker().run_cycle().await;

    let app = build_app(state);
    let resp = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let ct = resp.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(ct.contains("openmetrics-text"));
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("kick_tracker_channels 3"));
    assert!(text.contains("kick_tracker_live_channels 1"));
    assert!(text.contains("kick_tracker_failed_fetches 1"));
    assert!(text.contains("kick_tracker_channel_live{channel=\"alice\"} 1"));
    assert!(text.trim_end().ends_with("# EOF"));
}

#[tokio::test]
async fn streamers_before_first_cycle_is_empty() {
    let app = build_app(default_state());
    let resp = app.oneshot(get("/api/streamers")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp.into_body()).await;
    assert_eq!(body["version"], 0);
    assert_eq!(body["totalMembers"], 0);
    assert_eq!(body["liveCount"], 0);
    assert!(body["members"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn streamers_reflect_latest_snapshot() {
    let state = default_state();
    state.tracker().run_cycle().await;

    let app = build_app(state);
    let resp = app.oneshot(get("/api/streamers")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp.into_body()).await;

    assert_eq!(body["version"], 1);
    assert_eq!(body["totalMembers"], 3);
    assert_eq!(body["liveCount"], 1);
    assert!(body["updatedAt"].is_string());

    let members = body["members"].as_array().unwrap();
    assert_eq!(members[0]["id"], "alice");
    assert_eq!(members[0]["username"], "alice");
    assert_eq!(members[0]["name"], "Alice");
    assert_eq!(members[0]["live"], true);
    assert_eq!(members[0]["title"], "Hello");
    assert_eq!(members[0]["viewers"], 42);
    assert_eq!(members[0]["url"], "https://kick.com/alice");
    assert_eq!(members[0]["avatar"], "https://img.example/alice.png");
    assert!(members[0].get("error").is_none());

    assert_eq!(members[1]["name"], "Bobby");
    assert_eq!(members[1]["live"], false);
    assert!(members[1]["title"].is_null());

    assert_eq!(members[2]["username"], "ghost");
    assert_eq!(members[2]["error"], true);
}

#[tokio::test]
async fn admin_routes_require_credentials() {
    let app = build_app(default_state());

    let resp = app.clone().oneshot(get("/api/config")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let challenge = resp.headers().get("www-authenticate").unwrap();
    assert_eq!(challenge, "Basic realm=\"Admin Panel\"");

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/config")
                .header("authorization", basic("admin", "wrong"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_disabled_without_credentials() {
    let mut state = default_state();
    state.admin = None;
    let app = build_app(state);
    let resp = app
        .oneshot(admin_request("GET", "/api/config", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn get_config_returns_settings_and_text_form() {
    let app = build_app(default_state());
    let resp = app
        .oneshot(admin_request("GET", "/api/config", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp.into_body()).await;
    assert_eq!(body["refreshInterval"], 10_000);
    assert_eq!(body["effectiveIntervalMs"], 10_000);
    assert_eq!(body["debug"], false);
    assert_eq!(body["kickUsers"][1]["displayName"], "Bobby");
    assert_eq!(body["kickUsersText"], "alice\nbob|Bobby\nghost");
}

#[tokio::test]
async fn update_config_applies_and_persists() {
    let path = temp_settings_path("update");
    let state = default_state().with_settings_path(&path);
    let app = build_app(state.clone());

    let resp = app
        .oneshot(admin_request(
            "POST",
            "/api/config",
            Some(json!({
                "refreshInterval": 1000,
                "debug": true,
                "kickUsersText": "Bob|Bobby B\ncarol"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["config"]["effectiveIntervalMs"], 3000);

    let settings = state.tracker().settings();
    assert!(settings.debug);
    assert_eq!(settings.channels().len(), 2);
    assert_eq!(settings.channels()[0].identifier, "bob");
    assert_eq!(state.scheduler.period().await, Duration::from_millis(3000));
    assert!(state.scheduler.is_scheduled().await);

    let saved = TrackerSettings::load(&path).unwrap();
    assert_eq!(saved, *settings);

    state.scheduler.stop().await;
    std::fs::remove_file(&path).ok();
}

#[tokio::test]
async fn update_config_rejects_invalid_settings() {
    let state = default_state();
    let app = build_app(state.clone());

    let resp = app
        .oneshot(admin_request(
            "POST",
            "/api/config",
            Some(json!({ "kickUsersText": "dup\nDUP" })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp.into_body()).await;
    assert!(body["message"].as_str().unwrap().contains("Duplicate"));

    assert_eq!(state.tracker().settings().channels().len(), 3);
    assert!(!state.scheduler.is_scheduled().await);
}

#[tokio::test]
async fn refresh_triggers_a_cycle() {
    let state = default_state();
    let app = build_app(state.clone());

    let resp = app
        .oneshot(admin_request("POST", "/api/refresh", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp.into_body()).await;
    assert_eq!(body["triggered"], true);

    for _ in 0..100 {
        if state.tracker().snapshot().version() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(state.tracker().snapshot().version(), 1);
    assert_eq!(state.tracker().snapshot().live_count(), 1);
}
