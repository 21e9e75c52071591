#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use fuzzdeck_api::config::ServerConfig;
use fuzzdeck_api::picker::{PathPicker, PickError, PickMode};
use fuzzdeck_api::router::build_app_router;
use fuzzdeck_api::state::AppState;
use fuzzdeck_events::{EventBus, ResultCollector, ResultStore};
use fuzzdeck_runner::{CommandSpawner, ControllerSettings, JobController, ProcessSpawner};
use http_body_util::BodyExt;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub const RESULT_LINE: &str = r#"{"input":{"FUZZ":"admin"},"position":1,"status":200,"length":42,"words":3,"lines":2,"content-type":"text/html","redirectlocation":"","url":"http://x/admin"}"#;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        port_attempts: 1,
        cors_origins: vec!["http://localhost:5000".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        engine_bin: "ffuf".to_string(),
        stop_grace_secs: 1,
        event_buffer: 1024,
        picker_open_cmd: None,
        picker_save_cmd: None,
    }
}

/// Picker that always returns the same answer.
pub struct FixedPicker(pub Option<&'static str>);

#[async_trait]
impl PathPicker for FixedPicker {
    async fn pick(&self, mode: PickMode) -> Result<String, PickError> {
        match (self.0, mode) {
            (Some(path), PickMode::Open) => Ok(path.to_string()),
            (Some(path), PickMode::Save) => Ok(format!("{path}.json")),
            (None, _) => Err(PickError::Cancelled),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub controller: JobController,
    /// Keeps the wordlist (and any engine script) alive for the test.
    pub dir: tempfile::TempDir,
}

impl TestApp {
    /// Path of an existing wordlist file inside the test directory.
    pub fn wordlist(&self) -> String {
        self.dir.path().join("words.txt").to_string_lossy().into_owned()
    }

    pub fn run_body(&self) -> serde_json::Value {
        serde_json::json!({
            "url": "http://x/FUZZ",
            "wordlists": [{ "path": self.wordlist() }],
        })
    }
}

/// Build the full application router around the given engine and picker.
///
/// Mirrors `main.rs`: same middleware stack, a live result collector.
pub fn build_test_app_with(
    spawner: Arc<dyn ProcessSpawner>,
    picker: Arc<dyn PathPicker>,
) -> TestApp {
    let dir = tempfile::tempdir().expect("create temp dir");
    build_app_in(dir, spawner, picker)
}

fn build_app_in(
    dir: tempfile::TempDir,
    spawner: Arc<dyn ProcessSpawner>,
    picker: Arc<dyn PathPicker>,
) -> TestApp {
    std::fs::write(dir.path().join("words.txt"), "admin\nlogin\n").expect("write wordlist");

    let config = test_config();
    let bus = Arc::new(EventBus::new(config.event_buffer));
    let store = Arc::new(ResultStore::new());
    tokio::spawn(ResultCollector::run(
        Arc::clone(&store),
        bus.receiver(),
        CancellationToken::new(),
    ));

    let controller = JobController::new(
        spawner,
        bus,
        store,
        ControllerSettings {
            stop_grace: std::time::Duration::from_secs(config.stop_grace_secs),
            ..ControllerSettings::default()
        },
    );
    let state = AppState {
        controller: controller.clone(),
        picker,
    };

    TestApp {
        router: build_app_router(state, &config),
        controller,
        dir,
    }
}

/// App whose engine binary does not exist.
pub fn build_test_app() -> TestApp {
    build_test_app_with(
        Arc::new(CommandSpawner::new("/nonexistent/ffuf")),
        Arc::new(FixedPicker(None)),
    )
}

/// App whose engine is a shell script with the given body.
#[cfg(unix)]
pub fn build_script_app(body: &str) -> TestApp {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().expect("create temp dir");
    let script = dir.path().join("engine.sh");
    std::fs::write(&script, format!("#!/bin/sh\n{body}")).expect("write engine script");
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
        .expect("make script executable");

    let engine = CommandSpawner::new(script.to_string_lossy().into_owned());
    build_app_in(dir, Arc::new(engine), Arc::new(FixedPicker(None)))
}

/// Wait until no job occupies the slot.
pub async fn settle(app: &TestApp) {
    tokio::time::timeout(
        std::time::Duration::from_secs(10),
        app.controller.wait_until_settled(),
    )
    .await
    .expect("job should settle");
}

pub async fn get(app: &Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn post_empty(app: &Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}
