//! Integration tests for the job control endpoints.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{body_json, get, post_empty, post_json};
use serde_json::json;

// ---------------------------------------------------------------------------
// Test: status of a fresh server is idle with no job details
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_starts_idle() {
    let app = common::build_test_app();
    let json = body_json(get(&app.router, "/api/status").await).await;

    assert_eq!(json["state"], "idle");
    assert_eq!(json["result_count"], 0);
    assert_eq!(json["missed_events"], 0);
    assert!(json.get("job_id").is_none());
    assert!(json.get("command").is_none());
}

// ---------------------------------------------------------------------------
// Test: run without a URL is rejected with 400 and nothing starts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn run_without_url_is_rejected() {
    let app = common::build_test_app();
    let mut body = app.run_body();
    body["url"] = json!("   ");

    let response = post_json(&app.router, "/api/run", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["accepted"], false);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["message"].as_str().unwrap().contains("URL"));
    assert_eq!(app.controller.status().as_str(), "idle");
}

// ---------------------------------------------------------------------------
// Test: run with a missing wordlist file is rejected with 400
// ---------------------------------------------------------------------------

#[tokio::test]
async fn run_with_missing_wordlist_is_rejected() {
    let app = common::build_test_app();
    let body = json!({
        "url": "http://x/FUZZ",
        "wordlists": [{ "path": "/nonexistent/words.txt" }],
    });

    let response = post_json(&app.router, "/api/run", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["accepted"], false);
    assert_eq!(json["message"], "Wordlist file not found: /nonexistent/words.txt");
}

// ---------------------------------------------------------------------------
// Test: a body that is not JSON is rejected with the run response shape
// ---------------------------------------------------------------------------

#[tokio::test]
async fn run_with_malformed_body_is_rejected() {
    let app = common::build_test_app();

    let response = post_empty(&app.router, "/api/run").await;
    assert!(response.status().is_client_error());

    let json = body_json(response).await;
    assert_eq!(json["accepted"], false);
    assert_eq!(json["code"], "BAD_REQUEST");
}

// ---------------------------------------------------------------------------
// Test: a missing engine binary is a 500 and leaves the slot in error
// ---------------------------------------------------------------------------

#[tokio::test]
async fn run_with_missing_engine_returns_500() {
    let app = common::build_test_app();

    let response = post_json(&app.router, "/api/run", app.run_body()).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(response).await;
    assert_eq!(json["accepted"], false);
    assert_eq!(json["code"], "SPAWN_FAILED");
    assert!(json["message"].as_str().unwrap().contains("not found"));

    let status = body_json(get(&app.router, "/api/status").await).await;
    assert_eq!(status["state"], "error");
}

// ---------------------------------------------------------------------------
// Test: stop with nothing running acknowledges not_running
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stop_when_idle_is_not_running() {
    let app = common::build_test_app();

    let response = post_empty(&app.router, "/api/stop").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "not_running" }));
}

// ---------------------------------------------------------------------------
// Test: preview builds the command without starting anything
// ---------------------------------------------------------------------------

#[tokio::test]
async fn preview_returns_argv_and_command() {
    let app = common::build_test_app();
    let body = json!({
        "url": "http://x/FUZZ",
        "method": "post",
        "wordlists": [{ "path": "/tmp/w.txt" }, { "path": "/tmp/admins.txt", "keyword": "ADMIN" }],
        "mc": "200,301",
        "threads": "20",
    });

    let response = post_json(&app.router, "/api/preview", body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let argv: Vec<&str> = json["argv"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(
        argv,
        [
            "-u", "http://x/FUZZ", "-w", "/tmp/w.txt", "-w", "/tmp/admins.txt:ADMIN", "-X",
            "POST", "-mc", "200,301", "-t", "20", "-timeout", "10", "-json",
        ]
    );
    assert!(json["command"]
        .as_str()
        .unwrap()
        .starts_with("/nonexistent/ffuf -u http://x/FUZZ -w /tmp/w.txt"));
    assert_eq!(app.controller.status().as_str(), "idle");
}

// ---------------------------------------------------------------------------
// Test: preview of an invalid config returns the standard error body
// ---------------------------------------------------------------------------

#[tokio::test]
async fn preview_rejects_invalid_threads() {
    let app = common::build_test_app();
    let mut body = app.run_body();
    body["threads"] = json!("zero");

    let response = post_json(&app.router, "/api/preview", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Script-backed engine (Unix only)
// ---------------------------------------------------------------------------

#[cfg(unix)]
mod with_engine {
    use super::*;
    use crate::common::{self, RESULT_LINE};

    // -----------------------------------------------------------------------
    // Test: a finished run exposes its results and final status
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn run_collects_results() {
        let app = common::build_script_app(&format!("echo '{RESULT_LINE}'\necho 'all done'\n"));

        let response = post_json(&app.router, "/api/run", app.run_body()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["accepted"], true);
        assert!(json["job_id"].is_string());
        assert!(json["command"].as_str().unwrap().contains("-u http://x/FUZZ"));

        common::settle(&app).await;

        // The collector runs concurrently; give it a moment to catch up.
        let mut results = serde_json::Value::Null;
        for _ in 0..100 {
            results = body_json(get(&app.router, "/api/results").await).await;
            if results["data"].as_array().is_some_and(|d| !d.is_empty()) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let data = results["data"].as_array().expect("results envelope");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["status_code"], 200);
        assert_eq!(data[0]["input_values"]["FUZZ"], "admin");

        let status = body_json(get(&app.router, "/api/status").await).await;
        assert_eq!(status["state"], "finished");
        assert_eq!(status["result_count"], 1);
        assert_eq!(status["job_id"], json["job_id"]);
    }

    // -----------------------------------------------------------------------
    // Test: a second run while one is active is a 409; stop is idempotent
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn concurrent_run_conflicts_and_stop_is_idempotent() {
        let app = common::build_script_app("exec sleep 30\n");

        let first = post_json(&app.router, "/api/run", app.run_body()).await;
        assert_eq!(first.status(), StatusCode::OK);

        let second = post_json(&app.router, "/api/run", app.run_body()).await;
        assert_eq!(second.status(), StatusCode::CONFLICT);
        let json = body_json(second).await;
        assert_eq!(json["accepted"], false);
        assert_eq!(json["code"], "ALREADY_RUNNING");
        assert_eq!(json["message"], "Process already running (running)");

        for _ in 0..2 {
            let response = post_empty(&app.router, "/api/stop").await;
            assert_eq!(body_json(response).await["status"], "stopping");
        }

        common::settle(&app).await;
        let response = post_empty(&app.router, "/api/stop").await;
        assert_eq!(body_json(response).await["status"], "not_running");

        let status = body_json(get(&app.router, "/api/status").await).await;
        assert_eq!(status["state"], "finished");
        assert!(status["ended_at"].is_string());
    }
}
