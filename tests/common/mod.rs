#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use hot100_tracker::config::{Config, TrackerConfig};
use hot100_tracker::db::config::DbConfig;
use hot100_tracker::{build_state, create_app};
use hot100_tracker::state::AppState;

pub struct TestApp {
    pub state: AppState,
}

pub fn test_config(tracker: TrackerConfig) -> Config {
    Config {
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        log_level: "warn".to_string(),
        file_logs: false,
        log_dir: "./logs".to_string(),
        seed_catalog: true,
        database: DbConfig::memory(),
        tracker,
    }
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(TrackerConfig::default()).await
}

pub async fn create_test_app_with(tracker: TrackerConfig) -> TestApp {
    let state = build_state(&test_config(tracker)).await.unwrap();
    TestApp { state }
}

impl TestApp {
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = create_app(self.state.clone())
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::POST, uri, None).await
    }

    pub async fn put(&self, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, body).await
    }
}
