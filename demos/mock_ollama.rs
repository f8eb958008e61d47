//! Stand-in Ollama server for trying the CLI without a real model.
//!
//! `MOCK_PORT` (default 11434), `MOCK_DELAY_MS` (default 0) and
//! `MOCK_FAIL=1` (answer every generate call with 500) control its behaviour.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[tokio::main]
async fn main() {
    let port: u16 = env_or("MOCK_PORT", 11434);
    let delay = Duration::from_millis(env_or("MOCK_DELAY_MS", 0));
    let fail = env_or("MOCK_FAIL", 0u8) == 1;

    let app = Router::new()
        .route("/", get(|| async { "Ollama is running" }))
        .route("/v1/models", get(|| async { Json(json!({ "object": "list", "data": [] })) }))
        .route(
            "/api/generate",
            post(move |Json(body): Json<Value>| async move {
                tokio::time::sleep(delay).await;
                if fail {
                    return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "mock failure" })));
                }
                let prompt = body["prompt"].as_str().unwrap_or_default();
                let reply = json!({
                    "model": body["model"],
                    "response": format!("echo: {}", prompt),
                    "done": true,
                });
                (StatusCode::OK, Json(reply))
            }),
        );

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!("Mock Ollama listening on http://{} (delay {:?}, fail {})", addr, delay, fail);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
