//! Guarded local service detection against mock backends.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use callguard::config::GuardConfig;
use callguard::{App, CircuitState, GuardError};

mod common;

fn config_for(addr: SocketAddr) -> GuardConfig {
    let mut config = GuardConfig::default();
    config.probe.host = "http://127.0.0.1".to_string();
    config.probe.port = addr.port();
    config
}

#[tokio::test]
async fn test_any_status_means_listening() {
    let hits = Arc::new(Mutex::new(Vec::new()));
    let recorded = hits.clone();
    let addr = common::start_programmable_backend(move |request| {
        let recorded = recorded.clone();
        async move {
            recorded.lock().unwrap().push(request.path);
            (404, "not found".to_string())
        }
    })
    .await;

    let app = App::new(config_for(addr)).unwrap();
    let detected = app.detect_local_service().await.unwrap();

    assert_eq!(detected, Some(format!("http://127.0.0.1:{}", addr.port())));
    assert_eq!(*hits.lock().unwrap(), vec!["/v1/models".to_string()]);
}

#[tokio::test]
async fn test_nothing_listening() {
    let addr = common::unused_addr().await;
    let mut config = config_for(addr);
    config.model.fallback_url = "http://fallback:11434".to_string();
    let app = App::new(config).unwrap();

    assert_eq!(app.detect_local_service().await.unwrap(), None);
    assert_eq!(app.probe_breaker().snapshot().consecutive_failures, 0);
    assert_eq!(app.resolve_base_url().await, "http://fallback:11434");
}

#[tokio::test]
async fn test_detected_url_is_used_for_invocation() {
    let addr = common::start_programmable_backend(|_| async { (200, "Ollama is running".to_string()) }).await;
    let app = App::new(config_for(addr)).unwrap();

    assert_eq!(app.resolve_base_url().await, format!("http://127.0.0.1:{}", addr.port()));
}

#[tokio::test]
async fn test_hanging_server_times_out() {
    let addr = common::start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        (200, String::new())
    })
    .await;

    let mut config = config_for(addr);
    config.probe.request_timeout_secs = 5.0;
    config.timeouts.probe_secs = 0.3;
    let app = App::new(config).unwrap();

    let started = std::time::Instant::now();
    let result = app.detect_local_service().await;

    assert!(matches!(result, Err(GuardError::Timeout(_))));
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(app.probe_breaker().snapshot().consecutive_failures, 1);
}

#[tokio::test]
async fn test_probe_breaker_opens_after_repeated_timeouts() {
    let requests = Arc::new(AtomicU32::new(0));
    let counter = requests.clone();
    let addr = common::start_programmable_backend(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            (200, String::new())
        }
    })
    .await;

    let mut config = config_for(addr);
    config.probe.request_timeout_secs = 5.0;
    config.timeouts.probe_secs = 0.2;
    config.model.fallback_url = "http://fallback:11434".to_string();
    let app = App::new(config).unwrap();

    for _ in 0..3 {
        assert!(matches!(app.detect_local_service().await, Err(GuardError::Timeout(_))));
    }
    assert_eq!(app.probe_breaker().state(), CircuitState::Open);

    // Fast-fails without touching the server, and resolution still falls back.
    let started = std::time::Instant::now();
    assert!(matches!(app.detect_local_service().await, Err(GuardError::CircuitOpen(_))));
    assert!(started.elapsed() < Duration::from_millis(100));
    assert_eq!(app.resolve_base_url().await, "http://fallback:11434");
    assert_eq!(requests.load(Ordering::SeqCst), 3);
}
