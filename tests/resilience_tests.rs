//! Integration tests for the resilient fetch layer against in-process mock
//! upstreams.
//!
//! Each test spins up a small axum server on an ephemeral port that scripts
//! the upstream's behavior (always failing, failing then recovering, or
//! hanging), then drives `ResilientClient` at it with short backoff values.
//!
//! Run with: `cargo test --test resilience_tests`
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use reqwest::Method;
use tokio::net::TcpListener;

use crestline_api::fetch::{FetchError, ResilientClient, RetryPolicy};

/// Shared state for mock upstreams: counts requests and scripts responses.
#[derive(Clone)]
struct MockUpstream {
    hits: Arc<AtomicUsize>,
    /// Status returned while `hits < succeed_after`; afterwards 200.
    failure_status: StatusCode,
    /// Number of failing responses before recovery (`usize::MAX` = never).
    succeed_after: usize,
    /// Artificial handler delay, to trip per-attempt timeouts.
    delay: Duration,
}

impl MockUpstream {
    fn always(failure_status: StatusCode) -> Self {
        Self {
            hits: Arc::new(AtomicUsize::new(0)),
            failure_status,
            succeed_after: usize::MAX,
            delay: Duration::ZERO,
        }
    }

    fn recovering(failure_status: StatusCode, succeed_after: usize) -> Self {
        Self {
            succeed_after,
            ..Self::always(failure_status)
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::always(StatusCode::OK)
        }
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn mock_handler(State(mock): State<MockUpstream>) -> (StatusCode, &'static str) {
    let hit = mock.hits.fetch_add(1, Ordering::SeqCst);

    if !mock.delay.is_zero() {
        tokio::time::sleep(mock.delay).await;
    }

    if hit < mock.succeed_after {
        (mock.failure_status, "upstream failure")
    } else {
        (StatusCode::OK, "{\"ok\":true}")
    }
}

/// Serve the mock on an ephemeral port and return its address.
async fn spawn_mock(mock: MockUpstream) -> SocketAddr {
    let router = Router::new()
        .route("/endpoint", get(mock_handler))
        .route("/endpoint", post(mock_handler))
        .with_state(mock);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Short-fuse policy so tests complete quickly.
fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(Duration::from_secs(2), 2, Duration::from_millis(20))
}

fn url(addr: SocketAddr) -> String {
    format!("http://{addr}/endpoint")
}

#[tokio::test]
async fn get_on_persistent_503_exhausts_retries() {
    let mock = MockUpstream::always(StatusCode::SERVICE_UNAVAILABLE);
    let addr = spawn_mock(mock.clone()).await;
    let client = ResilientClient::new(fast_policy());

    let started = Instant::now();
    let result = client.execute(client.request(Method::GET, &url(addr))).await;
    let elapsed = started.elapsed();

    // Exactly max_retries + 1 attempts, then the synthesized status error.
    assert_eq!(mock.hits(), 3);
    match result {
        Err(FetchError::UpstreamStatus { status, .. }) => {
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        }
        other => panic!("expected UpstreamStatus error, got {other:?}"),
    }

    // Backoff slept 20ms + 40ms between the three attempts.
    assert!(
        elapsed >= Duration::from_millis(60),
        "expected >= 60ms of backoff, elapsed {elapsed:?}"
    );
}

#[tokio::test]
async fn error_display_names_method_and_url() {
    let mock = MockUpstream::always(StatusCode::SERVICE_UNAVAILABLE);
    let addr = spawn_mock(mock).await;
    let client = ResilientClient::new(fast_policy());

    let target = url(addr);
    let error = client
        .execute(client.request(Method::GET, &target))
        .await
        .unwrap_err();

    assert_eq!(error.to_string(), format!("HTTP 503 from GET {target}"));
}

#[tokio::test]
async fn post_on_503_returns_response_without_retry() {
    let mock = MockUpstream::always(StatusCode::SERVICE_UNAVAILABLE);
    let addr = spawn_mock(mock.clone()).await;
    let client = ResilientClient::new(fast_policy());

    let response = client
        .execute(client.request(Method::POST, &url(addr)))
        .await
        .unwrap();

    // A single attempt; the 503 is handed back as-is.
    assert_eq!(mock.hits(), 1);
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn get_on_500_returns_response_without_retry() {
    let mock = MockUpstream::always(StatusCode::INTERNAL_SERVER_ERROR);
    let addr = spawn_mock(mock.clone()).await;
    let client = ResilientClient::new(fast_policy());

    let response = client
        .execute(client.request(Method::GET, &url(addr)))
        .await
        .unwrap();

    // 500 is not in the retryable set even for idempotent methods.
    assert_eq!(mock.hits(), 1);
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn get_recovers_after_transient_failures() {
    let mock = MockUpstream::recovering(StatusCode::BAD_GATEWAY, 2);
    let addr = spawn_mock(mock.clone()).await;
    let client = ResilientClient::new(fast_policy());

    let response = client
        .execute(client.request(Method::GET, &url(addr)))
        .await
        .unwrap();

    assert_eq!(mock.hits(), 3);
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn per_attempt_timeout_aborts_and_retries() {
    let mock = MockUpstream::slow(Duration::from_millis(500));
    let addr = spawn_mock(mock.clone()).await;

    let policy = RetryPolicy::new(Duration::from_millis(50), 1, Duration::from_millis(10));
    let client = ResilientClient::new(policy);

    let result = client.execute(client.request(Method::GET, &url(addr))).await;

    // Both attempts started (fresh timer each) and both were cut off.
    assert_eq!(mock.hits(), 2);
    assert!(matches!(result, Err(FetchError::Timeout { .. })));
}

#[tokio::test]
async fn transport_failure_is_retried_for_non_idempotent_methods() {
    // Bind and immediately drop a listener so the port refuses connections.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let policy = RetryPolicy::new(Duration::from_secs(1), 2, Duration::from_millis(10));
    let client = ResilientClient::new(policy);

    let started = Instant::now();
    let result = client
        .execute(client.request(Method::POST, &format!("http://{addr}/endpoint")))
        .await;
    let elapsed = started.elapsed();

    // No request reached an upstream, so even a POST retries; the backoff
    // (10ms + 20ms) proves more than one attempt happened.
    assert!(matches!(result, Err(FetchError::Transport { .. })));
    assert!(
        elapsed >= Duration::from_millis(30),
        "expected >= 30ms of backoff, elapsed {elapsed:?}"
    );
}

#[tokio::test]
async fn success_on_first_attempt_sleeps_nothing() {
    let mock = MockUpstream::recovering(StatusCode::SERVICE_UNAVAILABLE, 0);
    let addr = spawn_mock(mock.clone()).await;
    let client = ResilientClient::new(fast_policy());

    let response = client
        .execute(client.request(Method::GET, &url(addr)))
        .await
        .unwrap();

    assert_eq!(mock.hits(), 1);
    assert_eq!(response.status(), StatusCode::OK);
}
