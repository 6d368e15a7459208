// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Transport Integration Tests
 * Retry policy, per-host rate limiting, circuit breaking, and body caps
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use reqwest::Method;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use capsaicin::circuit_breaker::CircuitBreaker;
use capsaicin::errors::TransportError;
use capsaicin::http_client::HttpClient;

fn host_key_of(uri: &str) -> String {
    let parsed = Url::parse(uri).unwrap();
    match parsed.port() {
        Some(port) => format!("{}:{}", parsed.host_str().unwrap(), port),
        None => parsed.host_str().unwrap().to_string(),
    }
}

#[tokio::test]
async fn test_retry_until_success() {
    let server = MockServer::start().await;
    let attempts = Arc::new(AtomicU32::new(0));
    let attempts_clone = Arc::clone(&attempts);

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(move |_req: &Request| {
            let count = attempts_clone.fetch_add(1, Ordering::SeqCst) + 1;
            if count < 3 {
                ResponseTemplate::new(500)
            } else {
                ResponseTemplate::new(200).set_body_string("success")
            }
        })
        .mount(&server)
        .await;

    let client = HttpClient::new(10, 3, 10).unwrap();
    let cancel = CancellationToken::new();
    let url = format!("{}/flaky", server.uri());

    let response = client
        .execute(Method::GET, &url, &[], 0, &cancel)
        .await
        .unwrap();

    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, b"success");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_permanent_5xx_returns_response_not_error() {
    let server = MockServer::start().await;
    let attempts = Arc::new(AtomicU32::new(0));
    let attempts_clone = Arc::clone(&attempts);

    Mock::given(method("GET"))
        .respond_with(move |_req: &Request| {
            attempts_clone.fetch_add(1, Ordering::SeqCst);
            ResponseTemplate::new(500)
        })
        .mount(&server)
        .await;

    let client = HttpClient::new(10, 2, 10).unwrap();
    let cancel = CancellationToken::new();

    let response = client
        .execute(Method::GET, &server.uri(), &[], 0, &cancel)
        .await
        .expect("5xx after retries is a response, not an error");

    assert_eq!(response.status_code, 500);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_per_host_rate_limiting_spacing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = HttpClient::new(10, 0, 10).unwrap();
    let cancel = CancellationToken::new();

    let mut stamps = Vec::new();
    for _ in 0..5 {
        client
            .execute(Method::GET, &server.uri(), &[], 2, &cancel)
            .await
            .unwrap();
        stamps.push(Instant::now());
    }

    for pair in stamps.windows(2) {
        let gap = pair[1].duration_since(pair[0]);
        assert!(
            gap >= Duration::from_millis(400),
            "requests too close together: {:?}",
            gap
        );
    }
}

#[tokio::test]
async fn test_unlimited_rate_is_fast() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = HttpClient::new(10, 0, 10).unwrap();
    let cancel = CancellationToken::new();

    let start = Instant::now();
    for _ in 0..10 {
        client
            .execute(Method::GET, &server.uri(), &[], 0, &cancel)
            .await
            .unwrap();
    }

    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_circuit_breaker_opens_and_short_circuits() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = HttpClient::new(10, 0, 10).unwrap();
    let cancel = CancellationToken::new();

    for _ in 0..10 {
        let _ = client
            .execute(Method::GET, &server.uri(), &[], 0, &cancel)
            .await;
    }

    let host = host_key_of(&server.uri());
    assert!(client.circuit_breaker().is_open(&host).await);

    let err = client
        .execute(Method::GET, &server.uri(), &[], 0, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::CircuitOpen { .. }));

    // The short-circuited request never reached the server.
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 10);
}

#[tokio::test]
async fn test_circuit_breaker_recovers_after_reset_window() {
    let server = MockServer::start().await;
    let attempts = Arc::new(AtomicU32::new(0));
    let attempts_clone = Arc::clone(&attempts);

    Mock::given(method("GET"))
        .respond_with(move |_req: &Request| {
            let count = attempts_clone.fetch_add(1, Ordering::SeqCst) + 1;
            if count <= 10 {
                ResponseTemplate::new(500)
            } else {
                ResponseTemplate::new(200).set_body_string("ok")
            }
        })
        .mount(&server)
        .await;

    let client = HttpClient::new(10, 0, 10).unwrap();
    let cancel = CancellationToken::new();
    let host = host_key_of(&server.uri());

    for _ in 0..10 {
        let _ = client
            .execute(Method::GET, &server.uri(), &[], 0, &cancel)
            .await;
    }
    assert!(client.circuit_breaker().is_open(&host).await);

    client
        .circuit_breaker()
        .backdate_last_failure(&host, Duration::from_secs(31))
        .await;

    let response = client
        .execute(Method::GET, &server.uri(), &[], 0, &cancel)
        .await
        .unwrap();
    assert_eq!(response.status_code, 200);
    assert!(!client.circuit_breaker().is_open(&host).await);
}

#[tokio::test]
async fn test_breaker_threshold_and_reset_primitives() {
    let cb = CircuitBreaker::new(5, Duration::from_secs(1));
    let host = "example.com";

    for _ in 0..5 {
        cb.record_failure(host).await;
    }
    assert!(cb.is_open(host).await);

    cb.backdate_last_failure(host, Duration::from_secs(2)).await;
    assert!(!cb.is_open(host).await);
    assert_eq!(cb.failure_count(host).await, 0);
}

#[tokio::test]
async fn test_body_size_cap() {
    let server = MockServer::start().await;
    let large_body = vec![b'A'; 5 * 1024 * 1024];
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(large_body))
        .mount(&server)
        .await;

    let client = HttpClient::new(10, 0, 1).unwrap();
    let cancel = CancellationToken::new();

    let response = client
        .execute(Method::GET, &server.uri(), &[], 0, &cancel)
        .await
        .unwrap();

    assert!(response.body.len() <= 1024 * 1024);
}

#[tokio::test]
async fn test_redirects_are_not_followed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/redirect"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/destination"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/destination"))
        .respond_with(ResponseTemplate::new(200).set_body_string("destination"))
        .mount(&server)
        .await;

    let client = HttpClient::new(10, 0, 10).unwrap();
    let cancel = CancellationToken::new();
    let url = format!("{}/redirect", server.uri());

    let response = client
        .execute(Method::GET, &url, &[], 0, &cancel)
        .await
        .unwrap();

    assert_eq!(response.status_code, 301);
    assert_eq!(response.header("Location"), Some("/destination"));
}

#[tokio::test]
async fn test_connection_refused_is_an_error() {
    let client = HttpClient::new(2, 0, 10).unwrap();
    let cancel = CancellationToken::new();

    let result = client
        .execute(Method::GET, "http://127.0.0.1:1", &[], 0, &cancel)
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_invalid_url_is_rejected() {
    let client = HttpClient::new(10, 0, 10).unwrap();
    let cancel = CancellationToken::new();

    let err = client
        .execute(Method::GET, "not a url", &[], 0, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::InvalidUrl { .. }));
}

#[tokio::test]
async fn test_cancelled_request_fails_fast() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = HttpClient::new(10, 3, 10).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = client
        .execute(Method::GET, &server.uri(), &[], 0, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Cancelled));
}

#[tokio::test]
async fn test_verbatim_request_preserves_dot_segments() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // A raw listener captures the request line byte-for-byte; an HTTP
    // framework would re-parse (and normalize) the path before we could
    // inspect it.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 4096];
        let n = stream.read(&mut buf).await.unwrap();
        let request = String::from_utf8_lossy(&buf[..n]).to_string();
        stream
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok")
            .await
            .unwrap();
        request
    });

    let client = HttpClient::new(10, 0, 10).unwrap();
    let cancel = CancellationToken::new();
    let base_url = format!("http://{}", addr);

    let response = client
        .execute_verbatim("GET", &base_url, "/admin/.", &[], 0, &cancel)
        .await
        .unwrap();
    assert_eq!(response.status_code, 200);

    let request = server.await.unwrap();
    assert!(
        request.starts_with("GET /admin/. HTTP/1.1\r\n"),
        "request line rewritten: {:?}",
        request.lines().next()
    );
}
