// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Resilient HTTP Transport
 * Connection pooling, per-host rate limiting, retry with jittered backoff,
 * and per-host circuit breaking behind a single client
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use anyhow::{Context, Result};
use rand::Rng;
use reqwest::{Client, Method};
use std::collections::HashMap;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::circuit_breaker::CircuitBreaker;
use crate::errors::TransportError;
use crate::rate_limiter::HostRateLimiters;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(30);
const POOL_MAX_IDLE_PER_HOST: usize = 50;
const TCP_KEEPALIVE: Duration = Duration::from_secs(30);
const BACKOFF_CEILING: Duration = Duration::from_secs(30);

/// A fully-read HTTP exchange. Header names are lowercased; `cookies` holds
/// the names of every `Set-Cookie` the server sent. The body is truncated
/// silently at the transport's configured cap.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub cookies: Vec<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(|s| s.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

/// The scan's single transport. Redirects are never followed; a 3xx comes
/// back to the caller as-is. 5xx responses count as host failures for the
/// breaker but are returned as successful exchanges once retries run out.
pub struct HttpClient {
    client: Client,
    timeout: Duration,
    retry_attempts: u32,
    max_body_bytes: usize,
    limiters: HostRateLimiters,
    breaker: CircuitBreaker,
}

impl HttpClient {
    pub fn new(timeout_secs: u64, retry_attempts: u32, max_response_mb: usize) -> Result<Self> {
        let timeout = Duration::from_secs(timeout_secs);

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .tcp_keepalive(TCP_KEEPALIVE)
            .tcp_nodelay(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            timeout,
            retry_attempts,
            max_body_bytes: max_response_mb * 1024 * 1024,
            limiters: HostRateLimiters::new(),
            breaker: CircuitBreaker::default(),
        })
    }

    /// Replace the breaker configuration. Used by tests that need a short
    /// reset window.
    pub fn with_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Issue a request through the full pipeline: breaker check, per-host
    /// token acquisition, then up to `retry_attempts` retries with jittered
    /// exponential backoff.
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        headers: &[(String, String)],
        rate: u32,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, TransportError> {
        let host = host_key(url)?;
        let plan = AttemptPlan::Standard {
            method,
            url,
            headers,
        };
        self.run_pipeline(&host, plan, rate, cancel).await
    }

    /// Issue a request whose path must travel on the wire byte-for-byte.
    /// WHATWG URL parsing removes dot segments, so requests like
    /// `GET /admin/.` cannot survive the normal client; this variant writes
    /// the request line directly to the socket. Same breaker, limiter, and
    /// retry pipeline as `execute`.
    pub async fn execute_verbatim(
        &self,
        method: &str,
        base_url: &str,
        raw_path: &str,
        headers: &[(String, String)],
        rate: u32,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, TransportError> {
        let target = RawTarget::from_base_url(base_url)?;
        let host = target.host_key();
        let plan = AttemptPlan::Verbatim {
            method,
            target: &target,
            path: raw_path,
            headers,
        };
        self.run_pipeline(&host, plan, rate, cancel).await
    }

    async fn run_pipeline(
        &self,
        host: &str,
        plan: AttemptPlan<'_>,
        rate: u32,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, TransportError> {
        if self.breaker.is_open(host).await {
            return Err(TransportError::CircuitOpen {
                host: host.to_string(),
            });
        }

        self.limiters.acquire(host, rate, cancel).await?;

        for attempt in 0..=self.retry_attempts {
            if attempt > 0 {
                let backoff = jitter(attempt - 1);
                debug!("Retry {} for {} after {:?}", attempt, host, backoff);
                tokio::select! {
                    _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                    _ = tokio::time::sleep(backoff) => {}
                }
            }

            if cancel.is_cancelled() {
                return Err(TransportError::Cancelled);
            }

            match self.attempt(&plan).await {
                Err(err) => {
                    if attempt == self.retry_attempts {
                        self.breaker.record_failure(host).await;
                        return Err(err);
                    }
                }
                Ok(response) => {
                    if response.status_code >= 500 {
                        self.breaker.record_failure(host).await;
                        if attempt == self.retry_attempts {
                            return Ok(response);
                        }
                        continue;
                    }
                    self.breaker.record_success(host).await;
                    return Ok(response);
                }
            }
        }

        Err(TransportError::MalformedResponse {
            reason: format!("request failed after {} attempts", self.retry_attempts + 1),
        })
    }

    async fn attempt(&self, plan: &AttemptPlan<'_>) -> Result<HttpResponse, TransportError> {
        match plan {
            AttemptPlan::Standard {
                method,
                url,
                headers,
            } => self.send_standard(method.clone(), url, headers).await,
            AttemptPlan::Verbatim {
                method,
                target,
                path,
                headers,
            } => self.send_verbatim(method, target, path, headers).await,
        }
    }

    async fn send_standard(
        &self,
        method: Method,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.request(method, url);
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut response = builder.send().await?;

        let status_code = response.status().as_u16();
        let mut header_map = HashMap::with_capacity(response.headers().len());
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                header_map.insert(name.as_str().to_string(), value.to_string());
            }
        }
        let cookies = response
            .headers()
            .get_all(reqwest::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(cookie_name)
            .collect();

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() >= self.max_body_bytes {
                let take = self.max_body_bytes - body.len();
                body.extend_from_slice(&chunk[..take]);
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok(HttpResponse {
            status_code,
            headers: header_map,
            cookies,
            body,
        })
    }

    async fn send_verbatim(
        &self,
        method: &str,
        target: &RawTarget,
        path: &str,
        headers: &[(String, String)],
    ) -> Result<HttpResponse, TransportError> {
        let exchange = async {
            let addr = format!("{}:{}", target.host, target.port);
            let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr))
                .await
                .map_err(|_| TransportError::ConnectTimeout {
                    host: target.host.clone(),
                })??;

            let request = build_raw_request(method, path, &target.host_header(), headers);

            let raw = if target.https {
                let connector =
                    tokio_native_tls::TlsConnector::from(native_tls::TlsConnector::new()?);
                let mut tls = connector.connect(&target.host, stream).await?;
                tls.write_all(&request).await?;
                read_limited(&mut tls, self.max_body_bytes + 64 * 1024).await?
            } else {
                let mut stream = stream;
                stream.write_all(&request).await?;
                read_limited(&mut stream, self.max_body_bytes + 64 * 1024).await?
            };

            parse_raw_response(&raw, self.max_body_bytes)
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "request timed out",
                ))
            })?
    }
}

enum AttemptPlan<'a> {
    Standard {
        method: Method,
        url: &'a str,
        headers: &'a [(String, String)],
    },
    Verbatim {
        method: &'a str,
        target: &'a RawTarget,
        path: &'a str,
        headers: &'a [(String, String)],
    },
}

/// Connection coordinates for a verbatim-path request.
struct RawTarget {
    https: bool,
    host: String,
    port: u16,
}

impl RawTarget {
    fn from_base_url(base_url: &str) -> Result<Self, TransportError> {
        let parsed = Url::parse(base_url).map_err(|_| TransportError::InvalidUrl {
            url: base_url.to_string(),
        })?;
        let https = parsed.scheme() == "https";
        let host = parsed
            .host_str()
            .ok_or_else(|| TransportError::InvalidUrl {
                url: base_url.to_string(),
            })?
            .to_string();
        let port = parsed
            .port()
            .unwrap_or(if https { 443 } else { 80 });
        Ok(Self { https, host, port })
    }

    fn host_key(&self) -> String {
        let default = if self.https { 443 } else { 80 };
        if self.port == default {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    fn host_header(&self) -> String {
        self.host_key()
    }
}

/// Breaker and limiter key: `host` or `host:port` for non-default ports.
fn host_key(url: &str) -> Result<String, TransportError> {
    let parsed = Url::parse(url).map_err(|_| TransportError::InvalidUrl {
        url: url.to_string(),
    })?;
    let host = parsed
        .host_str()
        .ok_or_else(|| TransportError::InvalidUrl {
            url: url.to_string(),
        })?;
    match parsed.port() {
        Some(port) => Ok(format!("{}:{}", host, port)),
        None => Ok(host.to_string()),
    }
}

/// Uniform draw from [0, min(2^attempt seconds, 30 s)).
fn jitter(attempt: u32) -> Duration {
    let base = Duration::from_secs(1u64 << attempt.min(5)).min(BACKOFF_CEILING);
    let nanos = base.as_nanos() as u64;
    let mut rng = rand::rng();
    Duration::from_nanos(rng.random_range(0..nanos.max(1)))
}

/// Cookie name out of a raw `Set-Cookie` value.
fn cookie_name(set_cookie: &str) -> Option<String> {
    let pair = set_cookie.split(';').next()?;
    let name = pair.split('=').next()?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn build_raw_request(
    method: &str,
    path: &str,
    host_header: &str,
    headers: &[(String, String)],
) -> Vec<u8> {
    let mut request = Vec::with_capacity(256);
    request.extend_from_slice(format!("{} {} HTTP/1.1\r\n", method, path).as_bytes());
    request.extend_from_slice(format!("Host: {}\r\n", host_header).as_bytes());
    for (name, value) in headers {
        request.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
    }
    request.extend_from_slice(b"Accept: */*\r\nConnection: close\r\n\r\n");
    request
}

async fn read_limited<R: AsyncRead + Unpin>(
    stream: &mut R,
    limit: usize,
) -> Result<Vec<u8>, std::io::Error> {
    let mut buf = Vec::with_capacity(16 * 1024);
    let mut chunk = [0u8; 8192];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.len() >= limit {
            break;
        }
    }
    Ok(buf)
}

/// Minimal HTTP/1.1 response parse: status line, lowercased headers, body
/// after the blank line truncated to the cap. Sufficient for the verbatim
/// path, which sends `Connection: close` and reads to EOF.
fn parse_raw_response(data: &[u8], max_body: usize) -> Result<HttpResponse, TransportError> {
    let separator = data
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or_else(|| TransportError::MalformedResponse {
            reason: "missing header separator".to_string(),
        })?;

    let header_text = String::from_utf8_lossy(&data[..separator]);
    let mut lines = header_text.split("\r\n").filter(|l| !l.is_empty());

    let status_line = lines.next().ok_or_else(|| TransportError::MalformedResponse {
        reason: "empty response".to_string(),
    })?;
    let status_code = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| TransportError::MalformedResponse {
            reason: format!("invalid status line: {}", status_line),
        })?;

    let mut headers = HashMap::new();
    let mut cookies = Vec::new();
    for line in lines {
        if let Some(colon) = line.find(':') {
            let name = line[..colon].trim().to_lowercase();
            let value = line[colon + 1..].trim().to_string();
            if name == "set-cookie" {
                if let Some(cookie) = cookie_name(&value) {
                    cookies.push(cookie);
                }
            }
            headers.insert(name, value);
        }
    }

    let mut body = data[separator + 4..].to_vec();
    body.truncate(max_body);

    Ok(HttpResponse {
        status_code,
        headers,
        cookies,
        body,
    })
}
