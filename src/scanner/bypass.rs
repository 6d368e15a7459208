// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Access Control Bypass Catalogue
 * Ordered request-rewriting techniques tried against 401/403 responses
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use reqwest::Method;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::Config;
use crate::http_client::HttpClient;
use crate::scanner::task::ScanResult;
use crate::scanner::worker::{extract_path, response_to_result};

/// One concrete rewritten request, fully precomputed.
pub(crate) struct BypassAttempt {
    pub name: &'static str,
    pub method: &'static str,
    pub url: String,
    pub extra_headers: Vec<(String, String)>,
    /// Requests whose paths WHATWG parsing would rewrite (dot segments) go
    /// through the raw transport; everything else uses the pooled client.
    pub verbatim: bool,
}

/// A successful bypass: the finding plus the body that came back and the
/// name of the strategy that worked.
pub struct BypassOutcome {
    pub result: ScanResult,
    pub body: String,
    pub strategy: &'static str,
}

const SPOOF_HEADERS: &[&str] = &[
    "X-Forwarded-For",
    "X-Forwarded-Host",
    "X-Custom-IP-Authorization",
    "Client-IP",
    "True-Client-IP",
    "X-Real-IP",
    "X-Remote-IP",
    "X-Remote-Addr",
    "X-ProxyUser-Ip",
    "X-Originating-IP",
];

/// Runs the bypass catalogue against a denied URL until one strategy yields
/// a success status or all are exhausted. First success wins.
pub async fn attempt_bypass_strategies(
    original_url: &str,
    user_agent: &str,
    cfg: &Config,
    client: &HttpClient,
    cancel: &CancellationToken,
) -> Option<BypassOutcome> {
    let path = extract_path(original_url);
    let base_url = extract_base_url(original_url);
    let attempts = build_bypass_attempts(&base_url, &path, original_url);

    for attempt in attempts {
        if cancel.is_cancelled() {
            return None;
        }

        let mut headers: Vec<(String, String)> =
            vec![("User-Agent".to_string(), user_agent.to_string())];
        for (name, value) in &cfg.custom_headers {
            headers.push((name.clone(), value.clone()));
        }
        headers.extend(attempt.extra_headers.iter().cloned());

        let response = if attempt.verbatim {
            client
                .execute_verbatim(
                    attempt.method,
                    &base_url,
                    &attempt.url[base_url.len()..],
                    &headers,
                    cfg.rate_limit,
                    cancel,
                )
                .await
        } else {
            let method = Method::from_bytes(attempt.method.as_bytes()).unwrap_or(Method::GET);
            client
                .execute(method, &attempt.url, &headers, cfg.rate_limit, cancel)
                .await
        };

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                debug!("Bypass strategy {} errored: {}", attempt.name, err);
                continue;
            }
        };

        if is_bypass_success(response.status_code) {
            let (mut result, body) =
                response_to_result(&attempt.url, attempt.method, user_agent, &response);
            result.url = format!("{} [BYPASS:{}]", original_url, attempt.name);
            result.method = "GET+BYPASS".to_string();
            return Some(BypassOutcome {
                result,
                body,
                strategy: attempt.name,
            });
        }
    }

    None
}

/// Status codes that indicate a rewritten request slipped past the control.
pub fn is_bypass_success(status_code: u16) -> bool {
    matches!(status_code, 200 | 301 | 302)
}

/// Assembles the full ordered catalogue for one denied URL.
pub(crate) fn build_bypass_attempts(
    base_url: &str,
    path: &str,
    original_url: &str,
) -> Vec<BypassAttempt> {
    let mut attempts = Vec::with_capacity(12);

    let mut spoof: Vec<(String, String)> = SPOOF_HEADERS
        .iter()
        .map(|name| (name.to_string(), "127.0.0.1".to_string()))
        .collect();
    spoof.push(("X-Original-URL".to_string(), path.to_string()));
    spoof.push(("X-Rewrite-URL".to_string(), path.to_string()));
    attempts.push(BypassAttempt {
        name: "headers",
        method: "GET",
        url: original_url.to_string(),
        extra_headers: spoof,
        verbatim: false,
    });

    let path_attempt = |name: &'static str, alt_path: String, verbatim: bool| BypassAttempt {
        name,
        method: "GET",
        url: format!("{}{}", base_url, alt_path),
        extra_headers: Vec::new(),
        verbatim,
    };

    attempts.push(path_attempt("path-normalize", format!("{}/.", path), true));
    attempts.push(path_attempt(
        "path-dotslash",
        format!("/./{}", path.trim_start_matches('/')),
        true,
    ));
    attempts.push(path_attempt(
        "path-double-slash",
        format!("//{}", path.trim_start_matches('/')),
        false,
    ));
    attempts.push(path_attempt("path-trailing-slash", format!("{}/", path), false));
    attempts.push(path_attempt("path-semicolon", format!("{};", path), false));
    attempts.push(path_attempt("path-semicolon-slash", format!("{}..;/", path), false));
    attempts.push(path_attempt("path-null-byte", format!("{}%00", path), false));
    attempts.push(path_attempt("path-hash", format!("{}%23", path), false));
    attempts.push(path_attempt("url-encode", encode_path_segment(path), false));

    if let Some(flipped) = manipulate_case(path) {
        attempts.push(path_attempt("case-upper", flipped, false));
    }

    attempts.push(BypassAttempt {
        name: "method-override",
        method: "POST",
        url: original_url.to_string(),
        extra_headers: vec![
            ("X-HTTP-Method-Override".to_string(), "GET".to_string()),
            ("X-Method-Override".to_string(), "GET".to_string()),
            ("X-HTTP-Method".to_string(), "GET".to_string()),
            ("Content-Length".to_string(), "0".to_string()),
        ],
        verbatim: false,
    });

    attempts
}

/// Scheme + host out of a full URL: `https://a.com/x` -> `https://a.com`.
pub(crate) fn extract_base_url(raw_url: &str) -> String {
    let Some(idx) = raw_url.find("://") else {
        return raw_url.to_string();
    };
    let rest = &raw_url[idx + 3..];
    match rest.find('/') {
        Some(slash) => raw_url[..idx + 3 + slash].to_string(),
        None => raw_url.to_string(),
    }
}

/// Percent-encodes every ASCII letter of the last path segment:
/// `/api/admin` -> `/api/%61%64%6d%69%6e`.
pub(crate) fn encode_path_segment(path: &str) -> String {
    let Some(last_slash) = path.rfind('/') else {
        return path.to_string();
    };

    let (prefix, segment) = path.split_at(last_slash + 1);
    if segment.is_empty() {
        return path.to_string();
    }

    let mut encoded = String::with_capacity(path.len() + segment.len() * 2);
    encoded.push_str(prefix);
    for ch in segment.chars() {
        if ch.is_ascii_alphabetic() {
            encoded.push_str(&format!("%{:02x}", ch as u32));
        } else {
            encoded.push(ch);
        }
    }
    encoded
}

/// Toggles the case of the first character of the last path segment:
/// `/admin` -> `/Admin`, `/Admin` -> `/admin`. None when toggling changes
/// nothing.
pub(crate) fn manipulate_case(path: &str) -> Option<String> {
    let last_slash = path.rfind('/')?;
    if last_slash >= path.len() - 1 {
        return None;
    }

    let (prefix, segment) = path.split_at(last_slash + 1);
    let first = segment.chars().next()?;

    let flipped = if first.is_ascii_lowercase() {
        first.to_ascii_uppercase()
    } else if first.is_ascii_uppercase() {
        first.to_ascii_lowercase()
    } else {
        return None;
    };

    let mut out = String::with_capacity(path.len());
    out.push_str(prefix);
    out.push(flipped);
    out.push_str(&segment[first.len_utf8()..]);
    Some(out)
}
