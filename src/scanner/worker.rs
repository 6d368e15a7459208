// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scan Worker
 * Consumes tasks, classifies responses, runs the detection pipeline, and
 * feeds directory discoveries back for recursion
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use chrono::{SecondsFormat, Utc};
use rand::Rng;
use reqwest::Method;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::Config;
use crate::detection::{
    self, detect_secrets_detailed, detect_tech_names, detect_waf, matches_signature,
    CalibrationCache, ResponseSignature, Severity,
};
use crate::http_client::{HttpClient, HttpResponse};
use crate::scanner::bypass::attempt_bypass_strategies;
use crate::scanner::stats::Stats;
use crate::scanner::task::{Confidence, ScanResult, Task};
use crate::scanner::TaskCounter;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

const MAX_CONSECUTIVE_ERRORS: u32 = 5;
const ERROR_COOLDOWN: Duration = Duration::from_secs(2);

fn random_user_agent() -> &'static str {
    let mut rng = rand::rng();
    USER_AGENTS[rng.random_range(0..USER_AGENTS.len())]
}

/// Everything one worker needs, shared across the pool.
pub(crate) struct WorkerContext {
    pub cfg: Arc<Config>,
    pub client: Arc<HttpClient>,
    pub cal_cache: Arc<CalibrationCache>,
    pub stats: Arc<Stats>,
    pub outstanding: Arc<TaskCounter>,
    pub cancel: CancellationToken,
    pub scan_done: CancellationToken,
    pub tasks: Arc<Mutex<mpsc::Receiver<Task>>>,
    pub results_tx: mpsc::Sender<ScanResult>,
    pub new_tasks_tx: Option<mpsc::Sender<Task>>,
}

pub(crate) async fn worker_loop(ctx: WorkerContext) {
    let mut consecutive_errors = 0u32;

    loop {
        let task = tokio::select! {
            _ = ctx.scan_done.cancelled() => None,
            task = async { ctx.tasks.lock().await.recv().await } => task,
        };
        let Some(task) = task else {
            break;
        };

        // On cancellation keep draining so every queued task is accounted
        // for, but stop doing I/O.
        if ctx.cancel.is_cancelled() {
            ctx.outstanding.done();
            continue;
        }

        let url = format!(
            "{}/{}",
            task.target_url.trim_end_matches('/'),
            task.path.trim_start_matches('/')
        );
        let user_agent = random_user_agent();

        let outcome = make_request(&url, "GET", user_agent, &ctx.cfg, &ctx.client, &ctx.cancel).await;
        ctx.stats.increment_processed();

        let (mut result, body, response) = match outcome {
            Ok(parts) => parts,
            Err(err) => {
                debug!("Request to {} failed: {}", url, err);
                ctx.stats.increment_errors();
                consecutive_errors += 1;
                if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    tokio::select! {
                        _ = ctx.cancel.cancelled() => {}
                        _ = tokio::time::sleep(ERROR_COOLDOWN) => {}
                    }
                    consecutive_errors = 0;
                }
                ctx.outstanding.done();
                continue;
            }
        };
        consecutive_errors = 0;

        let signatures = ctx
            .cal_cache
            .get(&task.target_url)
            .await
            .unwrap_or_default();
        if matches_signature(result.status_code, result.size, &signatures) {
            ctx.outstanding.done();
            continue;
        }

        if result.status_code == 405 && !ctx.cfg.safe_mode {
            fuzz_methods(&ctx, &url, user_agent, &signatures).await;
        }

        if is_interesting(result.status_code) {
            ctx.stats.increment_found();

            let mut highest_secret = None;
            if result.status_code == 200 && !body.is_empty() {
                let matches = detect_secrets_detailed(&body);
                if !matches.is_empty() {
                    result.secret_found = true;
                    result.secret_types = matches.iter().map(|m| m.name.clone()).collect();
                    highest_secret = matches.iter().map(|m| m.severity).max_by_key(|s| s.rank());
                    ctx.stats.increment_secrets();
                }
            }

            let techs = detect_tech_names(&response, &body);
            if !techs.is_empty() {
                result.technologies = techs;
            }

            if !ctx.cfg.safe_mode && matches!(result.status_code, 401 | 403) {
                if let Some(outcome) =
                    attempt_bypass_strategies(&url, user_agent, &ctx.cfg, &ctx.client, &ctx.cancel)
                        .await
                {
                    let mut bypass_result = outcome.result;
                    bypass_result.critical = true;

                    let mut bypass_secret = None;
                    let matches = detect_secrets_detailed(&outcome.body);
                    if !matches.is_empty() {
                        bypass_result.secret_found = true;
                        bypass_result.secret_types =
                            matches.iter().map(|m| m.name.clone()).collect();
                        bypass_secret =
                            matches.iter().map(|m| m.severity).max_by_key(|s| s.rank());
                        ctx.stats.increment_secrets();
                    }

                    ctx.stats.increment_found();
                    assign_severity_and_confidence(&mut bypass_result, bypass_secret, &signatures);
                    tokio::select! {
                        _ = ctx.cancel.cancelled() => {}
                        _ = ctx.results_tx.send(bypass_result) => {}
                    }
                }
            }

            if ctx.cfg.max_depth > 0
                && task.depth < ctx.cfg.max_depth
                && is_directory(result.status_code, &url)
            {
                if let Some(new_tasks_tx) = &ctx.new_tasks_tx {
                    let dir_path = extract_path(&url);
                    ctx.outstanding.add(1);
                    let new_task = Task {
                        target_url: task.target_url.clone(),
                        path: dir_path,
                        depth: task.depth + 1,
                    };
                    tokio::select! {
                        _ = ctx.cancel.cancelled() => ctx.outstanding.done(),
                        sent = new_tasks_tx.send(new_task) => {
                            if sent.is_err() {
                                ctx.outstanding.done();
                            }
                        }
                    }
                }
            }

            assign_severity_and_confidence(&mut result, highest_secret, &signatures);
            tokio::select! {
                _ = ctx.cancel.cancelled() => {}
                _ = ctx.results_tx.send(result) => {}
            }
        }

        ctx.outstanding.done();
    }
}

/// Fuzzes alternate HTTP methods after a 405. The first method answering
/// with a success status is emitted as a critical finding and ends the loop.
async fn fuzz_methods(
    ctx: &WorkerContext,
    url: &str,
    user_agent: &str,
    signatures: &[ResponseSignature],
) {
    for method in ["POST", "PUT", "DELETE", "PATCH"] {
        if ctx.cancel.is_cancelled() {
            return;
        }

        let Ok((mut result, body, response)) =
            make_request(url, method, user_agent, &ctx.cfg, &ctx.client, &ctx.cancel).await
        else {
            continue;
        };

        if !matches!(result.status_code, 200 | 201 | 204) {
            continue;
        }

        result.method = method.to_string();
        result.critical = true;

        let mut highest_secret = None;
        let matches = detect_secrets_detailed(&body);
        if !matches.is_empty() {
            result.secret_found = true;
            result.secret_types = matches.iter().map(|m| m.name.clone()).collect();
            highest_secret = matches.iter().map(|m| m.severity).max_by_key(|s| s.rank());
            ctx.stats.increment_secrets();
        }

        let techs = detect_tech_names(&response, &body);
        if !techs.is_empty() {
            result.technologies = techs;
        }

        ctx.stats.increment_found();
        assign_severity_and_confidence(&mut result, highest_secret, signatures);
        tokio::select! {
            _ = ctx.cancel.cancelled() => {}
            _ = ctx.results_tx.send(result) => {}
        }
        return;
    }
}

/// Issues one request and folds the response into a tentative result plus
/// the decoded body and the raw response for the detectors.
async fn make_request(
    url: &str,
    method: &str,
    user_agent: &str,
    cfg: &Config,
    client: &HttpClient,
    cancel: &CancellationToken,
) -> Result<(ScanResult, String, HttpResponse), crate::errors::TransportError> {
    let mut headers: Vec<(String, String)> =
        vec![("User-Agent".to_string(), user_agent.to_string())];
    for (name, value) in &cfg.custom_headers {
        headers.push((name.clone(), value.clone()));
    }

    let parsed_method = Method::from_bytes(method.as_bytes()).unwrap_or(Method::GET);
    let response = client
        .execute(parsed_method, url, &headers, cfg.rate_limit, cancel)
        .await?;

    let (result, body) = response_to_result(url, method, user_agent, &response);
    Ok((result, body, response))
}

/// Shared result construction for primary, fuzz, and bypass requests.
pub(crate) fn response_to_result(
    url: &str,
    method: &str,
    user_agent: &str,
    response: &HttpResponse,
) -> (ScanResult, String) {
    let body = response.body_text();

    let mut result = ScanResult {
        url: url.to_string(),
        status_code: response.status_code,
        size: response.body.len(),
        word_count: body.split_whitespace().count(),
        line_count: body.matches('\n').count() + 1,
        method: method.to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        server: response.header("Server").unwrap_or_default().to_string(),
        powered_by: response
            .header("X-Powered-By")
            .unwrap_or_default()
            .to_string(),
        user_agent: user_agent.to_string(),
        ..Default::default()
    };

    let waf = detect_waf(response);
    if !waf.is_empty() {
        result.waf_detected = waf;
    } else {
        let from_body = detection::detect_waf_from_body(&body);
        if !from_body.is_empty() {
            result.waf_detected = from_body;
        }
    }

    (result, body)
}

/// Worth reporting: any 2xx/3xx, plus the auth-gated 401 and 403.
pub fn is_interesting(status_code: u16) -> bool {
    (200..400).contains(&status_code) || matches!(status_code, 401 | 403)
}

/// Worth recursing into: redirects and forbidden responses, or a URL that
/// already ends with a slash.
pub fn is_directory(status_code: u16, url: &str) -> bool {
    matches!(status_code, 301 | 302 | 403) || url.ends_with('/')
}

/// Path component of an effective URL: `http://a.com/x/y` -> `/x/y`.
pub(crate) fn extract_path(url: &str) -> String {
    let mut parts = url.splitn(4, '/');
    match parts.nth(3) {
        Some(path) => format!("/{}", path),
        None => "/".to_string(),
    }
}

/// Severity and confidence labels, assigned just before emission. Severity
/// follows status class, escalates to critical for bypass/fuzz findings,
/// and tracks the highest matched credential pattern. Confidence drops to
/// medium when the target's baseline shares the response status.
pub(crate) fn assign_severity_and_confidence(
    result: &mut ScanResult,
    highest_secret: Option<Severity>,
    signatures: &[ResponseSignature],
) {
    let mut severity = match result.status_code {
        200 => Severity::Medium,
        401 | 403 => Severity::Low,
        _ => Severity::Low,
    };
    if result.critical {
        severity = Severity::Critical;
    }
    if let Some(secret) = highest_secret {
        if secret.rank() > severity.rank() {
            severity = secret;
        }
    }
    result.severity = severity;

    result.confidence = if signatures
        .iter()
        .any(|sig| sig.status_code == result.status_code)
    {
        Confidence::Medium
    } else {
        Confidence::High
    };
}
