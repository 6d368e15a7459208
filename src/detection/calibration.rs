// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Baseline Calibration
 * Learns a host's not-found response profile from random probes so that
 * boilerplate 404 pages with bodies can be suppressed during the scan
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use rand::Rng;
use reqwest::Method;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::http_client::HttpClient;

const CALIBRATION_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Summary of one response body, used only for baseline matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseSignature {
    pub status_code: u16,
    pub size: usize,
    pub word_count: usize,
    pub line_count: usize,
}

/// Target root -> calibration signatures. Written exactly once per target
/// before scanning begins, read-only afterwards.
pub struct CalibrationCache {
    signatures: RwLock<HashMap<String, Vec<ResponseSignature>>>,
}

impl Default for CalibrationCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationCache {
    pub fn new() -> Self {
        Self {
            signatures: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, target_url: &str) -> Option<Vec<ResponseSignature>> {
        self.signatures.read().await.get(target_url).cloned()
    }

    pub async fn set(&self, target_url: &str, sigs: Vec<ResponseSignature>) {
        self.signatures.write().await.insert(target_url.to_string(), sigs);
    }
}

/// Probes three freshly-random nonexistent paths on the target and records
/// their response signatures. Probes that error are skipped silently, so an
/// unreachable host yields an empty list, which matches nothing. The result
/// is cached; repeated calls for the same target return the cached list.
pub async fn perform_calibration(
    target_url: &str,
    client: &HttpClient,
    custom_headers: &HashMap<String, String>,
    cache: &CalibrationCache,
    cancel: &CancellationToken,
) -> Vec<ResponseSignature> {
    if let Some(sigs) = cache.get(target_url).await {
        return sigs;
    }

    let probes = {
        let mut rng = rand::rng();
        [
            format!("/capsaicin_cal_{}", rng.random_range(0..999_999)),
            format!("/nonexistent_{}", rng.random_range(0..999_999)),
            format!("/test404_{}", rng.random_range(0..999_999)),
        ]
    };

    let mut headers: Vec<(String, String)> = vec![(
        "User-Agent".to_string(),
        CALIBRATION_USER_AGENT.to_string(),
    )];
    for (name, value) in custom_headers {
        headers.push((name.clone(), value.clone()));
    }

    let mut signatures = Vec::with_capacity(probes.len());
    for probe in &probes {
        let url = format!("{}{}", target_url.trim_end_matches('/'), probe);
        match client.execute(Method::GET, &url, &headers, 0, cancel).await {
            Ok(response) => {
                let body = response.body_text();
                signatures.push(ResponseSignature {
                    status_code: response.status_code,
                    size: response.body.len(),
                    word_count: body.split_whitespace().count(),
                    line_count: body.matches('\n').count() + 1,
                });
            }
            Err(err) => {
                debug!("Calibration probe {} failed: {}", url, err);
            }
        }
    }

    cache.set(target_url, signatures.clone()).await;
    signatures
}

/// True when the response looks like the host's baseline not-found page:
/// same status and a body within 5% of a recorded signature's size.
/// Zero-size signatures never match.
pub fn matches_signature(status_code: u16, size: usize, signatures: &[ResponseSignature]) -> bool {
    for sig in signatures {
        if status_code != sig.status_code || sig.size == 0 {
            continue;
        }
        let diff = size.abs_diff(sig.size) as f64 / sig.size as f64;
        if diff < 0.05 {
            return true;
        }
    }
    false
}
