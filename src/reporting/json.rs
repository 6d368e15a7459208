// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - JSON Report Serialization
 * Deterministic sorted output: flat array form and the schema-3.0 envelope
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::Path;

use crate::scanner::ScanResult;

pub const SCHEMA_VERSION: &str = "3.0";
pub const REPORT_VERSION: &str = "3.0.0";

#[derive(Debug, Serialize, Deserialize)]
pub struct ScanReport {
    pub schema_version: String,
    pub run_id: String,
    pub metadata: ScanMetadata,
    pub results: Vec<ScanResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub start_time: String,
    pub end_time: String,
    pub target_count: usize,
    pub targets_hash: String,
    pub total_results: usize,
    pub version: String,
}

/// Sorts by URL ascending, then status ascending. Workers finish in
/// arbitrary order, so report output never relies on insertion order.
pub fn sort_results(results: &mut [ScanResult]) {
    results.sort_by(|a, b| {
        a.url
            .cmp(&b.url)
            .then_with(|| a.status_code.cmp(&b.status_code))
    });
}

/// Writes the flat sorted-array form.
pub fn save_json(results: &[ScanResult], path: &Path) -> Result<()> {
    let mut sorted = results.to_vec();
    sort_results(&mut sorted);

    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &sorted)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Writes the versioned report envelope. Given identical results, targets,
/// run id, and window timestamps, the output is byte-identical.
pub fn save_json_report(
    results: &[ScanResult],
    path: &Path,
    targets: &[String],
    run_id: &str,
    start_time: &str,
    end_time: &str,
) -> Result<()> {
    let mut sorted = results.to_vec();
    sort_results(&mut sorted);

    let report = ScanReport {
        schema_version: SCHEMA_VERSION.to_string(),
        run_id: run_id.to_string(),
        metadata: ScanMetadata {
            start_time: start_time.to_string(),
            end_time: end_time.to_string(),
            target_count: targets.len(),
            targets_hash: hash_targets(targets),
            total_results: sorted.len(),
            version: REPORT_VERSION.to_string(),
        },
        results: sorted,
    };

    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &report)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// First 16 hex characters of SHA-256 over the concatenated target strings.
pub fn hash_targets(targets: &[String]) -> String {
    let mut hasher = Sha256::new();
    for target in targets {
        hasher.update(target.as_bytes());
    }
    format!("{:x}", hasher.finalize())[..16].to_string()
}

/// Fresh 12-hex run identifier derived from the current time.
pub fn generate_run_id() -> String {
    let now = Utc::now();
    let mut hasher = Sha256::new();
    hasher.update(now.to_rfc3339_opts(SecondsFormat::Nanos, true).as_bytes());
    hasher.update(now.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
    format!("{:x}", hasher.finalize())[..12].to_string()
}

/// Aggregate counts consumed by the HTML report and the summary line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatusCounts {
    pub two_xx: usize,
    pub three_xx: usize,
    pub four_xx: usize,
    pub five_xx: usize,
    pub critical: usize,
    pub secrets: usize,
    pub waf: usize,
}

pub fn count_by_status(results: &[ScanResult]) -> StatusCounts {
    let mut counts = StatusCounts::default();

    for result in results {
        match result.status_code {
            200..=299 => counts.two_xx += 1,
            300..=399 => counts.three_xx += 1,
            400..=499 => counts.four_xx += 1,
            500.. => counts.five_xx += 1,
            _ => {}
        }
        if result.critical {
            counts.critical += 1;
        }
        if result.secret_found {
            counts.secrets += 1;
        }
        if !result.waf_detected.is_empty() {
            counts.waf += 1;
        }
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Severity;

    pub(crate) fn sample_results() -> Vec<ScanResult> {
        vec![
            ScanResult {
                url: "http://example.com/admin".to_string(),
                status_code: 200,
                size: 1024,
                word_count: 50,
                line_count: 10,
                method: "GET".to_string(),
                timestamp: "2025-01-01T00:00:00Z".to_string(),
                user_agent: "test-agent".to_string(),
                ..Default::default()
            },
            ScanResult {
                url: "http://example.com/secret".to_string(),
                status_code: 200,
                size: 512,
                word_count: 25,
                line_count: 5,
                method: "GET".to_string(),
                timestamp: "2025-01-01T00:00:01Z".to_string(),
                user_agent: "test-agent".to_string(),
                secret_found: true,
                secret_types: vec!["AWS Access Key".to_string()],
                critical: true,
                severity: Severity::Critical,
                ..Default::default()
            },
            ScanResult {
                url: "http://example.com/api".to_string(),
                status_code: 301,
                method: "GET".to_string(),
                timestamp: "2025-01-01T00:00:02Z".to_string(),
                user_agent: "test-agent".to_string(),
                waf_detected: "Cloudflare".to_string(),
                ..Default::default()
            },
        ]
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("capsaicin-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_sort_results_by_url_then_status() {
        let mut results = sample_results();
        results[0].status_code = 403;
        results.push(ScanResult {
            url: "http://example.com/admin".to_string(),
            status_code: 200,
            ..Default::default()
        });

        sort_results(&mut results);

        assert_eq!(results[0].url, "http://example.com/admin");
        assert_eq!(results[0].status_code, 200);
        assert_eq!(results[1].url, "http://example.com/admin");
        assert_eq!(results[1].status_code, 403);
        assert_eq!(results[2].url, "http://example.com/api");
    }

    #[test]
    fn test_save_json_roundtrip() {
        let path = temp_path("roundtrip.json");
        save_json(&sample_results(), &path).unwrap();

        let data = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let loaded: Vec<ScanResult> = serde_json::from_str(&data).unwrap();
        assert_eq!(loaded.len(), 3);
        for pair in loaded.windows(2) {
            assert!(pair[0].url <= pair[1].url, "results not sorted");
        }
    }

    #[test]
    fn test_save_json_deterministic() {
        let path1 = temp_path("det1.json");
        let path2 = temp_path("det2.json");

        save_json(&sample_results(), &path1).unwrap();
        save_json(&sample_results(), &path2).unwrap();

        let data1 = std::fs::read(&path1).unwrap();
        let data2 = std::fs::read(&path2).unwrap();
        std::fs::remove_file(&path1).ok();
        std::fs::remove_file(&path2).ok();

        assert_eq!(data1, data2);
    }

    #[test]
    fn test_save_json_empty() {
        let path = temp_path("empty.json");
        save_json(&[], &path).unwrap();

        let data = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let loaded: Vec<ScanResult> = serde_json::from_str(&data).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_save_json_invalid_path() {
        let path = Path::new("/nonexistent/dir/results.json");
        assert!(save_json(&sample_results(), path).is_err());
    }

    #[test]
    fn test_versioned_report() {
        let path = temp_path("report.json");
        let targets = vec!["http://example.com".to_string()];

        save_json_report(
            &sample_results(),
            &path,
            &targets,
            "test-run-123",
            "2025-01-01T00:00:00Z",
            "2025-01-01T00:05:00Z",
        )
        .unwrap();

        let data = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let report: ScanReport = serde_json::from_str(&data).unwrap();
        assert_eq!(report.schema_version, "3.0");
        assert_eq!(report.run_id, "test-run-123");
        assert_eq!(report.metadata.target_count, 1);
        assert_eq!(report.metadata.total_results, 3);
        assert_eq!(report.metadata.version, "3.0.0");
        assert_eq!(report.metadata.targets_hash.len(), 16);
        assert_eq!(report.results.len(), 3);
    }

    #[test]
    fn test_generate_run_id_length() {
        let id = generate_run_id();
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_targets_stable() {
        let targets = vec!["http://a.com".to_string(), "http://b.com".to_string()];
        assert_eq!(hash_targets(&targets), hash_targets(&targets));
        assert_eq!(hash_targets(&targets).len(), 16);
        assert_ne!(hash_targets(&targets), hash_targets(&targets[..1].to_vec()));
    }

    #[test]
    fn test_count_by_status() {
        let counts = count_by_status(&sample_results());
        assert_eq!(counts.two_xx, 2);
        assert_eq!(counts.three_xx, 1);
        assert_eq!(counts.critical, 1);
        assert_eq!(counts.secrets, 1);
        assert_eq!(counts.waf, 1);
    }
}
