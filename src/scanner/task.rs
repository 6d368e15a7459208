// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use serde::{Deserialize, Serialize};

use crate::detection::Severity;

/// One unit of work: a single path probe against one target at one depth.
/// Depth starts at 1 and increases by one per recursion step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub target_url: String,
    pub path: String,
    pub depth: u32,
}

/// Confidence label attached to an emitted finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    #[default]
    Medium,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
        }
    }
}

/// An emitted finding: one completed HTTP transaction that survived the
/// calibration filter, or a successful bypass / method-fuzz outcome.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScanResult {
    pub url: String,
    pub status_code: u16,
    pub size: usize,
    pub word_count: usize,
    pub line_count: usize,
    pub critical: bool,
    pub severity: Severity,
    pub confidence: Confidence,
    pub method: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub powered_by: String,
    pub user_agent: String,
    pub secret_found: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secret_types: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub waf_detected: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub technologies: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_serialization_field_names() {
        let result = ScanResult {
            url: "http://example.com/admin".to_string(),
            status_code: 200,
            method: "GET".to_string(),
            severity: Severity::Medium,
            confidence: Confidence::High,
            waf_detected: "Cloudflare".to_string(),
            ..Default::default()
        };

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains(r#""status_code":200"#));
        assert!(json.contains(r#""severity":"medium""#));
        assert!(json.contains(r#""confidence":"high""#));
        assert!(json.contains(r#""waf_detected":"Cloudflare""#));
    }

    #[test]
    fn test_empty_optional_fields_are_skipped() {
        let result = ScanResult {
            url: "http://example.com/x".to_string(),
            ..Default::default()
        };

        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("server"));
        assert!(!json.contains("secret_types"));
        assert!(!json.contains("waf_detected"));
        assert!(!json.contains("technologies"));
    }
}
