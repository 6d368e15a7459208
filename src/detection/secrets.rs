// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Leaked Credential Detection
 * Pattern table with Shannon-entropy gating and value redaction
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Severity of a matched credential pattern. Also used for the severity
/// label on emitted findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    #[default]
    Low,
}

impl Severity {
    /// Ordering rank, higher is more severe.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 4,
            Severity::High => 3,
            Severity::Medium => 2,
            Severity::Low => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct SecretPattern {
    pub name: &'static str,
    pub pattern: Regex,
    pub severity: Severity,
    /// Minimum Shannon entropy of the matched value; 0.0 disables the gate.
    pub min_entropy: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SecretMatch {
    pub name: String,
    pub severity: Severity,
    pub redacted: String,
}

/// Master credential pattern table, scanned in order. Entropy gates keep the
/// generic assignment patterns from firing on placeholder values.
pub static PATTERNS: Lazy<Vec<SecretPattern>> = Lazy::new(|| {
    vec![
        SecretPattern {
            name: "AWS Access Key",
            pattern: Regex::new(r"AKIA[0-9A-Z]{16}").unwrap(),
            severity: Severity::Critical,
            min_entropy: 0.0,
        },
        SecretPattern {
            name: "AWS Secret Key",
            pattern: Regex::new(
                r#"(?i)(aws_secret_access_key|aws_secret_key)["'\s:=]+[A-Za-z0-9/+=]{40}"#,
            )
            .unwrap(),
            severity: Severity::Critical,
            min_entropy: 0.0,
        },
        SecretPattern {
            name: "Generic API Key",
            pattern: Regex::new(
                r#"(?i)(api[_-]?key|apikey|access[_-]?token|auth[_-]?token)["'\s:=]+([a-zA-Z0-9_\-]{20,})"#,
            )
            .unwrap(),
            severity: Severity::Medium,
            min_entropy: 3.0,
        },
        SecretPattern {
            name: "Private Key",
            pattern: Regex::new(r"-----BEGIN (RSA |EC |OPENSSH |DSA )?PRIVATE KEY-----").unwrap(),
            severity: Severity::Critical,
            min_entropy: 0.0,
        },
        SecretPattern {
            name: "JWT Token",
            pattern: Regex::new(
                r"eyJ[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}",
            )
            .unwrap(),
            severity: Severity::High,
            min_entropy: 0.0,
        },
        SecretPattern {
            name: "Slack Token",
            pattern: Regex::new(r"xox[baprs]-[0-9]{10,13}-[0-9]{10,13}-[a-zA-Z0-9]{24,}").unwrap(),
            severity: Severity::High,
            min_entropy: 0.0,
        },
        SecretPattern {
            name: "Google API Key",
            pattern: Regex::new(r"AIza[0-9A-Za-z_-]{35}").unwrap(),
            severity: Severity::High,
            min_entropy: 0.0,
        },
        SecretPattern {
            name: "GitHub Token",
            pattern: Regex::new(r"gh[pousr]_[A-Za-z0-9_]{36,255}").unwrap(),
            severity: Severity::Critical,
            min_entropy: 0.0,
        },
        SecretPattern {
            name: "Stripe Secret Key",
            pattern: Regex::new(r"sk_live_[0-9a-zA-Z]{24,}").unwrap(),
            severity: Severity::Critical,
            min_entropy: 0.0,
        },
        SecretPattern {
            name: "Stripe Publishable Key",
            pattern: Regex::new(r"pk_live_[0-9a-zA-Z]{24,}").unwrap(),
            severity: Severity::Low,
            min_entropy: 0.0,
        },
        SecretPattern {
            name: "Heroku API Key",
            pattern: Regex::new(
                r"(?i)heroku.*[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
            )
            .unwrap(),
            severity: Severity::High,
            min_entropy: 0.0,
        },
        SecretPattern {
            name: "Database Connection String",
            pattern: Regex::new(r#"(?i)(postgres|mysql|mongodb|redis)://[^\s"']+:[^\s"']+@[^\s"']+"#)
                .unwrap(),
            severity: Severity::Critical,
            min_entropy: 0.0,
        },
        SecretPattern {
            name: "Mailgun API Key",
            pattern: Regex::new(r"key-[0-9a-zA-Z]{32}").unwrap(),
            severity: Severity::High,
            min_entropy: 0.0,
        },
        SecretPattern {
            name: "Twilio API Key",
            pattern: Regex::new(r"SK[0-9a-fA-F]{32}").unwrap(),
            severity: Severity::High,
            min_entropy: 0.0,
        },
        SecretPattern {
            name: "Generic Password",
            pattern: Regex::new(r#"(?i)(password|passwd|pwd)["'\s:=]+([^\s"']{8,})"#).unwrap(),
            severity: Severity::Medium,
            min_entropy: 3.0,
        },
    ]
});

/// Base-2 entropy over the character-frequency distribution of `s`.
pub fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq = std::collections::HashMap::new();
    let mut length = 0f64;
    for c in s.chars() {
        *freq.entry(c).or_insert(0f64) += 1.0;
        length += 1.0;
    }

    let mut entropy = 0.0;
    for count in freq.values() {
        let p = count / length;
        entropy -= p * p.log2();
    }
    entropy
}

/// Names of all credential patterns matching `content`, each at most once.
pub fn detect_secrets(content: &str) -> Vec<String> {
    detect_secrets_detailed(content)
        .into_iter()
        .map(|m| m.name)
        .collect()
}

/// Full matches with severity and a redacted value. Pattern order is stable;
/// each pattern contributes at most one match per call.
pub fn detect_secrets_detailed(content: &str) -> Vec<SecretMatch> {
    let mut found = Vec::new();

    for pattern in PATTERNS.iter() {
        let Some(matched) = pattern.pattern.find(content) else {
            continue;
        };
        let matched = matched.as_str();

        if pattern.min_entropy > 0.0 {
            let value = extract_value(matched);
            if shannon_entropy(value) < pattern.min_entropy {
                continue;
            }
        }

        found.push(SecretMatch {
            name: pattern.name.to_string(),
            severity: pattern.severity,
            redacted: redact_secret(matched),
        });
    }

    found
}

/// Pull the value portion out of an assignment-style match: everything after
/// the last separator, stripped of quotes and whitespace. Falls back to the
/// whole match.
fn extract_value(matched: &str) -> &str {
    for sep in ['=', ':', '"', '\''] {
        if let Some(idx) = matched.rfind(sep) {
            let value = matched[idx + 1..].trim().trim_matches(['"', '\'', ' ']);
            if !value.is_empty() {
                return value;
            }
        }
    }
    matched
}

/// Mask all but the first and last 4 characters; values of 8 characters or
/// fewer are masked entirely.
pub fn redact_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 8), tail)
}
