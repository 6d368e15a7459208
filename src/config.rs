// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scan Configuration
 * CLI flags with environment fallbacks, normalization, and validation
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::errors::ConfigError;

/// Capsaicin - Web Directory Scanner
#[derive(Parser, Debug)]
#[command(name = "capsaicin")]
#[command(author = "Bountyy Oy <info@bountyy.fi>")]
#[command(version = "3.0.0")]
#[command(about = "Concurrent web content discovery with calibrated 404 filtering", long_about = None)]
pub struct Cli {
    /// Target URL (or pipe targets via STDIN)
    #[arg(short = 'u', long = "url")]
    pub target_url: Option<String>,

    /// Wordlist path (required)
    #[arg(short = 'w', long = "wordlist")]
    pub wordlist: Option<PathBuf>,

    /// Number of concurrent threads
    #[arg(short = 't', long, default_value_t = 50, env = "CAPSAICIN_THREADS")]
    pub threads: i64,

    /// Extensions (comma-separated, e.g., php,html,txt)
    #[arg(short = 'x', long)]
    pub extensions: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10, env = "CAPSAICIN_TIMEOUT")]
    pub timeout: i64,

    /// Output file (JSON format)
    #[arg(short = 'o', long = "output")]
    pub output_file: Option<PathBuf>,

    /// Generate HTML report
    #[arg(long = "html")]
    pub html_report: Option<PathBuf>,

    /// Verbose mode
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Recursive scanning depth (0=disabled)
    #[arg(long = "depth", default_value_t = 0)]
    pub max_depth: u32,

    /// Custom header "Name: Value" (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Max requests per second per host (0=unlimited)
    #[arg(long, default_value_t = 0, env = "CAPSAICIN_RATE_LIMIT")]
    pub rate_limit: u32,

    /// Max response body size in MB
    #[arg(long, default_value_t = 10)]
    pub max_response_mb: usize,

    /// Number of retry attempts for failed requests
    #[arg(long = "retries", default_value_t = 2)]
    pub retry_attempts: u32,

    /// Log level (debug|info|warn|error)
    #[arg(long, default_value = "info", env = "CAPSAICIN_LOG_LEVEL")]
    pub log_level: String,

    /// Show what would be scanned without scanning
    #[arg(long)]
    pub dry_run: bool,

    /// Allow domain pattern (repeatable)
    #[arg(long = "allow")]
    pub allow_patterns: Vec<String>,

    /// Deny domain pattern (repeatable)
    #[arg(long = "deny")]
    pub deny_patterns: Vec<String>,

    /// Disable bypass attempts and aggressive techniques
    #[arg(long)]
    pub safe_mode: bool,
}

/// Validated scan configuration consumed by the engine.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub target_url: Option<String>,
    pub wordlist: PathBuf,
    pub threads: i64,
    pub extensions: Vec<String>,
    pub timeout: i64,
    pub output_file: Option<PathBuf>,
    pub html_report: Option<PathBuf>,
    pub verbose: bool,
    pub max_depth: u32,
    pub custom_headers: HashMap<String, String>,
    pub rate_limit: u32,
    pub max_response_mb: usize,
    pub retry_attempts: u32,
    pub log_level: String,
    pub dry_run: bool,
    pub allow_patterns: Vec<String>,
    pub deny_patterns: Vec<String>,
    pub safe_mode: bool,
}

impl Config {
    /// Builds a config from parsed flags, normalizing extensions and
    /// folding repeated headers into a map. Validation happens separately
    /// once the target list is known.
    pub fn from_cli(cli: Cli) -> Self {
        let extensions = cli
            .extensions
            .as_deref()
            .map(normalize_extensions)
            .unwrap_or_default();

        let custom_headers = parse_headers(&cli.headers);

        Self {
            target_url: cli.target_url,
            wordlist: cli.wordlist.unwrap_or_default(),
            threads: cli.threads,
            extensions,
            timeout: cli.timeout,
            output_file: cli.output_file,
            html_report: cli.html_report,
            verbose: cli.verbose,
            max_depth: cli.max_depth,
            custom_headers,
            rate_limit: cli.rate_limit,
            max_response_mb: cli.max_response_mb,
            retry_attempts: cli.retry_attempts,
            log_level: cli.log_level,
            dry_run: cli.dry_run,
            allow_patterns: cli.allow_patterns,
            deny_patterns: cli.deny_patterns,
            safe_mode: cli.safe_mode,
        }
    }

    /// Validates the configuration against the resolved target list, and
    /// normalizes bare hostnames to `http://` roots in place.
    pub fn validate(&self, targets: &mut Vec<String>) -> Result<(), ConfigError> {
        if targets.is_empty() {
            return Err(ConfigError::MissingTarget);
        }

        for target in targets.iter_mut() {
            if !target.starts_with("http://") && !target.starts_with("https://") {
                *target = format!("http://{}", target);
            }
        }

        if self.wordlist.as_os_str().is_empty() {
            return Err(ConfigError::MissingWordlist);
        }
        if !self.wordlist.exists() {
            return Err(ConfigError::WordlistNotFound(self.wordlist.clone()));
        }

        if self.threads <= 0 {
            return Err(ConfigError::InvalidThreads(self.threads));
        }
        if self.timeout <= 0 {
            return Err(ConfigError::InvalidTimeout(self.timeout));
        }

        if !matches!(self.log_level.as_str(), "debug" | "info" | "warn" | "error") {
            return Err(ConfigError::InvalidLogLevel(self.log_level.clone()));
        }

        Ok(())
    }

    /// Applies `--allow` / `--deny` substring filters to the target list.
    /// Deny wins; with allow patterns present, a target must match one.
    pub fn filter_targets(&self, targets: Vec<String>) -> Vec<String> {
        targets
            .into_iter()
            .filter(|target| {
                if self.deny_patterns.iter().any(|p| target.contains(p.as_str())) {
                    return false;
                }
                if !self.allow_patterns.is_empty() {
                    return self.allow_patterns.iter().any(|p| target.contains(p.as_str()));
                }
                true
            })
            .collect()
    }
}

/// Splits a comma-separated extension list and guarantees a leading dot:
/// `php, html` -> `[".php", ".html"]`.
pub fn normalize_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|ext| !ext.is_empty())
        .map(|ext| {
            if ext.starts_with('.') {
                ext.to_string()
            } else {
                format!(".{}", ext)
            }
        })
        .collect()
}

/// Parses repeated `-H "Name: Value"` flags; malformed entries are dropped.
pub fn parse_headers(raw: &[String]) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    for entry in raw {
        if let Some((name, value)) = entry.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if !name.is_empty() {
                headers.insert(name.to_string(), value.to_string());
            }
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_wordlist() -> PathBuf {
        use std::sync::atomic::{AtomicU32, Ordering};
        static SEQ: AtomicU32 = AtomicU32::new(0);

        let path = std::env::temp_dir().join(format!(
            "capsaicin-cfg-test-{}-{}.txt",
            std::process::id(),
            SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "admin").unwrap();
        path
    }

    fn valid_config() -> Config {
        Config {
            wordlist: temp_wordlist(),
            threads: 50,
            timeout: 10,
            log_level: "info".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_no_targets() {
        let cfg = valid_config();
        let mut targets = Vec::new();
        assert!(matches!(
            cfg.validate(&mut targets),
            Err(ConfigError::MissingTarget)
        ));
    }

    #[test]
    fn test_validate_missing_wordlist() {
        let mut cfg = valid_config();
        cfg.wordlist = PathBuf::new();
        let mut targets = vec!["http://example.com".to_string()];
        assert!(matches!(
            cfg.validate(&mut targets),
            Err(ConfigError::MissingWordlist)
        ));
    }

    #[test]
    fn test_validate_wordlist_not_found() {
        let mut cfg = valid_config();
        cfg.wordlist = PathBuf::from("/nonexistent/wordlist.txt");
        let mut targets = vec!["http://example.com".to_string()];
        assert!(matches!(
            cfg.validate(&mut targets),
            Err(ConfigError::WordlistNotFound(_))
        ));
    }

    #[test]
    fn test_validate_normalizes_bare_hostnames() {
        let cfg = valid_config();
        let mut targets = vec![
            "example.com".to_string(),
            "https://secure.example.com".to_string(),
            "http://plain.example.com".to_string(),
        ];

        cfg.validate(&mut targets).unwrap();

        assert_eq!(targets[0], "http://example.com");
        assert_eq!(targets[1], "https://secure.example.com");
        assert_eq!(targets[2], "http://plain.example.com");
    }

    #[test]
    fn test_validate_rejects_bad_numbers() {
        let mut targets = vec!["http://example.com".to_string()];

        let mut cfg = valid_config();
        cfg.threads = 0;
        assert!(matches!(
            cfg.validate(&mut targets),
            Err(ConfigError::InvalidThreads(0))
        ));

        let mut cfg = valid_config();
        cfg.timeout = -1;
        assert!(matches!(
            cfg.validate(&mut targets),
            Err(ConfigError::InvalidTimeout(-1))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_log_level() {
        let mut cfg = valid_config();
        cfg.log_level = "noisy".to_string();
        let mut targets = vec!["http://example.com".to_string()];
        assert!(matches!(
            cfg.validate(&mut targets),
            Err(ConfigError::InvalidLogLevel(_))
        ));
    }

    #[test]
    fn test_normalize_extensions() {
        assert_eq!(
            normalize_extensions("php,html, txt"),
            vec![".php", ".html", ".txt"]
        );
        assert_eq!(normalize_extensions(".bak,log"), vec![".bak", ".log"]);
        assert!(normalize_extensions("").is_empty());
    }

    #[test]
    fn test_parse_headers() {
        let raw = vec![
            "Authorization: Bearer token123".to_string(),
            "X-Custom: a: b".to_string(),
            "malformed".to_string(),
        ];

        let headers = parse_headers(&raw);
        assert_eq!(headers.get("Authorization").unwrap(), "Bearer token123");
        assert_eq!(headers.get("X-Custom").unwrap(), "a: b");
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_filter_targets() {
        let mut cfg = valid_config();
        cfg.deny_patterns = vec!["internal".to_string()];

        let targets = vec![
            "http://app.example.com".to_string(),
            "http://internal.example.com".to_string(),
        ];
        let kept = cfg.filter_targets(targets);
        assert_eq!(kept, vec!["http://app.example.com".to_string()]);

        cfg.deny_patterns.clear();
        cfg.allow_patterns = vec!["staging".to_string()];
        let targets = vec![
            "http://staging.example.com".to_string(),
            "http://prod.example.com".to_string(),
        ];
        let kept = cfg.filter_targets(targets);
        assert_eq!(kept, vec!["http://staging.example.com".to_string()]);
    }
}
