// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scanner Error Types
 * Error taxonomy for transport failures and configuration validation
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors raised during argument and input validation. Anything in
/// this enum terminates the process with exit code 1 before a scan starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no targets specified. Use -u flag or pipe targets via STDIN")]
    MissingTarget,

    #[error("wordlist is required (-w). Provide a wordlist file path")]
    MissingWordlist,

    #[error("wordlist file not found: {}. Check the path and try again", .0.display())]
    WordlistNotFound(PathBuf),

    #[error("threads must be positive, got {0}. Use -t to set (default: 50)")]
    InvalidThreads(i64),

    #[error("timeout must be positive, got {0}. Use --timeout to set (default: 10)")]
    InvalidTimeout(i64),

    #[error("invalid log level {0:?}. Valid values: debug, info, warn, error")]
    InvalidLogLevel(String),
}

/// Per-request transport failures. These are counted and folded into the
/// scan statistics; none of them is fatal to the scan.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Emitted without issuing any I/O when the host's breaker is open.
    #[error("circuit breaker open for host: {host}")]
    CircuitOpen { host: String },

    /// The surrounding cancellation fired while this request was waiting
    /// on a rate-limit token, a backoff sleep, or the exchange itself.
    #[error("request cancelled")]
    Cancelled,

    #[error("invalid url: {url}")]
    InvalidUrl { url: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error("tls error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("connect timeout to {host}")]
    ConnectTimeout { host: String },

    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String },
}

impl TransportError {
    /// True for failures where another attempt against the same host could
    /// plausibly succeed. Breaker rejections and cancellations are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Request(_) => true,
            TransportError::Io(_) => true,
            TransportError::ConnectTimeout { .. } => true,
            TransportError::MalformedResponse { .. } => true,
            TransportError::Tls(_) => false,
            TransportError::CircuitOpen { .. } => false,
            TransportError::Cancelled => false,
            TransportError::InvalidUrl { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_open_is_not_retryable() {
        let err = TransportError::CircuitOpen {
            host: "example.com".to_string(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_cancelled_is_not_retryable() {
        assert!(!TransportError::Cancelled.is_retryable());
    }

    #[test]
    fn test_io_is_retryable() {
        let err = TransportError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_config_error_messages() {
        let err = ConfigError::InvalidThreads(0);
        assert!(err.to_string().contains("threads must be positive"));

        let err = ConfigError::InvalidLogLevel("noisy".to_string());
        assert!(err.to_string().contains("noisy"));
    }
}
