// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Circuit Breaker Pattern
 * Prevents hammering hosts that are consistently failing
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
struct BreakerEntry {
    failure_count: u32,
    last_failure: Instant,
}

/// Per-host failure tracker. A host whose consecutive failure count reaches
/// the threshold is short-circuited until the reset timeout has elapsed
/// since its last failure; a single success clears the host entirely.
pub struct CircuitBreaker {
    entries: Mutex<HashMap<String, BreakerEntry>>,
    threshold: u32,
    reset_timeout: Duration,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(10, Duration::from_secs(30))
    }
}

impl CircuitBreaker {
    pub fn new(threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            threshold,
            reset_timeout,
        }
    }

    /// Returns true when requests to `host` should be rejected without I/O.
    /// A stale entry (last failure older than the reset timeout) is cleared
    /// on the way through, giving the host a fresh probe.
    pub async fn is_open(&self, host: &str) -> bool {
        let mut entries = self.entries.lock().await;

        if let Some(entry) = entries.get(host) {
            if entry.last_failure.elapsed() > self.reset_timeout {
                debug!("Circuit breaker reset window elapsed for {}", host);
                entries.remove(host);
                return false;
            }
            return entry.failure_count >= self.threshold;
        }

        false
    }

    pub async fn record_failure(&self, host: &str) {
        let mut entries = self.entries.lock().await;

        let entry = entries.entry(host.to_string()).or_insert(BreakerEntry {
            failure_count: 0,
            last_failure: Instant::now(),
        });
        entry.failure_count += 1;
        entry.last_failure = Instant::now();

        if entry.failure_count == self.threshold {
            warn!(
                "Circuit breaker opening for {} after {} consecutive failures",
                host, entry.failure_count
            );
        }
    }

    pub async fn record_success(&self, host: &str) {
        let mut entries = self.entries.lock().await;
        entries.remove(host);
    }

    /// Current failure count for a host, zero when untracked.
    pub async fn failure_count(&self, host: &str) -> u32 {
        let entries = self.entries.lock().await;
        entries.get(host).map(|e| e.failure_count).unwrap_or(0)
    }

    /// Rewinds a host's last-failure timestamp. Test hook for exercising the
    /// reset window without sleeping through it.
    #[doc(hidden)]
    pub async fn backdate_last_failure(&self, host: &str, by: Duration) {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(host) {
            entry.last_failure = Instant::now() - by;
        }
    }
}
