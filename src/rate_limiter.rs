// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Per-Host Rate Limiter
 * Token bucket per host with lazy creation under a readers-writer lock
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorRateLimiter,
};
use nonzero_ext::*;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::TransportError;

type HostBucket = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// One token bucket per host, created on first use and never evicted during
/// a scan. Burst size is pinned at 1 so request spacing tracks the configured
/// rate instead of draining an initial burst.
pub struct HostRateLimiters {
    buckets: RwLock<HashMap<String, Arc<HostBucket>>>,
}

impl Default for HostRateLimiters {
    fn default() -> Self {
        Self::new()
    }
}

impl HostRateLimiters {
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// Blocks until a token is available for `host`. A rate of zero bypasses
    /// the limiter entirely. Waiting is cancellation-aware.
    pub async fn acquire(
        &self,
        host: &str,
        rate: u32,
        cancel: &CancellationToken,
    ) -> Result<(), TransportError> {
        if rate == 0 {
            return Ok(());
        }

        let bucket = self.bucket_for(host, rate).await;

        tokio::select! {
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            _ = bucket.until_ready() => Ok(()),
        }
    }

    /// Double-checked lookup: read lock for the common path, write lock with
    /// a re-check for first contact with a host.
    async fn bucket_for(&self, host: &str, rate: u32) -> Arc<HostBucket> {
        {
            let buckets = self.buckets.read().await;
            if let Some(bucket) = buckets.get(host) {
                return Arc::clone(bucket);
            }
        }

        let mut buckets = self.buckets.write().await;
        if let Some(bucket) = buckets.get(host) {
            return Arc::clone(bucket);
        }

        debug!("Creating rate limiter for {} at {} req/s", host, rate);
        let quota = Quota::per_second(NonZeroU32::new(rate).unwrap_or(nonzero!(1u32)))
            .allow_burst(nonzero!(1u32));
        let bucket = Arc::new(GovernorRateLimiter::direct(quota));
        buckets.insert(host.to_string(), Arc::clone(&bucket));
        bucket
    }

    /// Number of hosts with an allocated bucket.
    pub async fn host_count(&self) -> usize {
        self.buckets.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_zero_rate_bypasses_limiter() {
        let limiters = HostRateLimiters::new();
        let cancel = CancellationToken::new();

        let start = Instant::now();
        for _ in 0..20 {
            limiters.acquire("example.com", 0, &cancel).await.unwrap();
        }

        assert!(start.elapsed().as_millis() < 100);
        assert_eq!(limiters.host_count().await, 0);
    }

    #[tokio::test]
    async fn test_rate_spacing() {
        let limiters = HostRateLimiters::new();
        let cancel = CancellationToken::new();

        let mut stamps = Vec::new();
        for _ in 0..3 {
            limiters.acquire("example.com", 2, &cancel).await.unwrap();
            stamps.push(Instant::now());
        }

        for pair in stamps.windows(2) {
            let gap = pair[1].duration_since(pair[0]);
            assert!(
                gap.as_millis() >= 400,
                "requests too close together: {:?}",
                gap
            );
        }
    }

    #[tokio::test]
    async fn test_hosts_get_distinct_buckets() {
        let limiters = HostRateLimiters::new();
        let cancel = CancellationToken::new();

        limiters.acquire("host1.com", 5, &cancel).await.unwrap();
        limiters.acquire("host2.com", 5, &cancel).await.unwrap();

        assert_eq!(limiters.host_count().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_creation_single_bucket() {
        let limiters = Arc::new(HostRateLimiters::new());
        let cancel = CancellationToken::new();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let limiters = Arc::clone(&limiters);
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                limiters
                    .acquire("concurrent-host.com", 100, &cancel)
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(limiters.host_count().await, 1);
    }

    #[tokio::test]
    async fn test_cancellation_while_waiting() {
        let limiters = HostRateLimiters::new();
        let cancel = CancellationToken::new();

        // Drain the single burst token, then cancel while the next acquire
        // is waiting for a refill.
        limiters.acquire("slow.example.com", 1, &cancel).await.unwrap();
        cancel.cancel();

        let err = limiters
            .acquire("slow.example.com", 1, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Cancelled));
    }
}
