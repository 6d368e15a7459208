// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Live scan counters. `total` grows as recursion fans out new tasks; the
/// rest increment monotonically from the workers.
pub struct Stats {
    total: AtomicU64,
    processed: AtomicU64,
    found: AtomicU64,
    errors: AtomicU64,
    secrets: AtomicU64,
    waf_hits: AtomicU64,
    start_time: Instant,
}

impl Stats {
    pub fn new(initial_total: u64) -> Self {
        Self {
            total: AtomicU64::new(initial_total),
            processed: AtomicU64::new(0),
            found: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            secrets: AtomicU64::new(0),
            waf_hits: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn increment_total(&self, delta: u64) {
        self.total.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn increment_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_found(&self) {
        self.found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_secrets(&self) {
        self.secrets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_waf_hits(&self) {
        self.waf_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn found(&self) -> u64 {
        self.found.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn secrets(&self) -> u64 {
        self.secrets.load(Ordering::Relaxed)
    }

    pub fn waf_hits(&self) -> u64 {
        self.waf_hits.load(Ordering::Relaxed)
    }

    pub fn start_time(&self) -> Instant {
        self.start_time
    }
}
