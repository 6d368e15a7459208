// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

pub mod bypass;
pub mod engine;
pub mod stats;
pub mod task;
pub mod worker;

pub use bypass::{attempt_bypass_strategies, is_bypass_success, BypassOutcome};
pub use engine::Engine;
pub use stats::Stats;
pub use task::{Confidence, ScanResult, Task};
pub use worker::{is_directory, is_interesting};

use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::Notify;

/// Outstanding-task accounting. Incremented before a task is sent to a
/// channel, decremented exactly once when the task has been fully handled.
/// The scan is complete when the count returns to zero.
pub(crate) struct TaskCounter {
    count: AtomicI64,
    zero: Notify,
}

impl TaskCounter {
    pub fn new() -> Self {
        Self {
            count: AtomicI64::new(0),
            zero: Notify::new(),
        }
    }

    pub fn add(&self, n: i64) {
        self.count.fetch_add(n, Ordering::AcqRel);
    }

    pub fn done(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.zero.notify_waiters();
        }
    }

    pub async fn wait_zero(&self) {
        loop {
            let notified = self.zero.notified();
            if self.count.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}
