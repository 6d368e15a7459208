// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scan Engine
 * Owns the task graph: seeding, worker pool, recursion fan-out, result
 * aggregation, and termination accounting
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;
use crate::detection::{perform_calibration, CalibrationCache};
use crate::http_client::HttpClient;
use crate::scanner::stats::Stats;
use crate::scanner::task::{ScanResult, Task};
use crate::scanner::worker::{worker_loop, WorkerContext};
use crate::scanner::TaskCounter;

pub struct Engine {
    cfg: Arc<Config>,
    client: Arc<HttpClient>,
    cal_cache: Arc<CalibrationCache>,
    stats: Arc<Stats>,
}

impl Engine {
    pub fn new(cfg: Config) -> Result<Self> {
        let client = HttpClient::new(
            cfg.timeout.max(1) as u64,
            cfg.retry_attempts,
            cfg.max_response_mb,
        )?;

        Ok(Self {
            cfg: Arc::new(cfg),
            client: Arc::new(client),
            cal_cache: Arc::new(CalibrationCache::new()),
            stats: Arc::new(Stats::new(0)),
        })
    }

    /// Shared counters for live progress display.
    pub fn stats(&self) -> Arc<Stats> {
        Arc::clone(&self.stats)
    }

    pub async fn run(&self, targets: &[String]) -> Result<Vec<ScanResult>> {
        self.run_cancellable(CancellationToken::new(), targets).await
    }

    /// Runs the full scan. On cancellation the partial results collected so
    /// far are returned; the caller decides how to report the interruption.
    pub async fn run_cancellable(
        &self,
        cancel: CancellationToken,
        targets: &[String],
    ) -> Result<Vec<ScanResult>> {
        let words = Arc::new(load_wordlist(&self.cfg.wordlist)?);

        let per_word = 1 + self.cfg.extensions.len();
        let initial_total = targets.len() * words.len() * per_word;
        self.stats.increment_total(initial_total as u64);

        // Calibration must finish for a target before any of its results
        // can be filtered, so all probes run before seeding starts.
        for target in targets {
            if cancel.is_cancelled() {
                return Ok(Vec::new());
            }
            let sigs = perform_calibration(
                target,
                &self.client,
                &self.cfg.custom_headers,
                &self.cal_cache,
                &cancel,
            )
            .await;
            debug!("Calibrated {} with {} signatures", target, sigs.len());
        }

        let threads = self.cfg.threads.max(1) as usize;
        let capacity = threads * 2;

        let (tasks_tx, tasks_rx) = mpsc::channel::<Task>(capacity);
        let (results_tx, mut results_rx) = mpsc::channel::<ScanResult>(capacity);
        let tasks_rx = Arc::new(Mutex::new(tasks_rx));

        let outstanding = Arc::new(TaskCounter::new());
        outstanding.add(initial_total as i64);

        // Flipped when the outstanding-task counter hits zero (or the scan
        // is cancelled); workers and the recursion consumer exit on it.
        let scan_done = CancellationToken::new();

        let aggregator = {
            let stats = Arc::clone(&self.stats);
            tokio::spawn(async move {
                let mut results = Vec::new();
                while let Some(result) = results_rx.recv().await {
                    if !result.waf_detected.is_empty() {
                        stats.increment_waf_hits();
                    }
                    results.push(result);
                }
                results
            })
        };

        let mut new_tasks_tx = None;
        let mut recursion_handle = None;
        if self.cfg.max_depth > 0 {
            let (tx, rx) = mpsc::channel::<Task>(capacity);
            new_tasks_tx = Some(tx);
            recursion_handle = Some(self.spawn_recursion_consumer(
                rx,
                tasks_tx.clone(),
                Arc::clone(&words),
                Arc::clone(&outstanding),
                cancel.clone(),
                scan_done.clone(),
            ));
        }

        let mut worker_handles = Vec::with_capacity(threads);
        for _ in 0..threads {
            let ctx = WorkerContext {
                cfg: Arc::clone(&self.cfg),
                client: Arc::clone(&self.client),
                cal_cache: Arc::clone(&self.cal_cache),
                stats: Arc::clone(&self.stats),
                outstanding: Arc::clone(&outstanding),
                cancel: cancel.clone(),
                scan_done: scan_done.clone(),
                tasks: Arc::clone(&tasks_rx),
                results_tx: results_tx.clone(),
                new_tasks_tx: new_tasks_tx.clone(),
            };
            worker_handles.push(tokio::spawn(worker_loop(ctx)));
        }
        drop(results_tx);
        drop(new_tasks_tx);

        let seeder = {
            let targets = targets.to_vec();
            let words = Arc::clone(&words);
            let extensions = self.cfg.extensions.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                for target in &targets {
                    for word in words.iter() {
                        let mut paths = Vec::with_capacity(1 + extensions.len());
                        paths.push(word.clone());
                        for ext in &extensions {
                            paths.push(format!("{}{}", word, ext));
                        }

                        for path in paths {
                            let task = Task {
                                target_url: target.clone(),
                                path,
                                depth: 1,
                            };
                            tokio::select! {
                                _ = cancel.cancelled() => return,
                                _ = tasks_tx.send(task) => {}
                            }
                        }
                    }
                }
            })
        };

        let watcher = {
            let outstanding = Arc::clone(&outstanding);
            let cancel = cancel.clone();
            let scan_done = scan_done.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = outstanding.wait_zero() => {}
                    _ = cancel.cancelled() => {}
                }
                scan_done.cancel();
            })
        };

        for handle in worker_handles {
            let _ = handle.await;
        }
        if let Some(handle) = recursion_handle {
            let _ = handle.await;
        }
        let _ = seeder.await;
        let _ = watcher.await;

        let results = aggregator.await.context("result aggregator panicked")?;
        info!(
            "Scan finished: {} results, {} processed, {} errors",
            results.len(),
            self.stats.processed(),
            self.stats.errors()
        );

        Ok(results)
    }

    /// Turns each directory discovery into a full wordlist fan-out at the
    /// next depth, deduplicating per (target, directory) so recursion fans
    /// out at most once per directory.
    fn spawn_recursion_consumer(
        &self,
        mut new_tasks_rx: mpsc::Receiver<Task>,
        tasks_tx: mpsc::Sender<Task>,
        words: Arc<Vec<String>>,
        outstanding: Arc<TaskCounter>,
        cancel: CancellationToken,
        scan_done: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let max_depth = self.cfg.max_depth;
        let extensions = self.cfg.extensions.clone();
        let stats = Arc::clone(&self.stats);

        tokio::spawn(async move {
            let mut scanned_dirs: HashMap<String, HashSet<String>> = HashMap::new();

            loop {
                let new_task = tokio::select! {
                    _ = scan_done.cancelled() => break,
                    task = new_tasks_rx.recv() => match task {
                        Some(task) => task,
                        None => break,
                    },
                };

                if cancel.is_cancelled() {
                    outstanding.done();
                    continue;
                }

                let dirs = scanned_dirs
                    .entry(new_task.target_url.clone())
                    .or_default();
                if dirs.contains(&new_task.path) || new_task.depth > max_depth {
                    outstanding.done();
                    continue;
                }
                dirs.insert(new_task.path.clone());
                debug!(
                    "Recursing into {}{} at depth {}",
                    new_task.target_url, new_task.path, new_task.depth
                );

                let dir = new_task.path.trim_end_matches('/');
                'fanout: for word in words.iter() {
                    let mut paths = Vec::with_capacity(1 + extensions.len());
                    paths.push(format!("{}/{}", dir, word));
                    for ext in &extensions {
                        paths.push(format!("{}/{}{}", dir, word, ext));
                    }

                    for path in paths {
                        outstanding.add(1);
                        let task = Task {
                            target_url: new_task.target_url.clone(),
                            path,
                            depth: new_task.depth,
                        };
                        tokio::select! {
                            _ = cancel.cancelled() => {
                                outstanding.done();
                                break 'fanout;
                            }
                            sent = tasks_tx.send(task) => {
                                if sent.is_err() {
                                    outstanding.done();
                                    break 'fanout;
                                }
                                stats.increment_total(1);
                            }
                        }
                    }
                }

                outstanding.done();
            }
        })
    }
}

/// Loads the wordlist: whitespace-trimmed lines, skipping blanks and
/// `#`-prefixed comments. Order is preserved, duplicates are kept.
pub fn load_wordlist(path: &Path) -> Result<Vec<String>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open wordlist {}", path.display()))?;

    let mut words = Vec::new();
    for line in std::io::BufReader::new(file).lines() {
        let line = line.context("failed to read wordlist line")?;
        let word = line.trim();
        if !word.is_empty() && !word.starts_with('#') {
            words.push(word.to_string());
        }
    }

    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_wordlist(lines: &[&str]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "capsaicin-wordlist-{}-{:p}.txt",
            std::process::id(),
            &lines
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        path
    }

    #[test]
    fn test_load_wordlist_skips_comments_and_blanks() {
        let path = temp_wordlist(&["admin", "# comment", "", "api", "secret"]);
        let words = load_wordlist(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(words, vec!["admin", "api", "secret"]);
    }

    #[test]
    fn test_load_wordlist_missing_file() {
        assert!(load_wordlist(Path::new("/nonexistent/wordlist.txt")).is_err());
    }

    #[test]
    fn test_load_wordlist_preserves_duplicates_and_order() {
        let path = temp_wordlist(&["b", "a", "b"]);
        let words = load_wordlist(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(words, vec!["b", "a", "b"]);
    }
}
