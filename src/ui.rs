// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Terminal Output
 * Banner, configuration panel, per-result lines, live progress, summary
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::scanner::{ScanResult, Stats};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const MAGENTA: &str = "\x1b[35m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

const BG_RED: &str = "\x1b[41m";
const BG_GREEN: &str = "\x1b[42m";
const BG_YELLOW: &str = "\x1b[43m";
const BG_BLUE: &str = "\x1b[44m";
const BG_MAGENTA: &str = "\x1b[45m";

const CLEAR_LINE: &str = "\x1b[2K";

pub fn print_banner() {
    println!();
    println!("  {}{}┌──────────────────────────────────────────────────┐{}", BOLD, RED, RESET);
    println!(
        "  {}{}│{}  🌶  {}{}CAPSAICIN{}  {}v3.0{}  {}{}─  Web Directory Scanner  {}{}│{}",
        BOLD, RED, RESET, BOLD, WHITE, RESET, DIM, RESET, DIM, WHITE, RESET, BOLD, RESET
    );
    println!("  {}{}└──────────────────────────────────────────────────┘{}", BOLD, RED, RESET);
    println!();
}

pub fn print_config(cfg: &Config, target_count: usize) {
    println!("  {}{}⚙  Scan Configuration{}", BOLD, CYAN, RESET);
    println!("  {}──────────────────────────────────────{}", DIM, RESET);
    println!("  {}{:<14}{} {}{}{}", DIM, "Targets", RESET, WHITE, target_count, RESET);
    println!("  {}{:<14}{} {}{}{}", DIM, "Threads", RESET, WHITE, cfg.threads, RESET);
    println!("  {}{:<14}{} {}{}s{}", DIM, "Timeout", RESET, WHITE, cfg.timeout, RESET);
    println!(
        "  {}{:<14}{} {}{}{}",
        DIM,
        "Wordlist",
        RESET,
        WHITE,
        cfg.wordlist.display(),
        RESET
    );

    if cfg.rate_limit > 0 {
        println!("  {}{:<14}{} {}{} req/s{}", DIM, "Rate Limit", RESET, WHITE, cfg.rate_limit, RESET);
    } else {
        println!("  {}{:<14}{} {}unlimited{}", DIM, "Rate Limit", RESET, DIM, RESET);
    }

    if cfg.max_depth > 0 {
        println!("  {}{:<14}{} {}{}{}", DIM, "Max Depth", RESET, WHITE, cfg.max_depth, RESET);
    }
    if !cfg.extensions.is_empty() {
        println!(
            "  {}{:<14}{} {}{}{}",
            DIM,
            "Extensions",
            RESET,
            WHITE,
            cfg.extensions.join(", "),
            RESET
        );
    }
    if cfg.safe_mode {
        println!("  {}{:<14}{} {}{}⚠ Safe Mode{}", DIM, "Mode", RESET, BOLD, YELLOW, RESET);
    }
    println!("  {}──────────────────────────────────────{}", DIM, RESET);
    println!();
}

/// One formatted result line with a status badge and finding tags.
pub fn print_result(result: &ScanResult) {
    let status_color = status_color(result.status_code);
    let status_bg = status_bg(result.status_code);

    let mut tags = Vec::new();
    if result.critical {
        tags.push(format!("{}{} CRITICAL {}", BOLD, BG_RED, RESET));
    }
    if result.secret_found {
        tags.push(format!("{}{} 🔑 SECRET {}", BOLD, BG_MAGENTA, RESET));
    }
    if !result.waf_detected.is_empty() {
        tags.push(format!("{}{} 🛡 {} {}", BOLD, BG_YELLOW, result.waf_detected, RESET));
    }
    if result.method != "GET" {
        tags.push(format!("{}{}{}{}", DIM, CYAN, result.method, RESET));
    }
    if !result.technologies.is_empty() {
        tags.push(format!(
            "{}{}[{}]{}",
            DIM,
            BLUE,
            result.technologies.join(", "),
            RESET
        ));
    }

    let tag_str = if tags.is_empty() {
        String::new()
    } else {
        format!("  {}", tags.join(" "))
    };

    println!(
        " {}{} {} {}  {}{}{}  {}{}{}{}",
        BOLD,
        status_bg,
        result.status_code,
        RESET,
        DIM,
        format_size(result.size),
        RESET,
        status_color,
        result.url,
        RESET,
        tag_str
    );
}

/// Live progress line: spinner, bar, throughput, and finding counters.
/// Runs until `done` fires, then clears its line.
pub async fn start_progress(stats: Arc<Stats>, done: CancellationToken) {
    const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    let mut frame = 0usize;

    loop {
        tokio::select! {
            _ = done.cancelled() => {
                print!("\r{}", CLEAR_LINE);
                let _ = std::io::stdout().flush();
                return;
            }
            _ = ticker.tick() => {}
        }

        let elapsed = stats.start_time().elapsed().as_secs_f64().max(1.0);
        let processed = stats.processed();
        let total = stats.total();
        let req_per_sec = processed as f64 / elapsed;
        let progress = if total > 0 {
            processed as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        let bar_width = 20usize;
        let filled = ((progress / 100.0 * bar_width as f64) as usize).min(bar_width);
        let bar = format!("{}{}", "█".repeat(filled), "░".repeat(bar_width - filled));

        let spinner = SPINNER[frame % SPINNER.len()];
        frame += 1;

        let mut extra = String::new();
        if stats.secrets() > 0 {
            extra.push_str(&format!("  {}🔑 {}{}", MAGENTA, stats.secrets(), RESET));
        }
        if stats.waf_hits() > 0 {
            extra.push_str(&format!("  {}🛡 {}{}", YELLOW, stats.waf_hits(), RESET));
        }
        if stats.errors() > 0 {
            extra.push_str(&format!("  {}✗ {}{}", RED, stats.errors(), RESET));
        }

        print!(
            "\r{}  {}{} {}{}{} {}{:.0}%{}  {}{}{} req/s  Found: {}{}{}{}",
            CLEAR_LINE,
            CYAN,
            spinner,
            DIM,
            bar,
            RESET,
            BOLD,
            progress,
            RESET,
            DIM,
            req_per_sec as u64,
            RESET,
            GREEN,
            stats.found(),
            RESET,
            extra
        );
        let _ = std::io::stdout().flush();
    }
}

pub fn print_summary(stats: &Stats) {
    let elapsed = stats.start_time().elapsed();
    let processed = stats.processed();
    let req_per_sec = if elapsed.as_secs_f64() > 0.0 {
        processed as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };

    let errors = stats.errors();
    let error_rate = if processed > 0 {
        errors as f64 / processed as f64 * 100.0
    } else {
        0.0
    };

    println!();
    println!("  {}{}✔  Scan Complete{}", BOLD, GREEN, RESET);
    println!("  {}──────────────────────────────────────{}", DIM, RESET);
    println!("  {}{:<14}{} {}{}{}", DIM, "Requests", RESET, WHITE, processed, RESET);
    println!(
        "  {}{:<14}{} {}{}{}{}",
        DIM,
        "Findings",
        RESET,
        BOLD,
        GREEN,
        stats.found(),
        RESET
    );

    if stats.secrets() > 0 {
        println!(
            "  {}{:<14}{} {}{}{}{}",
            DIM,
            "Secrets",
            RESET,
            BOLD,
            MAGENTA,
            stats.secrets(),
            RESET
        );
    }
    if stats.waf_hits() > 0 {
        println!(
            "  {}{:<14}{} {}{}{}{}",
            DIM,
            "WAF Hits",
            RESET,
            BOLD,
            YELLOW,
            stats.waf_hits(),
            RESET
        );
    }
    if errors > 0 {
        println!(
            "  {}{:<14}{} {}{}{}{}  {}({:.1}%){}",
            DIM, "Errors", RESET, BOLD, RED, errors, RESET, DIM, error_rate, RESET
        );
    }

    println!(
        "  {}{:<14}{} {}{:.2?}{}",
        DIM, "Duration", RESET, WHITE, elapsed, RESET
    );
    println!(
        "  {}{:<14}{} {}{:.0} req/s{}",
        DIM, "Speed", RESET, WHITE, req_per_sec, RESET
    );
    println!();
}

fn status_color(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => GREEN,
        300..=399 => BLUE,
        400..=499 => RED,
        500.. => YELLOW,
        _ => WHITE,
    }
}

fn status_bg(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => BG_GREEN,
        300..=399 => BG_BLUE,
        400..=499 => BG_RED,
        500.. => BG_YELLOW,
        _ => "",
    }
}

fn format_size(bytes: usize) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:5.1}MB", bytes as f64 / 1024.0 / 1024.0)
    } else if bytes >= 1024 {
        format!("{:5.1}KB", bytes as f64 / 1024.0)
    } else {
        format!("{:6}B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "   512B");
        assert_eq!(format_size(2048), "  2.0KB");
        assert_eq!(format_size(3 * 1024 * 1024), "  3.0MB");
    }

    #[test]
    fn test_status_colors() {
        assert_eq!(status_color(200), GREEN);
        assert_eq!(status_color(301), BLUE);
        assert_eq!(status_color(404), RED);
        assert_eq!(status_color(500), YELLOW);
        assert_eq!(status_bg(200), BG_GREEN);
    }
}
