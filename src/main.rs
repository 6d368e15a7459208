// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Capsaicin CLI
 * Target intake, signal handling, scan execution, and report writing
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use chrono::{SecondsFormat, Utc};
use clap::Parser;
use std::io::{BufRead, IsTerminal};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};

use capsaicin::config::{Cli, Config};
use capsaicin::reporting;
use capsaicin::scanner::Engine;
use capsaicin::ui;

// Exit codes: 0 completed scan, 1 configuration or fatal scan error,
// 130 signal-driven cancellation.
const EXIT_OK: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_INTERRUPTED: u8 = 130;

fn main() -> ExitCode {
    ui::print_banner();

    let cli = Cli::parse();
    let cfg = Config::from_cli(cli);

    init_tracing(&cfg.log_level);

    let mut targets = Vec::new();
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        println!("Reading targets from STDIN...");
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let target = line.trim();
            if !target.is_empty() && !target.starts_with('#') {
                targets.push(target.to_string());
            }
        }
        println!("Loaded {} targets", targets.len());
    } else if let Some(target) = &cfg.target_url {
        targets.push(target.clone());
    }

    if let Err(err) = cfg.validate(&mut targets) {
        eprintln!("Error: {}", err);
        return ExitCode::from(EXIT_ERROR);
    }

    let filtered = cfg.filter_targets(targets);
    if filtered.is_empty() {
        eprintln!("Error: all targets were excluded by allow/deny patterns");
        return ExitCode::from(EXIT_ERROR);
    }
    let targets = filtered;

    ui::print_config(&cfg, targets.len());

    if cfg.dry_run {
        return match dry_run(&cfg, &targets) {
            Ok(()) => ExitCode::from(EXIT_OK),
            Err(err) => {
                eprintln!("Error: {}", err);
                ExitCode::from(EXIT_ERROR)
            }
        };
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .thread_name("capsaicin-worker")
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: failed to build runtime: {}", err);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    ExitCode::from(runtime.block_on(run_scan(cfg, targets)))
}

async fn run_scan(cfg: Config, targets: Vec<String>) -> u8 {
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\n[!] Received interrupt, shutting down gracefully...");
                cancel.cancel();
            }
        });
    }

    let engine = match Engine::new(cfg.clone()) {
        Ok(engine) => engine,
        Err(err) => {
            error!("Failed to initialize engine: {}", err);
            return EXIT_ERROR;
        }
    };

    println!("Starting scan...");
    let start_time = Utc::now();

    let progress_done = CancellationToken::new();
    let progress = tokio::spawn(ui::start_progress(engine.stats(), progress_done.clone()));

    let outcome = engine.run_cancellable(cancel.clone(), &targets).await;

    progress_done.cancel();
    let _ = progress.await;

    let results = match outcome {
        Ok(results) => results,
        Err(err) => {
            error!("Scan error: {}", err);
            return EXIT_ERROR;
        }
    };
    let end_time = Utc::now();
    let stats = engine.stats();

    if cfg.verbose {
        let mut sorted = results.clone();
        reporting::sort_results(&mut sorted);
        for result in &sorted {
            ui::print_result(result);
        }
    }

    ui::print_summary(&stats);

    if let Some(path) = &cfg.output_file {
        let run_id = reporting::generate_run_id();
        let report = reporting::save_json_report(
            &results,
            path,
            &targets,
            &run_id,
            &start_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            &end_time.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        match report {
            Ok(()) => println!("\nJSON report saved: {}", path.display()),
            Err(err) => eprintln!("Failed to save JSON: {}", err),
        }
    }

    if let Some(path) = &cfg.html_report {
        match reporting::generate_html(&results, path) {
            Ok(()) => println!("HTML report saved: {}", path.display()),
            Err(err) => eprintln!("Failed to generate HTML: {}", err),
        }
    }

    if cancel.is_cancelled() {
        warn!("Scan cancelled; reported partial results");
        return EXIT_INTERRUPTED;
    }

    info!("Scan completed with {} findings", results.len());
    EXIT_OK
}

/// Prints the scan plan without issuing any requests.
fn dry_run(cfg: &Config, targets: &[String]) -> anyhow::Result<()> {
    let words = capsaicin::scanner::engine::load_wordlist(&cfg.wordlist)?;
    let per_word = 1 + cfg.extensions.len();
    let total = targets.len() * words.len() * per_word;

    println!("Dry run: no requests will be sent");
    println!("  Targets:    {}", targets.len());
    for target in targets {
        println!("    {}", target);
    }
    println!("  Words:      {}", words.len());
    println!("  Extensions: {}", cfg.extensions.len());
    println!("  Tasks:      {}", total);

    Ok(())
}

fn init_tracing(log_level: &str) {
    let level = match log_level {
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
