// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// codescan: print the barcodes found in scanned images and PDF documents.
//
// Entry point. Initialises logging, loads the configuration, scans every
// input in turn and prints its page map. Ctrl-C or SIGTERM cancel in-flight
// work.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use codescan_core::{CodescanError, PageCodes, ScanConfig};
use codescan_pipeline::Scanner;
use serde_json::json;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Input name that stands for standard input.
const STDIN: &str = "-";

/// Extract barcodes and QR codes from scanned images and PDF files.
#[derive(Parser, Debug)]
#[command(name = "codescan")]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Pages scanned concurrently (default: available CPUs)
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Skip the external deskew/despeckle pass
    #[arg(long)]
    no_cleanup: bool,

    /// Print one JSON object per input instead of text lines
    #[arg(long)]
    json: bool,

    /// Images or PDFs to scan; `-` or nothing reads standard input
    #[arg(value_name = "FILE")]
    paths: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("codescan: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

/// Scan every input. Returns whether all of them completed.
async fn run(args: Args) -> anyhow::Result<bool> {
    let config = build_config(&args)?;
    let scanner = Scanner::from_config(&config).context("invalid configuration")?;
    info!(
        parallelism = scanner.parallelism(),
        cleanup = config.cleanup.enabled,
        "codescan starting"
    );

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    let inputs = if args.paths.is_empty() {
        vec![STDIN.to_string()]
    } else {
        args.paths.clone()
    };

    let mut all_ok = true;
    for input in &inputs {
        if cancel.is_cancelled() {
            all_ok = false;
            break;
        }
        let data = match read_input(input).await {
            Ok(data) => data,
            Err(err) => {
                error!(input = %input, error = %err, "Cannot read input");
                eprintln!("codescan: {}: {:#}", input, err);
                all_ok = false;
                continue;
            }
        };

        match scanner.process(data, &cancel).await {
            Ok(pages) => emit(input, &pages, None, args.json)?,
            Err(partial) => {
                error!(input = %input, error = %partial.error, "Scan failed");
                emit(input, &partial.pages, Some(&partial.error), args.json)?;
                all_ok = false;
                if partial.error.is_cancelled() {
                    break;
                }
            }
        }
    }

    scanner.shutdown();
    Ok(all_ok)
}

fn build_config(args: &Args) -> anyhow::Result<ScanConfig> {
    let mut config = match &args.config {
        Some(path) => ScanConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ScanConfig::default(),
    };
    if let Some(jobs) = args.jobs {
        config.parallelism = jobs;
    }
    if args.no_cleanup {
        config.cleanup.enabled = false;
    }
    Ok(config)
}

async fn read_input(input: &str) -> anyhow::Result<Vec<u8>> {
    if input == STDIN {
        let mut data = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut data)
            .await
            .context("failed to read standard input")?;
        Ok(data)
    } else {
        tokio::fs::read(input)
            .await
            .with_context(|| format!("failed to read {}", input))
    }
}

// -- Output --

fn emit(
    input: &str,
    pages: &PageCodes,
    error: Option<&CodescanError>,
    as_json: bool,
) -> anyhow::Result<()> {
    if as_json {
        println!("{}", serde_json::to_string(&json_report(input, pages, error))?);
    } else {
        for line in text_report(input, pages) {
            println!("{}", line);
        }
    }
    Ok(())
}

/// `input: page N: code, code` per page, or a single line when nothing was
/// found.
fn text_report(input: &str, pages: &PageCodes) -> Vec<String> {
    if pages.values().all(Vec::is_empty) {
        return vec![format!("{}: no codes found", input)];
    }
    pages
        .iter()
        .map(|(page, codes)| format!("{}: page {}: {}", input, page, codes.join(", ")))
        .collect()
}

fn json_report(
    input: &str,
    pages: &PageCodes,
    error: Option<&CodescanError>,
) -> serde_json::Value {
    let mut report = json!({
        "input": input,
        "pages": pages,
    });
    if let Some(err) = error {
        report["error"] = json!(err.to_string());
    }
    report
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Shutdown signal received, cancelling scans");
    cancel.cancel();
}
