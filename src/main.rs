use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sitedup::{
    CountingMetrics, DuplicateSession, EngineConfig, PageInput, PageSender, SimilarityPipeline,
};
use tracing_subscriber::EnvFilter;

/// Detect duplicate and near-duplicate pages in a crawl.
///
/// Reads one JSON page per line, `{"url": ..., "text": ...}` or
/// `{"url": ..., "markup": ...}`, and writes the duplicate report as JSON.
#[derive(Debug, Parser)]
#[command(name = "sitedup", version, about)]
struct Cli {
    /// JSON-lines page file. Reads stdin when omitted or `-`.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Report destination. Writes stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// YAML engine configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Default log filter when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON.
    #[arg(long)]
    json_logs: bool,

    /// Skip reconciliation and report incremental scores.
    #[arg(long)]
    provisional: bool,
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false);
    if json {
        builder
            .with_thread_ids(true)
            .with_thread_names(true)
            .json()
            .init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    tracing::info!(
        name = ?config.name,
        permutations = config.num_permutations,
        bands = config.num_bands,
        rows_per_band = config.rows_per_band,
        "sitedup_starting"
    );

    let metrics = Arc::new(CountingMetrics::new());
    let session = DuplicateSession::new(config)
        .context("invalid engine configuration")?
        .with_metrics(metrics.clone());
    let pipeline = SimilarityPipeline::spawn_default(session);

    let cancel = pipeline.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, stopping after the current page");
            cancel.cancel();
        }
    });

    let sender = pipeline.sender();
    let input = cli.input.clone();
    let submitted = tokio::task::spawn_blocking(move || feed(input, &sender))
        .await
        .context("input reader panicked")??;

    let outcome = pipeline.finish().await?;
    tracing::info!(
        submitted,
        processed = outcome.processed,
        excluded = outcome.excluded,
        failed = outcome.failed,
        overflow_admitted = outcome.overflow_admitted,
        dropped = outcome.dropped,
        cancelled = outcome.cancelled,
        "sitedup_pipeline_done"
    );

    let report = if cli.provisional {
        outcome.session.provisional_report()
    } else {
        outcome.session.finish()
    };

    let snapshot = metrics.snapshot();
    tracing::info!(
        pages = report.stats.pages_admitted,
        excluded = report.stats.pages_excluded,
        clusters = report.stats.cluster_count,
        candidates = snapshot.candidates,
        compared = snapshot.compared,
        overflowed = snapshot.overflowed,
        provisional = report.provisional,
        "sitedup_report_ready"
    );

    match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating report file {}", path.display()))?;
            write_report(BufWriter::new(file), &report)?;
        }
        None => write_report(io::stdout().lock(), &report)?,
    }
    Ok(())
}

/// Read JSON-lines pages and queue them, waiting for room so every page is
/// scored incrementally. Malformed lines are logged and skipped.
fn feed(input: Option<PathBuf>, sender: &PageSender) -> Result<usize> {
    let reader: Box<dyn BufRead> = match input {
        Some(path) if path.as_os_str() != "-" => Box::new(BufReader::new(
            File::open(&path).with_context(|| format!("opening {}", path.display()))?,
        )),
        _ => Box::new(BufReader::new(io::stdin())),
    };

    let mut submitted = 0;
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.context("reading input")?;
        if line.trim().is_empty() {
            continue;
        }
        let page: PageInput = match serde_json::from_str(&line) {
            Ok(page) => page,
            Err(err) => {
                tracing::warn!(line = line_no + 1, error = %err, "sitedup_bad_input_line");
                continue;
            }
        };
        match sender.send_blocking(page) {
            Ok(()) => submitted += 1,
            Err(err) => {
                tracing::warn!(error = %err, "sitedup_submit_stopped");
                break;
            }
        }
    }
    Ok(submitted)
}

fn write_report<W: Write>(mut out: W, report: &sitedup::DuplicateReport) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, report).context("writing report")?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
