use std::fs;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use price_collector::aggregator::{self, PriceBoard};
use price_collector::collector::Collector;
use price_collector::config::Config;
use price_collector::metrics::METRICS;
use price_collector::schema::AverageOutcome;
use price_collector::source::HttpPriceSource;

/// Period of the status log line.
const STATUS_INTERVAL: Duration = Duration::from_secs(60);

// ------------------------------------------------------------
// Application entry point
// ------------------------------------------------------------
//
// Runtime for the single-series price collector.
//
// Responsibilities:
// - Load and check configuration
// - Create the aggregator (one writer, shared readers)
// - Start the collector loop
// - Log current / average / counters periodically
// - Stop the collector on Ctrl-C
//
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --------------------------------------------------------
    // Load configuration from disk
    //
    // NOTE:
    // - The config file contains the upstream API key.
    // - It must not be committed to version control.
    // --------------------------------------------------------
    let path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let config = load_config(&path)?;

    init_logging(config.debug_log());
    log::info!("loaded configuration from {}: {:?}", path, config);

    let source = HttpPriceSource::new(&config.price_api)?;
    let (recorder, board) = aggregator::new(config.collector.buffer_capacity);

    let shutdown = CancellationToken::new();
    let collector = Collector::new(
        Arc::new(source),
        recorder,
        config.collector.interval(),
        shutdown.clone(),
    );
    let collector = tokio::spawn(collector.run());

    // --------------------------------------------------------
    // Status reporter (periodic, low-noise)
    // --------------------------------------------------------
    let reporter = tokio::spawn(report_status(
        board,
        config.collector.average_window(),
        shutdown.clone(),
    ));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    log::info!("shutdown requested, waiting for the current cycle to finish");
    shutdown.cancel();

    let summary = collector.await.context("collector task panicked")?;
    reporter.await.context("status reporter panicked")?;

    log::info!(
        "bye: {} cycles, {} samples recorded, {} failed",
        summary.cycles,
        summary.recorded,
        summary.failed
    );

    Ok(())
}

/// Logs the query-side view of the series until shutdown.
async fn report_status(board: PriceBoard, window: Duration, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = sleep(STATUS_INTERVAL) => {}
        }

        let current = board.get_current();
        log::info!(
            "[STATUS] current={} ({}) dataset={}/{}",
            current.value,
            current.note,
            board.len(),
            board.capacity()
        );

        match board.get_average(window) {
            AverageOutcome::Report(report) => {
                log::info!("[STATUS] {} -> {}", report, report.average)
            }
            AverageOutcome::NoData { .. } => {
                log::info!("[STATUS] no prices in the last {:?}", window)
            }
        }

        log::info!("[METRICS] {}", METRICS.summary());
    }
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `debug.log`.
fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

// ------------------------------------------------------------
// Configuration loader
// ------------------------------------------------------------
//
// Reads a JSON configuration file from disk, deserializes it
// into the strongly typed `Config` structure and runs the
// presence checks.
//
fn load_config(path: &str) -> anyhow::Result<Config> {
    let data = fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    let cfg: Config =
        serde_json::from_str(&data).with_context(|| format!("failed to parse {path}"))?;
    cfg.validate()?;
    Ok(cfg)
}
