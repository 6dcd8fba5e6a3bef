// src/main.rs

use anyhow::{Context, Result};
use desk_dwell::persistence::UuidIdGenerator;
use desk_dwell::pipeline::{AggregationEngine, FrameInput, PipelineMetrics};
use desk_dwell::summary::{SummaryEmitter, TrackSummary};
use desk_dwell::types::Config;
use desk_dwell::JsonlPersonStore;
use std::fs::File;
use std::io::{BufRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path =
        std::env::var("DESK_DWELL_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = Config::load(&config_path)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("Invalid logging.level filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🪑 Desk dwell aggregation starting");
    info!("✓ Configuration loaded from {}", config_path);
    info!(
        "Motion: threshold={:.1}px/s window={:.1}s | Reconcile: max_persons={} every {} frames within {:.0}px",
        config.engine.movement_threshold,
        config.engine.movement_window_seconds,
        config.engine.max_expected_persons,
        config.engine.reconciliation_interval_frames,
        config.engine.reconciliation_distance_threshold
    );

    let metrics = PipelineMetrics::new();
    let (tx, rx) = mpsc::channel::<FrameInput>(config.input.channel_capacity.max(1));

    let frames_path = config.input.frames_path.clone();
    let reader = tokio::task::spawn_blocking(move || read_frames(&frames_path, tx));

    let engine = AggregationEngine::new(
        config.build_zones(),
        config.engine.clone(),
        metrics.clone(),
    )?;
    let aggregator = tokio::spawn(aggregate(engine, rx));

    let frames_sent = reader.await.context("Frame reader panicked")??;
    let summaries = aggregator.await.context("Aggregation task panicked")?;
    info!(
        "✓ Stream drained: {} frame(s) read, {} person summary(ies)",
        frames_sent,
        summaries.len()
    );

    // Aggregation has finished; store I/O never overlaps track updates.
    let mut store = JsonlPersonStore::open(&config.output.store_path)
        .with_context(|| format!("Failed to open person store {}", config.output.store_path))?;
    let emitter = SummaryEmitter::new(config.output.max_id_attempts, metrics.clone());
    let report = emitter
        .emit(&summaries, &mut store, &mut UuidIdGenerator)
        .context("Summary emission aborted")?;

    for (track_id, e) in &report.failed {
        error!("❌ Summary for track T{} was not stored: {}", track_id, e);
    }

    let stats = metrics.summary();
    info!("\n========================================");
    info!("  Frames processed: {}", stats.total_frames);
    info!("  Observations: {}", stats.observations);
    info!("  Unconfirmed tracks skipped: {}", stats.unconfirmed_skipped);
    info!("  Reconciliations: {}", stats.reconciliations);
    info!("  Tracks merged: {}", stats.tracks_merged);
    info!("  Tracks discarded: {}", stats.tracks_discarded);
    info!("  Records stored: {}", stats.records_stored);
    info!("  Store failures: {}", stats.store_failures);
    info!("  Throughput: {:.1} frames/s", stats.fps);
    info!("========================================\n");
    debug!("{}", serde_json::to_string(&stats)?);

    if !report.failed.is_empty() {
        anyhow::bail!("{} summary record(s) failed to store", report.failed.len());
    }
    Ok(())
}

/// Parse the tracker's JSON-lines output and feed the aggregation task.
/// Returns the number of frames handed over.
fn read_frames(path: &str, tx: mpsc::Sender<FrameInput>) -> Result<u64> {
    let file = File::open(path).with_context(|| format!("Failed to open frames file {}", path))?;
    info!("📂 Reading tracker output from {}", path);

    let mut sent = 0u64;
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: FrameInput = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Skipping malformed frame at line {}: {}", line_no + 1, e);
                continue;
            }
        };
        if tx.blocking_send(frame).is_err() {
            warn!("Aggregation task stopped early; {} frame(s) delivered", sent);
            break;
        }
        sent += 1;
    }
    Ok(sent)
}

/// Single consumer of the frame stream. Owns the engine outright, drains
/// every queued frame once the sender is dropped, then snapshots totals.
async fn aggregate(
    mut engine: AggregationEngine,
    mut rx: mpsc::Receiver<FrameInput>,
) -> Vec<TrackSummary> {
    while let Some(frame) = rx.recv().await {
        if engine.frame_count() > 0 && frame.timestamp < engine.last_timestamp() {
            warn!(
                "⏪ Frame {} timestamp {:.3}s goes backwards (last {:.3}s), skipped",
                frame.frame_id,
                frame.timestamp,
                engine.last_timestamp()
            );
            continue;
        }

        let report = engine.process_frame(&frame);

        for label in &report.labels {
            for line in &label.lines {
                debug!("{}", line);
            }
        }
        if engine.frame_count() % 90 == 0 {
            info!(
                "Frame {}: {} | {} stored track(s)",
                engine.frame_count(),
                report.active_tracks_line(),
                engine.store().len()
            );
        }
    }

    let session_end = engine.last_timestamp();
    info!("🏁 Session ended at {:.2}s", session_end);
    engine.summarize(session_end)
}
