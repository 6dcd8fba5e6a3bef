// src/pipeline/engine.rs
//
// Frame-sequential driver for the aggregation core.
//
// Per frame:
//   1. Skip unconfirmed tracks
//   2. Recover each track's confidence from the raw detections (IoU)
//   3. Observe the centroid in the track store (zones + motion)
//   4. Build the display labels from the freshly updated state
//   5. Every N frames, reconcile surplus identities
//
// All state lives behind `&mut self`. Callers that split detection and
// aggregation across tasks must funnel frames into one owner of this
// struct (see main.rs), never share it between writers.

use crate::analysis::{
    ReconcilerConfig, ReconciliationReport, TrackReconciler, TrackRecord, TrackStateStore,
};
use crate::pipeline::frame_context::FrameInput;
use crate::pipeline::metrics::PipelineMetrics;
use crate::summary::{build_summaries, TrackSummary};
use crate::types::{BBox, EngineConfig, TrackId, Zone};
use anyhow::{Context, Result};
use tracing::{debug, info};

/// Label lines for one track, as drawn next to its box.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackLabel {
    pub track_id: TrackId,
    pub bbox: BBox,
    pub lines: Vec<String>,
}

/// Read projection handed to the display collaborator after each frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub frame_id: u64,
    pub timestamp: f64,
    pub active_tracks: usize,
    pub labels: Vec<TrackLabel>,
    pub reconciliation: Option<ReconciliationReport>,
}

impl FrameReport {
    pub fn active_tracks_line(&self) -> String {
        format!("Active Tracks: {}", self.active_tracks)
    }
}

pub struct AggregationEngine {
    config: EngineConfig,
    store: TrackStateStore,
    reconciler: TrackReconciler,
    metrics: PipelineMetrics,
    frame_count: u64,
    last_timestamp: f64,
}

impl AggregationEngine {
    pub fn new(zones: Vec<Zone>, config: EngineConfig, metrics: PipelineMetrics) -> Result<Self> {
        config.validate().context("Invalid engine configuration")?;
        let reconciler = TrackReconciler::new(ReconcilerConfig {
            max_expected_persons: config.max_expected_persons,
            distance_threshold: config.reconciliation_distance_threshold,
        });
        info!(
            "✓ Aggregation engine ready: {} zone(s), max {} person(s), reconcile every {} frames",
            zones.len(),
            config.max_expected_persons,
            config.reconciliation_interval_frames
        );
        Ok(Self {
            store: TrackStateStore::new(zones, config.clone()),
            config,
            reconciler,
            metrics,
            frame_count: 0,
            last_timestamp: 0.0,
        })
    }

    pub fn process_frame(&mut self, frame: &FrameInput) -> FrameReport {
        self.frame_count += 1;
        self.metrics.inc(&self.metrics.total_frames);
        let now = frame.timestamp;
        self.last_timestamp = self.last_timestamp.max(now);

        let mut labels = Vec::with_capacity(frame.tracks.len());
        let mut active: Vec<TrackId> = Vec::with_capacity(frame.tracks.len());

        for track in &frame.tracks {
            if !track.is_confirmed {
                self.metrics.inc(&self.metrics.unconfirmed_skipped);
                continue;
            }

            let confidence = frame.associate_confidence(track, &self.config);
            if confidence.is_some() {
                self.metrics.inc(&self.metrics.confidence_matches);
            }

            let record = self
                .store
                .observe(track.track_id, track.centroid(), confidence, now);
            self.metrics.inc(&self.metrics.observations);

            labels.push(TrackLabel {
                track_id: track.track_id,
                bbox: track.bbox,
                lines: label_lines(record, now),
            });
            if !active.contains(&track.track_id) {
                active.push(track.track_id);
            }
        }

        let mut reconciliation = None;
        if self.frame_count % self.config.reconciliation_interval_frames == 0 {
            let report = self.reconciler.reconcile(&mut self.store, active.len(), now);
            if !report.is_empty() {
                self.metrics.inc(&self.metrics.reconciliations);
                self.metrics
                    .add(&self.metrics.tracks_merged, report.merged.len() as u64);
                self.metrics
                    .add(&self.metrics.tracks_discarded, report.discarded.len() as u64);
                reconciliation = Some(report);
            }
            debug!(
                "Frame {}: {} active, {} stored track(s)",
                self.frame_count,
                active.len(),
                self.store.len()
            );
        }

        FrameReport {
            frame_id: frame.frame_id,
            timestamp: now,
            active_tracks: active.len(),
            labels,
            reconciliation,
        }
    }

    /// Final per-person totals, with open intervals closed at `now`.
    pub fn summarize(&self, now: f64) -> Vec<TrackSummary> {
        build_summaries(&self.store, self.config.max_expected_persons, now)
    }

    pub fn store(&self) -> &TrackStateStore {
        &self.store
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Latest frame timestamp seen, used as the session end time.
    pub fn last_timestamp(&self) -> f64 {
        self.last_timestamp
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }
}

/// Zone lines for every zone currently holding the track, then the
/// live total of its motion state.
fn label_lines(record: &TrackRecord, now: f64) -> Vec<String> {
    let mut lines = Vec::new();
    for timer in &record.zone_timers {
        if timer.is_inside() {
            lines.push(format!(
                "ID {} - {}: {}s",
                record.id,
                timer.zone_name(),
                timer.current_total(now) as u64
            ));
        }
    }
    if let Some((state, total)) = record.motion.current_state_total(now) {
        lines.push(format!(
            "ID {} - {}: {}s",
            record.id,
            state.as_str(),
            total as u64
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ZoneConfig;

    fn zones() -> Vec<Zone> {
        vec![Zone::from_config(&ZoneConfig {
            name: "desk1".into(),
            points: vec![[0, 0], [200, 0], [200, 200], [0, 200]],
        })]
    }

    fn engine(cfg: EngineConfig) -> AggregationEngine {
        AggregationEngine::new(zones(), cfg, PipelineMetrics::new()).unwrap()
    }

    fn seated(frame_id: u64, t: f64) -> FrameInput {
        FrameInput::new(frame_id, t).with_track(5, [90.0, 90.0, 110.0, 110.0])
    }

    #[test]
    fn test_labels_show_zone_and_motion() {
        let mut engine = engine(EngineConfig::default());
        engine.process_frame(&seated(1, 0.0));
        let report = engine.process_frame(&seated(2, 3.0));
        assert_eq!(report.active_tracks, 1);
        assert_eq!(report.active_tracks_line(), "Active Tracks: 1");
        assert_eq!(
            report.labels[0].lines,
            vec!["ID 5 - desk1: 3s".to_string(), "ID 5 - Sitting: 3s".to_string()]
        );
    }

    #[test]
    fn test_zero_reconciliation_interval_rejected() {
        let cfg = EngineConfig {
            reconciliation_interval_frames: 0,
            ..EngineConfig::default()
        };
        let result = AggregationEngine::new(zones(), cfg, PipelineMetrics::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_unconfirmed_tracks_are_skipped() {
        let mut engine = engine(EngineConfig::default());
        let mut frame = FrameInput::new(1, 0.0).with_track(1, [0.0, 0.0, 10.0, 10.0]);
        frame.tracks[0].is_confirmed = false;
        let report = engine.process_frame(&frame);
        assert_eq!(report.active_tracks, 0);
        assert!(engine.store().is_empty());
        assert_eq!(engine.metrics().summary().unconfirmed_skipped, 1);
    }

    #[test]
    fn test_confidence_recovered_from_detections() {
        let mut engine = engine(EngineConfig::default());
        let frame = FrameInput::new(1, 0.0)
            .with_track(1, [0.0, 0.0, 100.0, 100.0])
            .with_detection([2.0, 2.0, 100.0, 100.0], 0.85);
        engine.process_frame(&frame);
        assert_eq!(engine.store().get(1).unwrap().confidence, 0.85);
    }

    #[test]
    fn test_reconciliation_runs_on_interval_only() {
        let cfg = EngineConfig {
            max_expected_persons: 1,
            reconciliation_interval_frames: 3,
            ..EngineConfig::default()
        };
        let mut engine = engine(cfg);
        for i in 1..=2u64 {
            let frame = FrameInput::new(i, i as f64)
                .with_track(1, [0.0, 0.0, 20.0, 20.0])
                .with_track(2, [10.0, 0.0, 30.0, 20.0]);
            let report = engine.process_frame(&frame);
            assert!(report.reconciliation.is_none());
        }
        assert_eq!(engine.store().len(), 2);

        let frame = FrameInput::new(3, 3.0)
            .with_track(1, [0.0, 0.0, 20.0, 20.0])
            .with_track(2, [10.0, 0.0, 30.0, 20.0]);
        let report = engine.process_frame(&frame);
        let reconciliation = report.reconciliation.unwrap();
        assert_eq!(reconciliation.merged.len(), 1);
        assert_eq!(engine.store().len(), 1);
        assert_eq!(engine.metrics().summary().tracks_merged, 1);
    }
}
