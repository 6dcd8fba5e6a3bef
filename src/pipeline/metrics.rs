// src/pipeline/metrics.rs
//
// Session counters. Cheap to clone and share with the writer side once
// the aggregation task has finished.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub total_frames: Arc<AtomicU64>,
    pub observations: Arc<AtomicU64>,
    pub unconfirmed_skipped: Arc<AtomicU64>,
    pub confidence_matches: Arc<AtomicU64>,
    pub reconciliations: Arc<AtomicU64>,
    pub tracks_merged: Arc<AtomicU64>,
    pub tracks_discarded: Arc<AtomicU64>,
    pub records_stored: Arc<AtomicU64>,
    pub store_failures: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            total_frames: Arc::new(AtomicU64::new(0)),
            observations: Arc::new(AtomicU64::new(0)),
            unconfirmed_skipped: Arc::new(AtomicU64::new(0)),
            confidence_matches: Arc::new(AtomicU64::new(0)),
            reconciliations: Arc::new(AtomicU64::new(0)),
            tracks_merged: Arc::new(AtomicU64::new(0)),
            tracks_discarded: Arc::new(AtomicU64::new(0)),
            records_stored: Arc::new(AtomicU64::new(0)),
            store_failures: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn fps(&self) -> f64 {
        let frames = self.total_frames.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames.load(Ordering::Relaxed),
            fps: self.fps(),
            observations: self.observations.load(Ordering::Relaxed),
            unconfirmed_skipped: self.unconfirmed_skipped.load(Ordering::Relaxed),
            confidence_matches: self.confidence_matches.load(Ordering::Relaxed),
            reconciliations: self.reconciliations.load(Ordering::Relaxed),
            tracks_merged: self.tracks_merged.load(Ordering::Relaxed),
            tracks_discarded: self.tracks_discarded.load(Ordering::Relaxed),
            records_stored: self.records_stored.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub fps: f64,
    pub observations: u64,
    pub unconfirmed_skipped: u64,
    pub confidence_matches: u64,
    pub reconciliations: u64,
    pub tracks_merged: u64,
    pub tracks_discarded: u64,
    pub records_stored: u64,
    pub store_failures: u64,
    pub elapsed_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_counters() {
        let metrics = PipelineMetrics::new();
        let shared = metrics.clone();
        shared.inc(&shared.total_frames);
        metrics.add(&metrics.tracks_merged, 3);
        let summary = metrics.summary();
        assert_eq!(summary.total_frames, 1);
        assert_eq!(summary.tracks_merged, 3);
        assert_eq!(summary.store_failures, 0);
    }
}
