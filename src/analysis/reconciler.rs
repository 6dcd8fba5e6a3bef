// src/analysis/reconciler.rs
//
// Repairs tracker identity fragmentation.
//
// When more confirmed tracks are active than people can be present, the
// lowest-confidence identities are treated as fragments of the survivors:
//
//   1. Rank every stored track by confidence; the top N survive.
//   2. Each remaining candidate looks for the survivor whose latest
//      centroid is nearest to its own latest centroid.
//   3. Within the distance threshold the candidate's zone and motion
//      totals are credited to that survivor; otherwise they are dropped.
//      Open intervals are closed at the candidate's last sighting, so a
//      track that went stale earlier contributes no unobserved time.
//   4. The candidate's record is removed either way.
//
// Greedy: candidates are resolved in rank order, survivors can absorb
// any number of candidates, and no earlier decision is revisited.

use crate::analysis::track_store::{TrackRecord, TrackStateStore};
use crate::geometry::euclidean_distance;
use crate::types::TrackId;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub max_expected_persons: usize,
    pub distance_threshold: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeRecord {
    pub candidate: TrackId,
    pub survivor: TrackId,
    pub distance: f64,
    pub zone_seconds: f64,
    pub motion_seconds: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationReport {
    pub merged: Vec<MergeRecord>,
    pub discarded: Vec<TrackId>,
}

impl ReconciliationReport {
    pub fn is_empty(&self) -> bool {
        self.merged.is_empty() && self.discarded.is_empty()
    }
}

pub struct TrackReconciler {
    config: ReconcilerConfig,
}

impl TrackReconciler {
    pub fn new(config: ReconcilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Merge or discard surplus identities. Does nothing unless
    /// `active_tracks` exceeds the expected occupancy.
    pub fn reconcile(
        &self,
        store: &mut TrackStateStore,
        active_tracks: usize,
        now: f64,
    ) -> ReconciliationReport {
        let mut report = ReconciliationReport::default();
        let max_persons = self.config.max_expected_persons;

        if active_tracks <= max_persons {
            return report;
        }

        let ranked = store.ranked_by_confidence();
        if ranked.len() <= max_persons {
            return report;
        }
        let (survivors, candidates) = ranked.split_at(max_persons);

        info!(
            "🔀 Reconciling: {} active track(s) > {} expected, survivors {:?}, candidates {:?}",
            active_tracks, max_persons, survivors, candidates
        );

        for &candidate_id in candidates {
            let target = store
                .get(candidate_id)
                .and_then(|c| self.nearest_survivor(store, c, survivors));

            let Some(mut candidate) = store.remove(candidate_id) else {
                continue;
            };

            let last_seen = candidate.last_seen.min(now);
            match target {
                Some((survivor_id, distance)) => {
                    candidate.fold_open_intervals(last_seen);
                    let Some(survivor) = store.get_mut(survivor_id) else {
                        continue;
                    };
                    let (zone_seconds, motion_seconds) = transfer(&candidate, survivor, last_seen);
                    info!(
                        "🔗 Merged T{} into T{} (dist={:.0}px): +{:.1}s zone, +{:.1}s motion",
                        candidate_id, survivor_id, distance, zone_seconds, motion_seconds
                    );
                    report.merged.push(MergeRecord {
                        candidate: candidate_id,
                        survivor: survivor_id,
                        distance,
                        zone_seconds,
                        motion_seconds,
                    });
                }
                None => {
                    warn!(
                        "🗑️  Discarded T{}: no survivor within {:.0}px ({:.1}s zone time dropped)",
                        candidate_id,
                        self.config.distance_threshold,
                        candidate
                            .zone_timers
                            .iter()
                            .map(|t| t.current_total(last_seen))
                            .sum::<f64>()
                    );
                    report.discarded.push(candidate_id);
                }
            }
        }

        report
    }

    /// Closest survivor by latest centroid, if within the threshold.
    /// Strict comparison keeps the first survivor on equal distances.
    fn nearest_survivor(
        &self,
        store: &TrackStateStore,
        candidate: &TrackRecord,
        survivors: &[TrackId],
    ) -> Option<(TrackId, f64)> {
        let candidate_pos = candidate.last_position()?;

        let mut best: Option<(TrackId, f64)> = None;
        for &survivor_id in survivors {
            let Some(survivor_pos) = store.get(survivor_id).and_then(|s| s.last_position())
            else {
                continue;
            };
            let distance = euclidean_distance(candidate_pos, survivor_pos);
            debug!(
                "T{} ↔ T{} distance {:.1}px",
                candidate.id, survivor_id, distance
            );
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((survivor_id, distance));
            }
        }

        best.filter(|&(_, d)| d < self.config.distance_threshold)
    }
}

/// Credit a folded candidate's closed totals to the survivor, zone by zone.
/// Returns (zone seconds, motion seconds) transferred.
fn transfer(candidate: &TrackRecord, survivor: &mut TrackRecord, folded_at: f64) -> (f64, f64) {
    let mut zone_seconds = 0.0;
    for from in &candidate.zone_timers {
        let seconds = from.closed_total();
        if seconds <= 0.0 {
            continue;
        }
        if let Some(to) = survivor
            .zone_timers
            .iter_mut()
            .find(|t| t.zone_name() == from.zone_name())
        {
            to.absorb(seconds);
            zone_seconds += seconds;
        }
    }

    let sitting = candidate.motion.sitting_total(folded_at);
    let moving = candidate.motion.moving_total(folded_at);
    survivor.motion.absorb(sitting, moving);

    (zone_seconds, sitting + moving)
}
