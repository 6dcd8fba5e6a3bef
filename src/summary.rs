// src/summary.rs
//
// End-of-session emission.
//
// Two phases, kept apart so no store I/O happens while the track state is
// being read:
//   build_summaries: pure read of the TrackStateStore, open intervals
//                    closed at the session end time
//   SummaryEmitter:  allocates a person id per summary and writes it
//
// One failed write never blocks the remaining records. Running out of
// person ids is a capacity problem and aborts the emission.

use crate::analysis::TrackStateStore;
use crate::persistence::{
    allocate_unique_person_id, IdGenerator, PersonRecord, PersonStore, StoreError,
};
use crate::pipeline::PipelineMetrics;
use crate::types::TrackId;
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{error, info};

/// Final totals for one surviving track, before a person id is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSummary {
    pub track_id: TrackId,
    pub confidence: f32,
    pub zone_times: BTreeMap<String, f64>,
    pub sitting_seconds: f64,
    pub movement_seconds: f64,
}

/// Snapshot every surviving track. When more tracks remain than people
/// are expected, only the most confident ones are reported, the same
/// selection the reconciler makes.
pub fn build_summaries(
    store: &TrackStateStore,
    max_expected_persons: usize,
    now: f64,
) -> Vec<TrackSummary> {
    let selected: Vec<TrackId> = if store.len() > max_expected_persons {
        let mut ranked = store.ranked_by_confidence();
        ranked.truncate(max_expected_persons);
        ranked
    } else {
        store.snapshot().iter().map(|t| t.id).collect()
    };

    selected
        .into_iter()
        .filter_map(|id| store.get(id))
        .map(|record| TrackSummary {
            track_id: record.id,
            confidence: record.confidence,
            zone_times: record
                .zone_timers
                .iter()
                .map(|t| (t.zone_name().to_string(), t.current_total(now)))
                .collect(),
            sitting_seconds: record.motion.sitting_total(now),
            movement_seconds: record.motion.moving_total(now),
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct EmissionReport {
    pub stored: Vec<PersonRecord>,
    pub failed: Vec<(TrackId, StoreError)>,
}

pub struct SummaryEmitter {
    max_id_attempts: u32,
    metrics: PipelineMetrics,
}

impl SummaryEmitter {
    pub fn new(max_id_attempts: u32, metrics: PipelineMetrics) -> Self {
        Self {
            max_id_attempts,
            metrics,
        }
    }

    pub fn emit<S, G>(
        &self,
        summaries: &[TrackSummary],
        store: &mut S,
        id_generator: &mut G,
    ) -> Result<EmissionReport, StoreError>
    where
        S: PersonStore + ?Sized,
        G: IdGenerator + ?Sized,
    {
        let mut report = EmissionReport::default();

        info!("📋 Final productivity summary ({} person(s))", summaries.len());

        for summary in summaries {
            let person_id = allocate_unique_person_id(store, id_generator, self.max_id_attempts)?;

            let record = PersonRecord {
                person_id,
                track_id: summary.track_id,
                zone_times: summary.zone_times.clone(),
                movement_seconds: summary.movement_seconds,
                sitting_seconds: summary.sitting_seconds,
                created_at: Utc::now(),
            };

            info!("Person {} (track T{}):", record.person_id, record.track_id);
            for (zone, seconds) in &record.zone_times {
                info!("  {}: {} seconds", zone, *seconds as u64);
            }
            info!(
                "  Sitting: {}s | Moving: {}s",
                record.sitting_seconds as u64, record.movement_seconds as u64
            );

            match store.insert(&record) {
                Ok(()) => {
                    self.metrics.inc(&self.metrics.records_stored);
                    info!("💾 Person {} summary saved", record.person_id);
                    report.stored.push(record);
                }
                Err(e) => {
                    self.metrics.inc(&self.metrics.store_failures);
                    error!(
                        "❌ Failed to store summary for track T{}: {}",
                        summary.track_id, e
                    );
                    report.failed.push((summary.track_id, e));
                }
            }
        }

        Ok(report)
    }
}
