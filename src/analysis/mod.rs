// src/analysis/mod.rs
//
// Temporal aggregation core.
//
// Signal flow:
//   confirmed track centroid → track_store ─┬→ zone_timer (per zone)
//                                           └→ motion_classifier
//   every N frames: reconciler → merges surplus identities in track_store
//
// Driven frame by frame by pipeline::AggregationEngine.

pub mod motion_classifier;
pub mod reconciler;
pub mod track_store;
pub mod zone_timer;

pub use motion_classifier::{MotionClassifier, MotionState};
pub use reconciler::{MergeRecord, ReconcilerConfig, ReconciliationReport, TrackReconciler};
pub use track_store::{TrackRecord, TrackStateStore};
pub use zone_timer::{ZoneDwellTimer, ZoneState, ZoneTransition};
