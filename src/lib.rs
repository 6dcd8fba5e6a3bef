// src/lib.rs
//
// Zone dwell and sitting/moving aggregation over multi-object tracker
// output, with reconciliation of fragmented track identities.

pub mod analysis;
pub mod config;
pub mod geometry;
pub mod persistence;
pub mod pipeline;
pub mod summary;
pub mod types;

pub use analysis::{MotionState, TrackReconciler, TrackStateStore};
pub use persistence::{JsonlPersonStore, MemoryPersonStore, PersonRecord, PersonStore};
pub use pipeline::{AggregationEngine, FrameInput, FrameReport, PipelineMetrics};
pub use summary::{build_summaries, EmissionReport, SummaryEmitter, TrackSummary};
pub use types::{Config, EngineConfig, Point, TrackId, Zone};
