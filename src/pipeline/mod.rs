// src/pipeline/mod.rs

pub mod engine;
pub mod frame_context;
pub mod metrics;

pub use engine::{AggregationEngine, FrameReport, TrackLabel};
pub use frame_context::{DetectionInput, FrameInput, TrackInput};
pub use metrics::{MetricsSummary, PipelineMetrics};
