// src/pipeline/frame_context.rs
//
// One frame of tracker output. Every subsystem reads the same frame so
// confidence association, zone updates and labels stay aligned.

use crate::geometry::{centroid, iou};
use crate::types::{BBox, EngineConfig, Point, TrackId};
use serde::{Deserialize, Serialize};

/// A track as reported by the external tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackInput {
    pub track_id: TrackId,
    pub bbox: BBox,
    #[serde(default = "default_confirmed")]
    pub is_confirmed: bool,
}

fn default_confirmed() -> bool {
    true
}

impl TrackInput {
    pub fn centroid(&self) -> Point {
        centroid(&self.bbox)
    }
}

/// A raw detector output, used only to recover per-track confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionInput {
    pub bbox: BBox,
    pub confidence: f32,
    #[serde(default)]
    pub class_id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameInput {
    #[serde(default)]
    pub frame_id: u64,
    /// Seconds, monotonically non-decreasing across frames
    pub timestamp: f64,
    #[serde(default)]
    pub tracks: Vec<TrackInput>,
    #[serde(default)]
    pub detections: Vec<DetectionInput>,
}

impl FrameInput {
    pub fn new(frame_id: u64, timestamp: f64) -> Self {
        Self {
            frame_id,
            timestamp,
            tracks: Vec::new(),
            detections: Vec::new(),
        }
    }

    pub fn with_track(mut self, track_id: TrackId, bbox: BBox) -> Self {
        self.tracks.push(TrackInput {
            track_id,
            bbox,
            is_confirmed: true,
        });
        self
    }

    pub fn with_detection(mut self, bbox: BBox, confidence: f32) -> Self {
        self.detections.push(DetectionInput {
            bbox,
            confidence,
            class_id: 0,
        });
        self
    }

    pub fn confirmed_tracks(&self) -> impl Iterator<Item = &TrackInput> {
        self.tracks.iter().filter(|t| t.is_confirmed)
    }

    /// Confidence of the first person detection overlapping `track` by
    /// more than the IoU threshold, if any.
    pub fn associate_confidence(&self, track: &TrackInput, cfg: &EngineConfig) -> Option<f32> {
        self.detections
            .iter()
            .filter(|d| {
                d.class_id == cfg.person_class_id && d.confidence > cfg.min_detection_confidence
            })
            .find(|d| iou(&track.bbox, &d.bbox) > cfg.iou_match_threshold)
            .map(|d| d.confidence)
    }
}
