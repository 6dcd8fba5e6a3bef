use serde::{Deserialize, Serialize};

/// Identity assigned by the external tracker. May fragment after occlusion.
pub type TrackId = u64;

/// Axis-aligned box `[x1, y1, x2, y2]` in pixels.
pub type BBox = [f32; 4];

/// 2D position sample in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    pub zones: Vec<ZoneConfig>,
    pub input: InputConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tunables of the aggregation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Speed (pixels/second) above which a track counts as moving
    pub movement_threshold: f64,
    /// Trailing window used for the speed estimate
    pub movement_window_seconds: f64,
    /// Occupancy bound; more active tracks than this triggers reconciliation
    pub max_expected_persons: usize,
    pub reconciliation_interval_frames: u64,
    /// Max centroid distance for a fragment to be merged into a survivor
    pub reconciliation_distance_threshold: f64,
    /// A detection must overlap a track by more than this to lend its confidence
    pub iou_match_threshold: f32,
    pub default_confidence: f32,
    /// Centroids kept per track for reconciliation
    pub position_history_len: usize,
    /// Detector class treated as a person (COCO: 0)
    pub person_class_id: u32,
    pub min_detection_confidence: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            movement_threshold: 5.0,
            movement_window_seconds: 1.0,
            max_expected_persons: 2,
            reconciliation_interval_frames: 30,
            reconciliation_distance_threshold: 300.0,
            iou_match_threshold: 0.5,
            default_confidence: 0.5,
            position_history_len: 30,
            person_class_id: 0,
            min_detection_confidence: 0.35,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub name: String,
    pub points: Vec<[i32; 2]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// JSON-lines file of tracker output, one `FrameInput` per line
    pub frames_path: String,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    256
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub store_path: String,
    #[serde(default = "default_max_id_attempts")]
    pub max_id_attempts: u32,
}

fn default_max_id_attempts() -> u32 {
    64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "desk_dwell=info".to_string(),
        }
    }
}

/// A named closed polygon. Immutable for the whole session.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub name: String,
    pub polygon: Vec<Point>,
}

impl Zone {
    pub fn from_config(cfg: &ZoneConfig) -> Self {
        Self {
            name: cfg.name.clone(),
            polygon: cfg
                .points
                .iter()
                .map(|p| Point::new(p[0] as f64, p[1] as f64))
                .collect(),
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        crate::geometry::point_in_polygon(point, &self.polygon)
    }
}
