// src/analysis/motion_classifier.rs
//
// Sitting / moving classification from a trailing window of centroids.
//
// Speed is the straight-line distance between the oldest and newest
// samples still inside the window, divided by their time delta.
//
// Accumulation uses continuous crediting: every update credits the time
// since the previous update to the state classified on this update, then
// restarts the open interval. Totals are therefore correct at any update
// frequency and the live query only has to add the open interval.

use crate::geometry::euclidean_distance;
use crate::types::Point;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Sitting,
    Moving,
}

impl MotionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sitting => "Sitting",
            Self::Moving => "Moving",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MotionClassifier {
    position_history: VecDeque<(Point, f64)>, // (centroid, timestamp_s)
    window_seconds: f64,
    threshold: f64,
    current_state: Option<MotionState>,
    state_entry_time: f64,
    total_sitting: f64,
    total_moving: f64,
    last_speed: f64,
}

impl MotionClassifier {
    pub fn new(window_seconds: f64, threshold: f64, first_seen: f64) -> Self {
        Self {
            position_history: VecDeque::with_capacity(64),
            window_seconds,
            threshold,
            current_state: None,
            state_entry_time: first_seen,
            total_sitting: 0.0,
            total_moving: 0.0,
            last_speed: 0.0,
        }
    }

    pub fn update(&mut self, position: Point, now: f64) -> MotionState {
        self.position_history.push_back((position, now));
        let window = self.window_seconds;
        self.position_history.retain(|(_, t)| now - *t <= window);

        self.last_speed = self.window_speed();
        let state = if self.last_speed <= self.threshold {
            MotionState::Sitting
        } else {
            MotionState::Moving
        };

        let elapsed = (now - self.state_entry_time).max(0.0);
        match state {
            MotionState::Sitting => self.total_sitting += elapsed,
            MotionState::Moving => self.total_moving += elapsed,
        }
        self.state_entry_time = now;
        self.current_state = Some(state);
        state
    }

    fn window_speed(&self) -> f64 {
        if self.position_history.len() < 2 {
            return 0.0;
        }
        let (Some(&(oldest, t0)), Some(&(newest, t1))) =
            (self.position_history.front(), self.position_history.back())
        else {
            return 0.0;
        };

        let dt = t1 - t0;
        if dt > 0.0 {
            euclidean_distance(oldest, newest) / dt
        } else {
            0.0
        }
    }

    pub fn current_state(&self) -> Option<MotionState> {
        self.current_state
    }

    pub fn last_speed(&self) -> f64 {
        self.last_speed
    }

    pub fn sample_count(&self) -> usize {
        self.position_history.len()
    }

    fn open_interval(&self, state: MotionState, now: f64) -> f64 {
        if self.current_state == Some(state) {
            (now - self.state_entry_time).max(0.0)
        } else {
            0.0
        }
    }

    pub fn sitting_total(&self, now: f64) -> f64 {
        self.total_sitting + self.open_interval(MotionState::Sitting, now)
    }

    pub fn moving_total(&self, now: f64) -> f64 {
        self.total_moving + self.open_interval(MotionState::Moving, now)
    }

    /// Live total for whichever state the track is currently in.
    pub fn current_state_total(&self, now: f64) -> Option<(MotionState, f64)> {
        self.current_state.map(|s| match s {
            MotionState::Sitting => (s, self.sitting_total(now)),
            MotionState::Moving => (s, self.moving_total(now)),
        })
    }

    /// Credit the pending interval at `now` and restart it.
    pub fn fold_open_interval(&mut self, now: f64) {
        match self.current_state {
            Some(MotionState::Sitting) => self.total_sitting = self.sitting_total(now),
            Some(MotionState::Moving) => self.total_moving = self.moving_total(now),
            None => {}
        }
        self.state_entry_time = self.state_entry_time.max(now);
    }

    /// Credit time carried over from a merged track.
    pub fn absorb(&mut self, sitting: f64, moving: f64) {
        self.total_sitting += sitting.max(0.0);
        self.total_moving += moving.max(0.0);
    }
}
