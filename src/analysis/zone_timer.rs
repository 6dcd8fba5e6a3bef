// src/analysis/zone_timer.rs
//
// Per (track, zone) dwell state machine.
//
//   OUTSIDE ──centroid enters polygon──▶ INSIDE { entry_time }
//   INSIDE  ──centroid leaves polygon──▶ OUTSIDE   (folds the interval)
//
// The running total while INSIDE is a read-only projection; nothing is
// written until the interval closes.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoneState {
    Outside,
    Inside { entry_time: f64 },
}

#[derive(Debug, Clone)]
pub struct ZoneDwellTimer {
    zone_name: String,
    state: ZoneState,
    total_time: f64,
}

/// What a single update did to the timer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoneTransition {
    None,
    Entered,
    Exited { interval: f64 },
}

impl ZoneDwellTimer {
    pub fn new(zone_name: impl Into<String>) -> Self {
        Self {
            zone_name: zone_name.into(),
            state: ZoneState::Outside,
            total_time: 0.0,
        }
    }

    pub fn zone_name(&self) -> &str {
        &self.zone_name
    }

    pub fn state(&self) -> ZoneState {
        self.state
    }

    pub fn is_inside(&self) -> bool {
        matches!(self.state, ZoneState::Inside { .. })
    }

    /// Closed intervals only.
    pub fn closed_total(&self) -> f64 {
        self.total_time
    }

    pub fn update(&mut self, inside: bool, now: f64) -> ZoneTransition {
        match (self.state, inside) {
            (ZoneState::Outside, true) => {
                self.state = ZoneState::Inside { entry_time: now };
                ZoneTransition::Entered
            }
            (ZoneState::Inside { entry_time }, false) => {
                let interval = (now - entry_time).max(0.0);
                self.total_time += interval;
                self.state = ZoneState::Outside;
                debug!(
                    "Zone {} exited after {:.2}s (total {:.2}s)",
                    self.zone_name, interval, self.total_time
                );
                ZoneTransition::Exited { interval }
            }
            _ => ZoneTransition::None,
        }
    }

    /// Total including the pending interval, without touching state.
    pub fn current_total(&self, now: f64) -> f64 {
        match self.state {
            ZoneState::Outside => self.total_time,
            ZoneState::Inside { entry_time } => self.total_time + (now - entry_time).max(0.0),
        }
    }

    /// Close any pending interval at `now`. Leaves the timer OUTSIDE.
    pub fn fold_open_interval(&mut self, now: f64) {
        if let ZoneState::Inside { entry_time } = self.state {
            self.total_time += (now - entry_time).max(0.0);
            self.state = ZoneState::Outside;
        }
    }

    /// Credit time carried over from a merged track.
    pub fn absorb(&mut self, seconds: f64) {
        if seconds > 0.0 {
            self.total_time += seconds;
        }
    }
}
