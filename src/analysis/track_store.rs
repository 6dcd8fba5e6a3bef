// src/analysis/track_store.rs
//
// Single source of truth for every per-track accumulator.
//
// Each track identity owns exactly one TrackRecord: its zone timers (one
// per configured zone, same order as the zone list), its motion
// classifier, its latest confidence and a short centroid history used by
// the reconciler. Create / update / remove always act on the whole
// record, so the pieces cannot drift apart during merges.
//
// Records are kept in first-sighting order. Ranking and nearest-survivor
// searches rely on that order to break ties deterministically.

use crate::analysis::motion_classifier::{MotionClassifier, MotionState};
use crate::analysis::zone_timer::{ZoneDwellTimer, ZoneTransition};
use crate::types::{EngineConfig, Point, TrackId, Zone};
use std::collections::VecDeque;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct TrackRecord {
    pub id: TrackId,
    pub zone_timers: Vec<ZoneDwellTimer>,
    pub motion: MotionClassifier,
    pub confidence: f32,
    pub position_history: VecDeque<Point>,
    pub first_seen: f64,
    pub last_seen: f64,
    pub observations: u64,
}

impl TrackRecord {
    fn new(id: TrackId, zones: &[Zone], cfg: &EngineConfig, now: f64) -> Self {
        Self {
            id,
            zone_timers: zones.iter().map(|z| ZoneDwellTimer::new(&z.name)).collect(),
            motion: MotionClassifier::new(
                cfg.movement_window_seconds,
                cfg.movement_threshold,
                now,
            ),
            confidence: cfg.default_confidence,
            position_history: VecDeque::with_capacity(cfg.position_history_len),
            first_seen: now,
            last_seen: now,
            observations: 0,
        }
    }

    pub fn last_position(&self) -> Option<Point> {
        self.position_history.back().copied()
    }

    pub fn zone_timer(&self, zone_name: &str) -> Option<&ZoneDwellTimer> {
        self.zone_timers.iter().find(|t| t.zone_name() == zone_name)
    }

    pub fn motion_state(&self) -> Option<MotionState> {
        self.motion.current_state()
    }

    /// Close every pending interval (zones and motion) at `now`.
    pub fn fold_open_intervals(&mut self, now: f64) {
        for timer in &mut self.zone_timers {
            timer.fold_open_interval(now);
        }
        self.motion.fold_open_interval(now);
    }
}

pub struct TrackStateStore {
    zones: Vec<Zone>,
    config: EngineConfig,
    tracks: Vec<TrackRecord>,
}

impl TrackStateStore {
    pub fn new(zones: Vec<Zone>, config: EngineConfig) -> Self {
        Self {
            zones,
            config,
            tracks: Vec::with_capacity(16),
        }
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Fold one confirmed sample into the track's state, creating the
    /// record on first sight. `confidence` is `None` when no detection
    /// overlapped the track this frame; the previous value is kept.
    pub fn observe(
        &mut self,
        track_id: TrackId,
        centroid: Point,
        confidence: Option<f32>,
        now: f64,
    ) -> &TrackRecord {
        let idx = match self.tracks.iter().position(|t| t.id == track_id) {
            Some(idx) => idx,
            None => {
                let record = TrackRecord::new(track_id, &self.zones, &self.config, now);
                info!(
                    "🆕 Track T{} first seen at ({:.0},{:.0}) t={:.2}s",
                    track_id, centroid.x, centroid.y, now
                );
                self.tracks.push(record);
                self.tracks.len() - 1
            }
        };

        let history_cap = self.config.position_history_len;
        let zones = &self.zones;
        let record = &mut self.tracks[idx];

        if let Some(conf) = confidence {
            record.confidence = conf;
        }

        record.position_history.push_back(centroid);
        while record.position_history.len() > history_cap {
            record.position_history.pop_front();
        }

        record.motion.update(centroid, now);

        for (zone, timer) in zones.iter().zip(record.zone_timers.iter_mut()) {
            match timer.update(zone.contains(centroid), now) {
                ZoneTransition::Entered => {
                    debug!("➡️  T{} entered {} at {:.2}s", track_id, zone.name, now)
                }
                ZoneTransition::Exited { interval } => debug!(
                    "⬅️  T{} left {} at {:.2}s after {:.2}s",
                    track_id, zone.name, now, interval
                ),
                ZoneTransition::None => {}
            }
        }

        record.last_seen = now;
        record.observations += 1;
        &self.tracks[idx]
    }

    /// Drop every piece of state owned by `track_id`.
    pub fn remove(&mut self, track_id: TrackId) -> Option<TrackRecord> {
        let idx = self.tracks.iter().position(|t| t.id == track_id)?;
        Some(self.tracks.remove(idx))
    }

    pub fn get(&self, track_id: TrackId) -> Option<&TrackRecord> {
        self.tracks.iter().find(|t| t.id == track_id)
    }

    pub(crate) fn get_mut(&mut self, track_id: TrackId) -> Option<&mut TrackRecord> {
        self.tracks.iter_mut().find(|t| t.id == track_id)
    }

    /// Read-only view in first-sighting order.
    pub fn snapshot(&self) -> &[TrackRecord] {
        &self.tracks
    }

    /// Track ids ordered by confidence, highest first. Equal confidences
    /// keep first-sighting order.
    pub fn ranked_by_confidence(&self) -> Vec<TrackId> {
        let mut ranked: Vec<&TrackRecord> = self.tracks.iter().collect();
        ranked.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.into_iter().map(|t| t.id).collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ZoneConfig;

    fn zones() -> Vec<Zone> {
        vec![
            Zone::from_config(&ZoneConfig {
                name: "desk1".into(),
                points: vec![[0, 0], [100, 0], [100, 100], [0, 100]],
            }),
            Zone::from_config(&ZoneConfig {
                name: "desk2".into(),
                points: vec![[200, 0], [300, 0], [300, 100], [200, 100]],
            }),
        ]
    }

    fn store() -> TrackStateStore {
        TrackStateStore::new(zones(), EngineConfig::default())
    }

    #[test]
    fn test_first_sight_creates_full_record() {
        let mut store = store();
        let rec = store.observe(7, Point::new(50.0, 50.0), None, 1.0);
        assert_eq!(rec.zone_timers.len(), 2);
        assert_eq!(rec.confidence, 0.5);
        assert_eq!(rec.first_seen, 1.0);
        assert!(rec.zone_timer("desk1").unwrap().is_inside());
        assert!(!rec.zone_timer("desk2").unwrap().is_inside());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_confidence_kept_when_no_match() {
        let mut store = store();
        store.observe(1, Point::new(50.0, 50.0), Some(0.9), 0.0);
        store.observe(1, Point::new(50.0, 50.0), None, 0.1);
        assert_eq!(store.get(1).unwrap().confidence, 0.9);
        store.observe(1, Point::new(50.0, 50.0), Some(0.7), 0.2);
        assert_eq!(store.get(1).unwrap().confidence, 0.7);
    }

    #[test]
    fn test_position_history_is_capped() {
        let cfg = EngineConfig {
            position_history_len: 3,
            ..EngineConfig::default()
        };
        let mut store = TrackStateStore::new(zones(), cfg);
        for i in 0..5 {
            store.observe(1, Point::new(i as f64, 0.0), None, i as f64 * 0.1);
        }
        let rec = store.get(1).unwrap();
        assert_eq!(rec.position_history.len(), 3);
        assert_eq!(rec.position_history.front().unwrap().x, 2.0);
        assert_eq!(rec.last_position().unwrap().x, 4.0);
    }

    #[test]
    fn test_zone_walk_between_desks() {
        let mut store = store();
        store.observe(1, Point::new(50.0, 50.0), None, 0.0);
        store.observe(1, Point::new(50.0, 50.0), None, 5.0);
        store.observe(1, Point::new(250.0, 50.0), None, 6.0);
        store.observe(1, Point::new(250.0, 50.0), None, 9.0);
        let rec = store.get(1).unwrap();
        assert_eq!(rec.zone_timer("desk1").unwrap().current_total(9.0), 6.0);
        assert_eq!(rec.zone_timer("desk2").unwrap().current_total(9.0), 3.0);
    }

    #[test]
    fn test_remove_drops_everything() {
        let mut store = store();
        store.observe(1, Point::new(50.0, 50.0), None, 0.0);
        store.observe(2, Point::new(60.0, 50.0), None, 0.0);
        let removed = store.remove(1).unwrap();
        assert_eq!(removed.id, 1);
        assert!(store.get(1).is_none());
        assert_eq!(store.len(), 1);
        assert!(store.remove(1).is_none());
    }

    #[test]
    fn test_ranking_is_stable_on_ties() {
        let mut store = store();
        store.observe(3, Point::new(0.0, 0.0), Some(0.6), 0.0);
        store.observe(1, Point::new(0.0, 0.0), Some(0.9), 0.0);
        store.observe(2, Point::new(0.0, 0.0), Some(0.6), 0.0);
        assert_eq!(store.ranked_by_confidence(), vec![1, 3, 2]);
    }
}
