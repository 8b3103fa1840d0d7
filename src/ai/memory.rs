//! Decaying model of what an agent has seen the opponent do.
//!
//! Everything derived (average speed, favorite zones, aggression) is computed
//! from the retained samples; nothing is stored independently of them.

use std::collections::VecDeque;

use bevy::prelude::*;

/// Per-update velocity decay, also the base of the recency weights.
pub const DECAY: f32 = 0.85;
pub const POSITION_WINDOW_MS: f64 = 30_000.0;
pub const SHOT_WINDOW_MS: f64 = 5_000.0;
/// Side length of a favorite-zone bucket in world units.
pub const ZONE_SIZE: f32 = 200.0;

const FAVORITE_ZONE_COUNT: usize = 3;
const PREDICTION_HALF_LIFE_MS: f64 = 5_000.0;
const PREDICTION_HORIZON_MS: f32 = 1_000.0;
const AGGRESSION_SAMPLES: usize = 10;
const DEFAULT_AGGRESSION: f32 = 0.5;
const CAMP_SAMPLES: usize = 15;
const CAMP_MAX_SPREAD: f32 = 100.0;
const CAMP_MIN_DURATION_MS: f64 = 7_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    pub pos: Vec2,
    pub vel: Vec2,
    pub timestamp: f64,
}

/// A projectile fired by the opponent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotEvent {
    pub origin: Vec2,
    /// Travel direction in radians.
    pub angle: f32,
    pub time: f64,
}

impl ShotEvent {
    pub fn direction(&self) -> Vec2 {
        Vec2::from_angle(self.angle)
    }
}

/// A 200-unit bucket of the map, in bucket coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Zone {
    pub x: i32,
    pub y: i32,
}

impl Zone {
    pub fn containing(p: Vec2) -> Self {
        Self {
            x: (p.x / ZONE_SIZE).floor() as i32,
            y: (p.y / ZONE_SIZE).floor() as i32,
        }
    }

    /// Top-left corner in world units.
    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32) * ZONE_SIZE
    }

    pub fn center(&self) -> Vec2 {
        self.origin() + Vec2::splat(ZONE_SIZE / 2.0)
    }
}

/// Result of the camping check. The centroid is present whenever enough
/// samples exist, camping or not.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CampReport {
    pub is_camping: bool,
    pub centroid: Option<Vec2>,
}

#[derive(Debug, Clone, Default)]
pub struct OpponentMemory {
    positions: VecDeque<PositionSample>,
    shots: VecDeque<ShotEvent>,
    average_speed: f32,
    favorite_zones: Vec<Zone>,
}

impl OpponentMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one observation of the opponent into memory. Call once per tick.
    pub fn record(&mut self, pos: Vec2, vel: Vec2, shot: Option<ShotEvent>, now_ms: f64) {
        for sample in self.positions.iter_mut() {
            sample.vel *= DECAY;
        }
        self.positions
            .retain(|s| now_ms - s.timestamp <= POSITION_WINDOW_MS);
        self.positions.push_back(PositionSample {
            pos,
            vel,
            timestamp: now_ms,
        });

        if let Some(shot) = shot {
            self.shots.push_back(shot);
        }
        self.prune_shots(now_ms);

        self.average_speed = self.compute_average_speed();
        self.favorite_zones = self.compute_favorite_zones();
    }

    /// Track an extra shot that arrived in the same tick as `record`.
    pub fn remember_shot(&mut self, shot: ShotEvent, now_ms: f64) {
        self.shots.push_back(shot);
        self.prune_shots(now_ms);
    }

    fn prune_shots(&mut self, now_ms: f64) {
        self.shots.retain(|s| now_ms - s.time <= SHOT_WINDOW_MS);
    }

    pub fn positions(&self) -> impl ExactSizeIterator<Item = &PositionSample> {
        self.positions.iter()
    }

    pub fn shots(&self) -> impl ExactSizeIterator<Item = &ShotEvent> {
        self.shots.iter()
    }

    pub fn shot_count(&self) -> usize {
        self.shots.len()
    }

    pub fn last_sample(&self) -> Option<&PositionSample> {
        self.positions.back()
    }

    pub fn average_speed(&self) -> f32 {
        self.average_speed
    }

    /// Up to three most visited zones, most visited first.
    pub fn favorite_zones(&self) -> &[Zone] {
        &self.favorite_zones
    }

    /// Whether `p` lies within 150 units (per axis) of a favorite zone center.
    pub fn is_in_favorite_zone(&self, p: Vec2) -> bool {
        self.favorite_zones.iter().any(|z| {
            let d = (p - z.center()).abs();
            d.x < 150.0 && d.y < 150.0
        })
    }

    // -----------------------------------------------------------------------
    // Derived values
    // -----------------------------------------------------------------------

    fn compute_average_speed(&self) -> f32 {
        let n = self.positions.len();
        if n < 2 {
            return 0.0;
        }
        let weight = |i: usize| DECAY.powi((n - i - 1) as i32);
        let total_weight: f32 = (0..n).map(weight).sum();
        let distance: f32 = (1..n)
            .map(|i| self.positions[i].pos.distance(self.positions[i - 1].pos) * weight(i))
            .sum();
        distance / (total_weight * 1000.0)
    }

    fn compute_favorite_zones(&self) -> Vec<Zone> {
        // First-seen order breaks count ties.
        let mut counts: Vec<(Zone, usize)> = Vec::new();
        for sample in &self.positions {
            let zone = Zone::containing(sample.pos);
            match counts.iter_mut().find(|(z, _)| *z == zone) {
                Some((_, count)) => *count += 1,
                None => counts.push((zone, 1)),
            }
        }
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
            .into_iter()
            .take(FAVORITE_ZONE_COUNT)
            .map(|(zone, _)| zone)
            .collect()
    }

    /// Movement-rate proxy: distance covered over the last ten samples / 1000.
    pub fn aggression(&self) -> f32 {
        let n = self.positions.len();
        if n < AGGRESSION_SAMPLES {
            return DEFAULT_AGGRESSION;
        }
        let recent: Vec<Vec2> = self.positions.iter().skip(n - AGGRESSION_SAMPLES).map(|s| s.pos).collect();
        recent.windows(2).map(|w| w[0].distance(w[1])).sum::<f32>() / 1000.0
    }

    /// Recency-weighted position extrapolated one second ahead. The origin
    /// when nothing has been observed.
    pub fn predict(&self, now_ms: f64) -> Vec2 {
        if self.positions.is_empty() {
            return Vec2::ZERO;
        }
        let weights: Vec<f32> = self
            .positions
            .iter()
            .map(|s| DECAY.powf(((now_ms - s.timestamp) / PREDICTION_HALF_LIFE_MS) as f32))
            .collect();
        let total: f32 = weights.iter().sum();
        if total <= f32::EPSILON {
            return self.positions.back().map(|s| s.pos).unwrap_or_default();
        }

        let mut mean = Vec2::ZERO;
        let mut velocity = Vec2::ZERO;
        for (i, sample) in self.positions.iter().enumerate() {
            mean += sample.pos * weights[i];
            if i > 0 {
                let prev = &self.positions[i - 1];
                let dt = (sample.timestamp - prev.timestamp) as f32;
                if dt > 0.0 {
                    velocity += (sample.pos - prev.pos) / dt * weights[i];
                }
            }
        }
        mean / total + velocity / total * PREDICTION_HORIZON_MS
    }

    /// Camping: the last 15 samples stay within a mean radius of 100 units
    /// for more than 7 s.
    pub fn detect_camping(&self) -> CampReport {
        let n = self.positions.len();
        if n < CAMP_SAMPLES {
            return CampReport::default();
        }
        let recent: Vec<&PositionSample> = self.positions.iter().skip(n - CAMP_SAMPLES).collect();
        let centroid = recent.iter().map(|s| s.pos).sum::<Vec2>() / CAMP_SAMPLES as f32;
        let spread = recent.iter().map(|s| s.pos.distance(centroid)).sum::<f32>() / CAMP_SAMPLES as f32;
        let elapsed = recent[CAMP_SAMPLES - 1].timestamp - recent[0].timestamp;
        CampReport {
            is_camping: spread < CAMP_MAX_SPREAD && elapsed > CAMP_MIN_DURATION_MS,
            centroid: Some(centroid),
        }
    }
}
